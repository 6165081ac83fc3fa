//! Runtime CPU capability detection.
//!
//! The processor is queried once per process; every later call reads the
//! cached [`CpuInfo`]. Detection never fails: on targets without a detector
//! every capability reports absent.

use std::fmt;
use std::sync::OnceLock;

#[cfg(target_arch = "x86_64")]
mod x86;

// ---------------------------------------------------------------------------
// Capability set
// ---------------------------------------------------------------------------

/// A hardware feature relevant to backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Capability {
    Sse2,
    Ssse3,
    Sse41,
    Aes,
    Pclmulqdq,
    Avx2,
    Avx512f,
    Avx512bw,
    Avx512vl,
    Gfni,
    Vaes,
    Vpclmulqdq,
}

impl Capability {
    /// Every capability, in report order.
    pub const ALL: [Capability; 12] = [
        Capability::Sse2,
        Capability::Ssse3,
        Capability::Sse41,
        Capability::Aes,
        Capability::Pclmulqdq,
        Capability::Avx2,
        Capability::Avx512f,
        Capability::Avx512bw,
        Capability::Avx512vl,
        Capability::Gfni,
        Capability::Vaes,
        Capability::Vpclmulqdq,
    ];

    /// Conventional feature name, as printed in the summary.
    pub fn name(self) -> &'static str {
        match self {
            Capability::Sse2 => "SSE2",
            Capability::Ssse3 => "SSSE3",
            Capability::Sse41 => "SSE4.1",
            Capability::Aes => "AES-NI",
            Capability::Pclmulqdq => "PCLMULQDQ",
            Capability::Avx2 => "AVX2",
            Capability::Avx512f => "AVX512F",
            Capability::Avx512bw => "AVX512BW",
            Capability::Avx512vl => "AVX512VL",
            Capability::Gfni => "GFNI",
            Capability::Vaes => "VAES",
            Capability::Vpclmulqdq => "VPCLMULQDQ",
        }
    }

    #[inline(always)]
    const fn bit(self) -> u32 {
        1 << self as u32
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`Capability`] values, stored as a bitset.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Build a set from a fixed list.
    pub const fn from_slice(caps: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < caps.len() {
            bits |= caps[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Every capability this crate knows about.
    pub const fn all() -> Self {
        Self::from_slice(&Capability::ALL)
    }

    /// Return a copy with `cap` added.
    #[must_use]
    pub const fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    /// Return a copy with `cap` removed.
    #[must_use]
    pub const fn without(self, cap: Capability) -> Self {
        Self(self.0 & !cap.bit())
    }

    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    #[inline]
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// True if every capability in `required` is present.
    #[inline]
    pub const fn has_all(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the members in report order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |&c| self.contains(c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl fmt::Display for CapabilitySet {
    /// Space-separated feature names, or `None` for the empty set.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        for (i, cap) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(cap.name())?;
        }
        Ok(())
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// Processor identification
// ---------------------------------------------------------------------------

/// Identification and feature report for the running processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuInfo {
    pub vendor: String,
    pub brand: String,
    pub family: u32,
    pub model: u32,
    pub stepping: u32,
    pub capabilities: CapabilitySet,
}

impl CpuInfo {
    fn unknown() -> Self {
        CpuInfo {
            vendor: "unknown".into(),
            brand: "unknown".into(),
            family: 0,
            model: 0,
            stepping: 0,
            capabilities: CapabilitySet::EMPTY,
        }
    }
}

impl fmt::Display for CpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vendor:   {}", self.vendor)?;
        writeln!(f, "Brand:    {}", self.brand)?;
        writeln!(
            f,
            "Family:   {}  Model: {}  Stepping: {}",
            self.family, self.model, self.stepping
        )?;
        write!(f, "Features: {}", self.capabilities)
    }
}

static CPU_INFO: OnceLock<CpuInfo> = OnceLock::new();

fn detect() -> CpuInfo {
    #[cfg(target_arch = "x86_64")]
    let info = x86::detect();
    #[cfg(not(target_arch = "x86_64"))]
    let info = CpuInfo::unknown();

    log::debug!(
        "cpu: {} ({}) capabilities: {}",
        info.brand,
        info.vendor,
        info.capabilities
    );
    info
}

/// Cached processor report.
pub fn cpu_info() -> &'static CpuInfo {
    CPU_INFO.get_or_init(detect)
}

/// Cached capability set of the running processor.
pub fn capabilities() -> CapabilitySet {
    cpu_info().capabilities
}

/// Backend the selector picks for this processor, ignoring any override.
#[cfg(feature = "sm4")]
pub fn recommended_backend() -> crate::sm4::Backend {
    crate::sm4::Backend::select(capabilities())
}
