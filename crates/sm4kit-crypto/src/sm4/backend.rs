//! SM4 execution backends and the capability-driven selector.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use sm4kit_types::CryptoError;

use super::{soft, table, SM4_BLOCK_SIZE, SM4_ROUNDS};
use crate::cpu::{self, Capability, CapabilitySet};

/// Environment variable consulted once by [`Backend::preferred`].
pub const BACKEND_ENV: &str = "SM4KIT_BACKEND";

/// An SM4 implementation strategy.
///
/// All variants produce bit-identical output for the same round keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Literal S-box and rotations, one block at a time.
    Basic,
    /// Four precomputed 256-entry round tables.
    Table,
    /// Four blocks per pass; S-box through the AES `aesenclast` instruction.
    AesNi,
    /// Four blocks per pass; S-box through GFNI affine instructions.
    Gfni,
    /// Sixteen blocks per pass in 512-bit registers with a GFNI S-box.
    Avx512Gfni,
}

/// Auto-selection order, fastest first. `Basic` never appears here.
const PRIORITY: [Backend; 4] = [
    Backend::Avx512Gfni,
    Backend::Gfni,
    Backend::AesNi,
    Backend::Table,
];

static PREFERRED: OnceLock<Backend> = OnceLock::new();

impl Backend {
    pub const ALL: [Backend; 5] = [
        Backend::Basic,
        Backend::Table,
        Backend::AesNi,
        Backend::Gfni,
        Backend::Avx512Gfni,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Basic => "basic",
            Backend::Table => "table",
            Backend::AesNi => "aes-ni",
            Backend::Gfni => "gfni",
            Backend::Avx512Gfni => "avx512-gfni",
        }
    }

    /// Capabilities that must all be present for this backend to run.
    pub fn required_caps(self) -> CapabilitySet {
        use Capability::*;
        match self {
            Backend::Basic | Backend::Table => CapabilitySet::EMPTY,
            Backend::AesNi => CapabilitySet::from_slice(&[Sse2, Ssse3, Aes]),
            Backend::Gfni => CapabilitySet::from_slice(&[Sse2, Ssse3, Gfni]),
            Backend::Avx512Gfni => {
                CapabilitySet::from_slice(&[Sse2, Ssse3, Avx512f, Avx512bw, Gfni])
            }
        }
    }

    /// Number of blocks processed per pass.
    pub fn lanes(self) -> usize {
        match self {
            Backend::Basic | Backend::Table => 1,
            Backend::AesNi | Backend::Gfni => 4,
            Backend::Avx512Gfni => 16,
        }
    }

    pub fn is_vectorized(self) -> bool {
        self.lanes() > 1
    }

    /// True if this backend can run on a processor with `caps`.
    pub fn is_supported_by(self, caps: CapabilitySet) -> bool {
        if self.is_vectorized() && !cfg!(target_arch = "x86_64") {
            return false;
        }
        caps.has_all(self.required_caps())
    }

    /// True if this backend can run on the current processor.
    pub fn is_supported(self) -> bool {
        self.is_supported_by(cpu::capabilities())
    }

    /// Pick the fastest backend whose requirements `caps` satisfies.
    ///
    /// Total: `Table` needs nothing, so there is always an answer.
    pub fn select(caps: CapabilitySet) -> Backend {
        PRIORITY
            .into_iter()
            .find(|b| b.is_supported_by(caps))
            .unwrap_or(Backend::Table)
    }

    /// Backends runnable on the current processor, in declaration order.
    pub fn supported() -> Vec<Backend> {
        Backend::ALL
            .into_iter()
            .filter(|b| b.is_supported())
            .collect()
    }

    /// The process-wide default backend.
    ///
    /// Resolved once: `SM4KIT_BACKEND` if it names a supported backend,
    /// otherwise [`Backend::select`] over the detected capabilities.
    pub fn preferred() -> Backend {
        *PREFERRED.get_or_init(|| {
            let env = std::env::var(BACKEND_ENV).ok();
            let backend = resolve_override(env.as_deref(), cpu::capabilities());
            log::debug!("sm4: using {backend} backend");
            backend
        })
    }

    /// Run the rounds over `blocks` in place.
    ///
    /// Callers must only pass a backend that [`Backend::is_supported`]
    /// accepted; `Sm4Key` enforces this at construction.
    pub(crate) fn crypt_blocks(self, rk: &[u32; SM4_ROUNDS], blocks: &mut [[u8; SM4_BLOCK_SIZE]]) {
        match self {
            Backend::Basic => blocks.iter_mut().for_each(|b| soft::crypt_block(rk, b)),
            Backend::Table => blocks.iter_mut().for_each(|b| table::crypt_block(rk, b)),
            #[cfg(target_arch = "x86_64")]
            // Safety: only reached when SSE2, SSSE3 and AES-NI were detected.
            Backend::AesNi => unsafe { super::x86::aes_ni::crypt_blocks(rk, blocks) },
            #[cfg(target_arch = "x86_64")]
            // Safety: only reached when SSE2, SSSE3 and GFNI were detected.
            Backend::Gfni => unsafe { super::x86::gfni::crypt_blocks(rk, blocks) },
            #[cfg(target_arch = "x86_64")]
            // Safety: only reached when AVX512F, AVX512BW and GFNI were detected.
            Backend::Avx512Gfni => unsafe { super::x86::avx512::crypt_blocks(rk, blocks) },
            #[cfg(not(target_arch = "x86_64"))]
            Backend::AesNi | Backend::Gfni | Backend::Avx512Gfni => {
                blocks.iter_mut().for_each(|b| table::crypt_block(rk, b))
            }
        }
    }
}

/// Apply an optional textual override on top of automatic selection.
///
/// Unknown or unsupported names are ignored with a warning.
fn resolve_override(value: Option<&str>, caps: CapabilitySet) -> Backend {
    let auto = Backend::select(caps);
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return auto;
    };
    if raw.eq_ignore_ascii_case("auto") {
        return auto;
    }
    match raw.parse::<Backend>() {
        Ok(b) if b.is_supported_by(caps) => b,
        Ok(b) => {
            log::warn!("{BACKEND_ENV}={raw}: {b} is not supported on this cpu, using {auto}");
            auto
        }
        Err(e) => {
            log::warn!("{BACKEND_ENV}: {e}, using {auto}");
            auto
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace('_', "-");
        match lower.as_str() {
            "basic" | "soft" => Ok(Backend::Basic),
            "table" | "ttable" | "t-table" => Ok(Backend::Table),
            "aes-ni" | "aesni" => Ok(Backend::AesNi),
            "gfni" => Ok(Backend::Gfni),
            "avx512-gfni" | "avx512" => Ok(Backend::Avx512Gfni),
            _ => Err(CryptoError::UnknownBackend(s.to_string())),
        }
    }
}
