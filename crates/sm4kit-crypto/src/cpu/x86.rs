//! x86_64 detection: CPUID for identification, `is_x86_feature_detected!`
//! for features so AVX and AVX-512 are only reported when the OS saves
//! the wider register state.

use core::arch::x86_64::{CpuidResult, __cpuid};

use super::{Capability, CapabilitySet, CpuInfo};

#[inline]
fn cpuid(leaf: u32) -> CpuidResult {
    // Safety: CPUID is available on every x86_64 processor.
    #[allow(unused_unsafe)]
    unsafe {
        __cpuid(leaf)
    }
}

fn detect_features() -> CapabilitySet {
    let mut caps = CapabilitySet::EMPTY;
    let mut add = |present: bool, cap: Capability| {
        if present {
            caps.insert(cap);
        }
    };
    add(is_x86_feature_detected!("sse2"), Capability::Sse2);
    add(is_x86_feature_detected!("ssse3"), Capability::Ssse3);
    add(is_x86_feature_detected!("sse4.1"), Capability::Sse41);
    add(is_x86_feature_detected!("aes"), Capability::Aes);
    add(is_x86_feature_detected!("pclmulqdq"), Capability::Pclmulqdq);
    add(is_x86_feature_detected!("avx2"), Capability::Avx2);
    add(is_x86_feature_detected!("avx512f"), Capability::Avx512f);
    add(is_x86_feature_detected!("avx512bw"), Capability::Avx512bw);
    add(is_x86_feature_detected!("avx512vl"), Capability::Avx512vl);
    add(is_x86_feature_detected!("gfni"), Capability::Gfni);
    add(is_x86_feature_detected!("vaes"), Capability::Vaes);
    add(is_x86_feature_detected!("vpclmulqdq"), Capability::Vpclmulqdq);
    caps
}

fn ascii_field(words: &[u32]) -> String {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    String::from_utf8_lossy(&bytes)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

pub(super) fn detect() -> CpuInfo {
    let mut info = CpuInfo::unknown();
    info.capabilities = detect_features();

    let leaf0 = cpuid(0);
    // Vendor string is EBX, EDX, ECX in that order.
    info.vendor = ascii_field(&[leaf0.ebx, leaf0.edx, leaf0.ecx]);

    if leaf0.eax >= 1 {
        let eax = cpuid(1).eax;
        let base_family = (eax >> 8) & 0xf;
        let ext_family = (eax >> 20) & 0xff;
        let base_model = (eax >> 4) & 0xf;
        let ext_model = (eax >> 16) & 0xf;

        info.family = if base_family == 0xf {
            base_family + ext_family
        } else {
            base_family
        };
        info.model = if base_family == 0x6 || base_family == 0xf {
            base_model | (ext_model << 4)
        } else {
            base_model
        };
        info.stepping = eax & 0xf;
    }

    if cpuid(0x8000_0000).eax >= 0x8000_0004 {
        let mut words = Vec::with_capacity(12);
        for leaf in 0x8000_0002..=0x8000_0004u32 {
            let r = cpuid(leaf);
            words.extend_from_slice(&[r.eax, r.ebx, r.ecx, r.edx]);
        }
        let brand = ascii_field(&words);
        if !brand.is_empty() {
            info.brand = brand;
        }
    }

    info
}
