//! Known Answer Tests (KAT) run by the self-test harness.
//!
//! Each KAT runs a single algorithm computation with a known input and
//! verifies the output matches the published value (GB/T 32907, RFC 8998,
//! GB/T 32905).

use sm4kit_types::SelfTestError;

use crate::modes::gcm::{gf_mul, Gf128, GhashTable, Sm4Gcm};
use crate::sm3::Sm3;
use crate::sm4::Sm4Key;

/// A named known-answer test.
pub(crate) struct Kat {
    pub(crate) name: &'static str,
    pub(crate) run: fn() -> Result<(), SelfTestError>,
}

/// Always-on KATs, in execution order.
pub(crate) const KATS: &[Kat] = &[
    Kat { name: "sm4-block", run: kat_sm4_block },
    Kat { name: "gf128-mul", run: kat_gf128_mul },
    Kat { name: "sm4-gcm", run: kat_sm4_gcm },
    Kat { name: "sm3", run: kat_sm3 },
];

/// The iterated SM4 KAT, only run in full mode.
pub(crate) const KAT_SM4_MILLION: Kat = Kat {
    name: "sm4-million",
    run: kat_sm4_million,
};

fn hex(s: &str) -> Result<Vec<u8>, SelfTestError> {
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|b| u8::from_str_radix(b, 16).ok())
                .ok_or_else(|| SelfTestError::KatFailure(format!("malformed vector {s}")))
        })
        .collect()
}

fn block(s: &str) -> Result<[u8; 16], SelfTestError> {
    hex(s)?
        .try_into()
        .map_err(|_| SelfTestError::KatFailure(format!("vector {s} is not one block")))
}

const SM4_KEY: &str = "0123456789abcdeffedcba9876543210";

/// SM4 single block, GB/T 32907-2016 Appendix A example 1.
fn kat_sm4_block() -> Result<(), SelfTestError> {
    let key = Sm4Key::new(&hex(SM4_KEY)?)?;
    let expected = hex("681edf34d206965e86b3e94f536e4246")?;

    let mut buf = hex(SM4_KEY)?;
    key.encrypt_block(&mut buf)?;
    if buf != expected {
        return Err(SelfTestError::KatFailure("SM4 ciphertext mismatch".into()));
    }
    key.decrypt_block(&mut buf)?;
    if buf != hex(SM4_KEY)? {
        return Err(SelfTestError::KatFailure("SM4 plaintext mismatch".into()));
    }
    Ok(())
}

/// SM4 iterated 1,000,000 times, GB/T 32907-2016 Appendix A example 2.
fn kat_sm4_million() -> Result<(), SelfTestError> {
    let key = Sm4Key::new(&hex(SM4_KEY)?)?;
    let expected = hex("595298c7c6fd271f0402f804c33d3f66")?;

    let mut buf = hex(SM4_KEY)?;
    for _ in 0..1_000_000 {
        key.encrypt_block(&mut buf)?;
    }
    if buf != expected {
        return Err(SelfTestError::KatFailure(
            "SM4 1,000,000-iteration ciphertext mismatch".into(),
        ));
    }
    Ok(())
}

/// GF(2^128) product from the McGrew-Viega GCM test case 2, checked
/// through both the bitwise reference and the table multiplier.
fn kat_gf128_mul() -> Result<(), SelfTestError> {
    let h = block("66e94bd4ef8a2c3b884cfa59ca342b2e")?;
    let x = block("0388dace60b6a392f328c2b971b2fe78")?;
    let expected = block("5e2ec746917062882c85b0685353deb7")?;

    if gf_mul(&x, &h) != expected {
        return Err(SelfTestError::KatFailure(
            "GF(2^128) reference product mismatch".into(),
        ));
    }
    let table = GhashTable::new(&h);
    if table.mul(Gf128::from_bytes(&x)).to_bytes() != expected {
        return Err(SelfTestError::KatFailure(
            "GF(2^128) table product mismatch".into(),
        ));
    }
    if table.mul(Gf128::ONE) != Gf128::from_bytes(&h) || table.mul(Gf128::ZERO) != Gf128::ZERO {
        return Err(SelfTestError::KatFailure(
            "GF(2^128) table identity or zero mismatch".into(),
        ));
    }
    Ok(())
}

/// SM4-GCM, RFC 8998 Appendix A.1.
fn kat_sm4_gcm() -> Result<(), SelfTestError> {
    let nonce = hex("00001234567800000000abcd")?;
    let aad = hex("feedfacedeadbeeffeedfacedeadbeefabaddad2")?;
    let plaintext = hex(
        "aaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbccccccccccccccccdddddddddddddddd\
         eeeeeeeeeeeeeeeeffffffffffffffffeeeeeeeeeeeeeeeeaaaaaaaaaaaaaaaa",
    )?;
    let expected_ct = hex(
        "17f399f08c67d5ee19d0dc9969c4bb7d5fd46fd3756489069157b282bb200735\
         d82710ca5c22f0ccfa7cbf93d496ac15a56834cbcf98c397b4024a2691233b8d",
    )?;
    let expected_tag = hex("83de3541e4c2b58177e065a9bf7b62ec")?;

    let gcm = Sm4Gcm::new(&hex(SM4_KEY)?)?;
    let (ct, tag) = gcm.encrypt(&nonce, &aad, &plaintext)?;
    if ct != expected_ct {
        return Err(SelfTestError::KatFailure(
            "SM4-GCM ciphertext mismatch".into(),
        ));
    }
    if tag[..] != expected_tag[..] {
        return Err(SelfTestError::KatFailure("SM4-GCM tag mismatch".into()));
    }

    let pt = gcm.decrypt(&nonce, &aad, &ct, &tag)?;
    if pt != plaintext {
        return Err(SelfTestError::KatFailure(
            "SM4-GCM plaintext mismatch".into(),
        ));
    }

    let mut forged = tag;
    forged[0] ^= 0x01;
    if gcm.decrypt(&nonce, &aad, &ct, &forged).is_ok() {
        return Err(SelfTestError::KatFailure(
            "SM4-GCM accepted a forged tag".into(),
        ));
    }
    Ok(())
}

/// SM3, GB/T 32905-2016 Appendix A example 1.
fn kat_sm3() -> Result<(), SelfTestError> {
    let expected = hex("66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0")?;
    let digest = Sm3::digest(b"abc")?;
    if digest[..] != expected[..] {
        return Err(SelfTestError::KatFailure("SM3 digest mismatch".into()));
    }
    Ok(())
}
