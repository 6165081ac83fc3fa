//! Published SM4, SM4-GCM and SM3 vectors, run against every backend.
//!
//! Vectors are stored in `tests/vectors/sm4kit.json`: GB/T 32907 and
//! GB/T 32905 examples, RFC 8998 Appendix A.1, and derived edge cases
//! (non-96-bit nonces, empty inputs, single-bit forgeries).

use serde::Deserialize;
use sm4kit_crypto::modes::gcm::{sm4_gcm_decrypt, sm4_gcm_encrypt, Sm4Gcm};
use sm4kit_crypto::sm3::Sm3;
use sm4kit_crypto::sm4::{Backend, Sm4Key};
use sm4kit_types::CryptoError;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// JSON schema
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct VectorFile {
    #[serde(rename = "numberOfTests")]
    number_of_tests: usize,
    sm4: Vec<BlockTest>,
    #[serde(rename = "sm4Gcm")]
    sm4_gcm: Vec<AeadTest>,
    sm3: Vec<HashTest>,
}

#[derive(Deserialize)]
struct BlockTest {
    #[serde(rename = "tcId")]
    tc_id: usize,
    key: String,
    pt: String,
    ct: String,
}

#[derive(Deserialize)]
struct AeadTest {
    #[serde(rename = "tcId")]
    tc_id: usize,
    comment: String,
    key: String,
    iv: String,
    aad: String,
    msg: String,
    ct: String,
    tag: String,
    result: String,
}

#[derive(Deserialize)]
struct HashTest {
    #[serde(rename = "tcId")]
    tc_id: usize,
    msg: String,
    md: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn vectors_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/vectors/sm4kit.json")
}

fn load() -> VectorFile {
    let path = vectors_path();
    let data = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    serde_json::from_str(&data)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
}

fn hex_decode(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// SM4
// ---------------------------------------------------------------------------

#[test]
fn vectors_sm4_ecb() {
    let file = load();
    let mut tested = 0;

    for backend in Backend::supported() {
        for tc in &file.sm4 {
            let key = Sm4Key::with_backend(&hex_decode(&tc.key), backend).unwrap();
            let pt = hex_decode(&tc.pt);
            let ct = hex_decode(&tc.ct);

            let mut buf = pt.clone();
            key.encrypt_ecb(&mut buf).unwrap();
            assert_eq!(buf, ct, "tc {} on {backend}: encrypt mismatch", tc.tc_id);
            key.decrypt_ecb(&mut buf).unwrap();
            assert_eq!(buf, pt, "tc {} on {backend}: decrypt mismatch", tc.tc_id);
            tested += 1;
        }
    }

    assert!(tested > 0, "No SM4 tests were run");
}

// ---------------------------------------------------------------------------
// SM4-GCM
// ---------------------------------------------------------------------------

#[test]
fn vectors_sm4_gcm() {
    let file = load();
    let mut tested = 0;

    for backend in Backend::supported() {
        for tc in &file.sm4_gcm {
            let gcm = Sm4Gcm::with_backend(&hex_decode(&tc.key), backend).unwrap();
            let nonce = hex_decode(&tc.iv);
            let aad = hex_decode(&tc.aad);
            let msg = hex_decode(&tc.msg);
            let ct = hex_decode(&tc.ct);
            let tag = hex_decode(&tc.tag);
            let id = format!("tc {} ({}) on {backend}", tc.tc_id, tc.comment);

            match tc.result.as_str() {
                "valid" => {
                    let (encrypted, computed) = gcm.encrypt(&nonce, &aad, &msg).unwrap();
                    assert_eq!(encrypted, ct, "{id}: ciphertext mismatch");
                    assert_eq!(computed[..], tag[..], "{id}: tag mismatch");
                    let decrypted = gcm.decrypt(&nonce, &aad, &ct, &tag).unwrap();
                    assert_eq!(decrypted, msg, "{id}: decrypt mismatch");
                }
                "invalid" => {
                    assert_eq!(
                        gcm.decrypt(&nonce, &aad, &ct, &tag),
                        Err(CryptoError::AeadTagVerifyFail),
                        "{id}: expected decrypt to fail"
                    );
                    let mut out = vec![0xa5u8; ct.len()];
                    assert!(gcm.decrypt_into(&nonce, &aad, &ct, &tag, &mut out).is_err());
                    assert!(out.iter().all(|&b| b == 0), "{id}: output not cleared");
                }
                other => panic!("{id}: unknown result {other}"),
            }
            tested += 1;
        }
    }

    assert!(tested > 0, "No SM4-GCM tests were run");
}

#[test]
fn vectors_sm4_gcm_one_shot() {
    let file = load();

    for tc in &file.sm4_gcm {
        let key = hex_decode(&tc.key);
        let nonce = hex_decode(&tc.iv);
        let aad = hex_decode(&tc.aad);
        let ct_tag: Vec<u8> = hex_decode(&tc.ct)
            .into_iter()
            .chain(hex_decode(&tc.tag))
            .collect();

        match tc.result.as_str() {
            "valid" => {
                let msg = hex_decode(&tc.msg);
                assert_eq!(
                    sm4_gcm_encrypt(&key, &nonce, &aad, &msg).unwrap(),
                    ct_tag,
                    "tc {}: encrypt mismatch",
                    tc.tc_id
                );
                assert_eq!(
                    sm4_gcm_decrypt(&key, &nonce, &aad, &ct_tag).unwrap(),
                    msg,
                    "tc {}: decrypt mismatch",
                    tc.tc_id
                );
            }
            _ => assert!(
                sm4_gcm_decrypt(&key, &nonce, &aad, &ct_tag).is_err(),
                "tc {}: expected decrypt to fail",
                tc.tc_id
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// SM3
// ---------------------------------------------------------------------------

#[test]
fn vectors_sm3() {
    let file = load();

    for tc in &file.sm3 {
        let msg = hex_decode(&tc.msg);
        let md = Sm3::digest(&msg).unwrap();
        assert_eq!(md.to_vec(), hex_decode(&tc.md), "tc {}: digest mismatch", tc.tc_id);
    }

    let total = file.sm4.len() + file.sm4_gcm.len() + file.sm3.len();
    assert_eq!(total, file.number_of_tests);
}
