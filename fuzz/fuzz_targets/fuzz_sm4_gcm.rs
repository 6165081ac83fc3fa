#![no_main]
use libfuzzer_sys::fuzz_target;
use sm4kit_crypto::modes::gcm::Sm4Gcm;

// Layout: key(16) | nonce_len(1) | nonce | aad_len(1) | aad | ct || tag.
fuzz_target!(|data: &[u8]| {
    if data.len() < 18 {
        return;
    }
    let (key, rest) = data.split_at(16);
    let nonce_len = (rest[0] as usize).min(rest.len() - 1);
    let (nonce, rest) = rest[1..].split_at(nonce_len);
    let Some((&aad_len, rest)) = rest.split_first() else {
        return;
    };
    let (aad, body) = rest.split_at((aad_len as usize).min(rest.len()));

    let Ok(gcm) = Sm4Gcm::new(key) else {
        return;
    };
    if body.len() >= 16 {
        let (ct, tag) = body.split_at(body.len() - 16);
        let mut out = vec![0xffu8; ct.len()];
        if gcm.decrypt_into(nonce, aad, ct, tag, &mut out).is_err() {
            assert!(out.iter().all(|&b| b == 0));
        }
    }

    if let Ok((ct, tag)) = gcm.encrypt(nonce, aad, body) {
        assert_eq!(gcm.decrypt(nonce, aad, &ct, &tag).unwrap(), body);
    }
});
