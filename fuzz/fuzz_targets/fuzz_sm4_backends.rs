#![no_main]
use libfuzzer_sys::fuzz_target;
use sm4kit_crypto::sm4::{Backend, Sm4Key};

fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }
    let (key, rest) = data.split_at(16);
    let blocks: Vec<[u8; 16]> = rest.as_chunks::<16>().0.to_vec();

    let reference = Sm4Key::with_backend(key, Backend::Basic).unwrap();
    let mut expected = blocks.clone();
    reference.encrypt_blocks(&mut expected);

    for backend in Backend::supported() {
        let cipher = Sm4Key::with_backend(key, backend).unwrap();
        let mut got = blocks.clone();
        cipher.encrypt_blocks(&mut got);
        assert_eq!(got, expected, "{backend} encrypt");
        cipher.decrypt_blocks(&mut got);
        assert_eq!(got, blocks, "{backend} decrypt");
    }
});
