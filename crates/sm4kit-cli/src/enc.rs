//! File encryption/decryption with SM4-GCM.
//!
//! Output framing: nonce (12) || ciphertext || tag (16).

use std::fs;

use sm4kit_crypto::modes::gcm::{Sm4Gcm, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use sm4kit_crypto::sm4::{Backend, SM4_KEY_SIZE};
use sm4kit_types::CipherAlgId;
use zeroize::Zeroizing;

/// Environment variable holding the hex key when `--key` is absent.
pub const KEY_ENV: &str = "SM4KIT_KEY";

pub struct EncArgs<'a> {
    pub cipher: &'a str,
    pub decrypt: bool,
    pub input: &'a str,
    pub output: &'a str,
    pub key: Option<&'a str>,
    pub aad: Option<&'a str>,
    pub backend: Option<Backend>,
}

pub fn run(args: &EncArgs<'_>) -> Result<(), Box<dyn std::error::Error>> {
    match CipherAlgId::from_name(args.cipher) {
        Some(CipherAlgId::Sm4Gcm) => {}
        Some(other) => {
            return Err(format!("{} is not an authenticated mode; use sm4-gcm", other.name()).into())
        }
        None => return Err(format!("cipher '{}' not supported. Supported: sm4-gcm", args.cipher).into()),
    }

    let op = if args.decrypt { "Decrypting" } else { "Encrypting" };
    eprintln!("{op} {} -> {} with sm4-gcm", args.input, args.output);

    let data = fs::read(args.input)?;
    let aad = args.aad.map(hex_decode).transpose()?.unwrap_or_default();
    let key_hex = match args.key {
        Some(k) => Some(Zeroizing::new(k.to_string())),
        None => std::env::var(KEY_ENV).ok().map(Zeroizing::new),
    };

    if args.decrypt {
        let key_hex = key_hex
            .ok_or_else(|| format!("pass --key or set {KEY_ENV} to the hex key"))?;
        let key = parse_key(&key_hex)?;
        let plaintext = Zeroizing::new(decrypt(&key, &aad, &data, args.backend)?);
        fs::write(args.output, plaintext.as_slice())?;
        eprintln!("Decrypted {} bytes", plaintext.len());
    } else {
        let generated = key_hex.is_none();
        let key = match key_hex {
            Some(k) => parse_key(&k)?,
            None => random_key()?,
        };
        let mut nonce = [0u8; GCM_NONCE_SIZE];
        getrandom::getrandom(&mut nonce).map_err(|e| format!("random failed: {e}"))?;

        let out = encrypt(&key, &nonce, &aad, &data, args.backend)?;
        fs::write(args.output, &out)?;
        if generated {
            let key_hex = Zeroizing::new(hex_encode(key.as_slice()));
            eprintln!("Key (save this): {}", key_hex.as_str());
        }
    }
    Ok(())
}

fn context(key: &[u8], backend: Option<Backend>) -> Result<Sm4Gcm, Box<dyn std::error::Error>> {
    Ok(match backend {
        Some(b) => Sm4Gcm::with_backend(key, b)?,
        None => Sm4Gcm::new(key)?,
    })
}

/// Encrypt into the nonce || ciphertext || tag frame.
fn encrypt(
    key: &[u8],
    nonce: &[u8; GCM_NONCE_SIZE],
    aad: &[u8],
    plaintext: &[u8],
    backend: Option<Backend>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let gcm = context(key, backend)?;
    let mut out = vec![0u8; GCM_NONCE_SIZE + plaintext.len() + GCM_TAG_SIZE];
    let (head, rest) = out.split_at_mut(GCM_NONCE_SIZE);
    head.copy_from_slice(nonce);
    let (body, tail) = rest.split_at_mut(plaintext.len());
    let tag = gcm.encrypt_into(nonce, aad, plaintext, body)?;
    tail.copy_from_slice(&tag);
    Ok(out)
}

/// Open a nonce || ciphertext || tag frame.
fn decrypt(
    key: &[u8],
    aad: &[u8],
    frame: &[u8],
    backend: Option<Backend>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let min_len = GCM_NONCE_SIZE + GCM_TAG_SIZE;
    if frame.len() < min_len {
        return Err(
            format!("ciphertext too short (need at least nonce + tag = {min_len} bytes)").into(),
        );
    }
    let (nonce, rest) = frame.split_at(GCM_NONCE_SIZE);
    let (ct, tag) = rest.split_at(rest.len() - GCM_TAG_SIZE);
    Ok(context(key, backend)?.decrypt(nonce, aad, ct, tag)?)
}

fn random_key() -> Result<Zeroizing<Vec<u8>>, Box<dyn std::error::Error>> {
    let mut key = Zeroizing::new(vec![0u8; SM4_KEY_SIZE]);
    getrandom::getrandom(&mut key).map_err(|e| format!("random failed: {e}"))?;
    Ok(key)
}

fn parse_key(s: &str) -> Result<Zeroizing<Vec<u8>>, Box<dyn std::error::Error>> {
    let key = Zeroizing::new(hex_decode(s)?);
    if key.len() != SM4_KEY_SIZE {
        return Err(format!(
            "key must be {SM4_KEY_SIZE} bytes ({} hex chars)",
            SM4_KEY_SIZE * 2
        )
        .into());
    }
    Ok(key)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err("hex string must have even length".into());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex at position {i}").into())
        })
        .collect()
}
