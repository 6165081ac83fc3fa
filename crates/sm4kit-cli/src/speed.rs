//! Throughput benchmark per SM4 backend.

use std::time::{Duration, Instant};

use sm4kit_crypto::modes::gcm::Sm4Gcm;
use sm4kit_crypto::sm3::Sm3;
use sm4kit_crypto::sm4::{Backend, Sm4Key};
use sm4kit_types::{CipherAlgId, CryptoError};

/// Bytes processed per operation.
const CHUNK: usize = 8192;

pub fn run(
    algorithm: &str,
    seconds: u64,
    backend: Option<Backend>,
) -> Result<(), Box<dyn std::error::Error>> {
    let backends = match backend {
        Some(b) => vec![b],
        None => Backend::supported(),
    };
    run_for(algorithm, Duration::from_secs(seconds), &backends)
}

fn run_for(
    algorithm: &str,
    duration: Duration,
    backends: &[Backend],
) -> Result<(), Box<dyn std::error::Error>> {
    match algorithm.to_ascii_lowercase().as_str() {
        "sm3" => bench_sm3(duration),
        "all" => {
            for &backend in backends {
                bench_cipher(CipherAlgId::Sm4Ecb, backend, duration)?;
            }
            for &backend in backends {
                bench_cipher(CipherAlgId::Sm4Gcm, backend, duration)?;
            }
            bench_sm3(duration)
        }
        name => match CipherAlgId::from_name(name) {
            Some(id) => {
                for &backend in backends {
                    bench_cipher(id, backend, duration)?;
                }
                Ok(())
            }
            None => Err(format!(
                "unknown algorithm: {algorithm}\n\
                 Valid: sm4-ecb, sm4-gcm, sm3, all"
            )
            .into()),
        },
    }
}

fn bench_cipher(
    id: CipherAlgId,
    backend: Backend,
    duration: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = [0x42u8; 16];
    let name = format!("{}/{backend}", id.name());
    match id {
        CipherAlgId::Sm4Ecb => {
            let cipher = Sm4Key::with_backend(&key, backend)?;
            let mut blocks = vec![[0u8; 16]; CHUNK / 16];
            measure(&name, duration, || {
                cipher.encrypt_blocks(&mut blocks);
                Ok(())
            })
        }
        CipherAlgId::Sm4Gcm => {
            let gcm = Sm4Gcm::with_backend(&key, backend)?;
            let nonce = [0x01u8; 12];
            let plaintext = vec![0u8; CHUNK];
            let mut out = vec![0u8; CHUNK];
            measure(&name, duration, || {
                gcm.encrypt_into(&nonce, b"benchmark", &plaintext, &mut out)
                    .map(|_| ())
            })
        }
    }
}

fn bench_sm3(duration: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let block = vec![0u8; CHUNK];
    measure("sm3", duration, || Sm3::digest(&block).map(|_| ()))
}

fn measure<F>(name: &str, duration: Duration, mut op: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut() -> Result<(), CryptoError>,
{
    let start = Instant::now();
    let mut total_bytes: u64 = 0;
    let mut ops: u64 = 0;

    while start.elapsed() < duration {
        op()?;
        total_bytes += CHUNK as u64;
        ops += 1;
    }

    let elapsed = start.elapsed().as_secs_f64();
    let mb_per_sec = total_bytes as f64 / (1024.0 * 1024.0) / elapsed;
    println!("{name:24} {mb_per_sec:10.2} MB/s  ({ops} ops in {elapsed:.2}s)");
    Ok(())
}
