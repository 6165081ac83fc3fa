//! SM3 digest command.

use std::fs;
use std::io::{self, Read};

use sm4kit_crypto::sm3::Sm3;

pub fn run(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    let hex = digest_hex(file)?;
    if file == "-" {
        println!("SM3(stdin)= {hex}");
    } else {
        println!("SM3({file})= {hex}");
    }
    Ok(())
}

/// Hash a file (or stdin for `-`) in 64 KiB reads.
fn digest_hex(file: &str) -> Result<String, Box<dyn std::error::Error>> {
    let mut reader: Box<dyn Read> = if file == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(fs::File::open(file)?)
    };

    let mut ctx = Sm3::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.update(&buf[..n])?;
    }
    let digest = ctx.finish()?;
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}
