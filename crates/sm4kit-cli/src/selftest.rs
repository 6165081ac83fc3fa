//! Self-test command.

use sm4kit_crypto::self_test::SelfTest;

pub fn run(full: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut module = if full {
        SelfTest::with_full()
    } else {
        SelfTest::new()
    };
    let report = module.run()?;
    println!("{report}");
    println!("Self-tests passed");
    Ok(())
}
