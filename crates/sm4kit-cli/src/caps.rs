//! CPU capability report.

use sm4kit_crypto::cpu;
use sm4kit_crypto::sm4::Backend;

pub fn run(selected: Backend) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", report(selected));
    Ok(())
}

fn report(selected: Backend) -> String {
    let info = cpu::cpu_info();
    let mut out = format!("{info}\n\nBackends:\n");
    for backend in Backend::ALL {
        let mark = if backend == selected { "*" } else { " " };
        let status = if backend.is_supported() {
            "supported"
        } else {
            "unavailable"
        };
        out += &format!(
            "  {mark} {:12} {:2} lanes  {status}  (needs: {})\n",
            backend.name(),
            backend.lanes(),
            backend.required_caps()
        );
    }
    out += &format!("Recommended: {}\n", cpu::recommended_backend());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_report_lists_every_backend() {
        let text = report(Backend::Table);
        for backend in Backend::ALL {
            assert!(text.contains(backend.name()));
        }
        assert!(text.contains("* table"));
        assert!(text.contains("Vendor:"));
        assert!(text.contains(&format!("Recommended: {}", cpu::recommended_backend())));
    }
}
