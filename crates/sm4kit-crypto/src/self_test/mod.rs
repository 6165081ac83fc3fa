//! Power-on self-test harness.
//!
//! Provides a self-test state machine for the SM4 engine:
//! - **State machine**: PreOperational → SelfTesting → Operational / Error
//! - **KAT**: known answer tests for SM4, SM4-GCM, GF(2^128) and SM3
//! - **Differential**: every backend this CPU supports against `Basic`
//!
//! All functionality is gated behind `#[cfg(feature = "self-test")]`.

mod differential;
mod kat;

use std::fmt;

use log::debug;
use sm4kit_types::SelfTestError;

use crate::sm4::Backend;

/// Self-test module states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestState {
    /// Initial state before self-tests have been run.
    PreOperational,
    /// Self-tests are currently executing.
    SelfTesting,
    /// All self-tests passed; module is ready for use.
    Operational,
    /// A self-test failed; module must not be used.
    Error,
}

/// What a successful run covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestReport {
    /// Known answer tests that passed, in execution order.
    pub kats: Vec<&'static str>,
    /// Backends that matched the reference backend.
    pub backends: Vec<Backend>,
}

impl fmt::Display for SelfTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "KAT:      {}", self.kats.join(" "))?;
        let names: Vec<_> = self.backends.iter().map(|b| b.name()).collect();
        write!(f, "Backends: {}", names.join(" "))
    }
}

/// Self-test module that manages state and execution.
///
/// # Usage
///
/// ```no_run
/// use sm4kit_crypto::self_test::SelfTest;
///
/// let mut module = SelfTest::new();
/// module.run().expect("self-tests failed");
/// assert!(module.is_operational());
/// ```
pub struct SelfTest {
    state: SelfTestState,
    full: bool,
}

impl SelfTest {
    /// Create a new module in `PreOperational` state.
    pub fn new() -> Self {
        SelfTest {
            state: SelfTestState::PreOperational,
            full: false,
        }
    }

    /// Like [`SelfTest::new`], but also runs the 1,000,000-iteration SM4 KAT.
    pub fn with_full() -> Self {
        SelfTest {
            full: true,
            ..Self::new()
        }
    }

    /// Return the current module state.
    pub fn state(&self) -> SelfTestState {
        self.state
    }

    /// Return true if the module is in the `Operational` state.
    pub fn is_operational(&self) -> bool {
        self.state == SelfTestState::Operational
    }

    /// Run all self-tests: KATs, then backend differential checks.
    ///
    /// On success, transitions to `Operational`.
    /// On failure, transitions to `Error` and returns the first failure.
    pub fn run(&mut self) -> Result<SelfTestReport, SelfTestError> {
        if self.state == SelfTestState::Error {
            return Err(SelfTestError::InvalidState);
        }

        self.state = SelfTestState::SelfTesting;
        match self.run_all() {
            Ok(report) => {
                self.state = SelfTestState::Operational;
                Ok(report)
            }
            Err(e) => {
                self.state = SelfTestState::Error;
                Err(e)
            }
        }
    }

    fn run_all(&self) -> Result<SelfTestReport, SelfTestError> {
        let mut report = SelfTestReport {
            kats: Vec::new(),
            backends: Vec::new(),
        };

        let extra = self.full.then_some(&kat::KAT_SM4_MILLION);
        for kat in kat::KATS.iter().chain(extra) {
            (kat.run)()?;
            debug!("self-test: kat {} passed", kat.name);
            report.kats.push(kat.name);
        }

        for backend in Backend::supported() {
            differential::check_backend(backend)?;
            debug!("self-test: backend {backend} matches reference");
            report.backends.push(backend);
        }
        Ok(report)
    }
}

impl Default for SelfTest {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the standard self-tests once on a fresh module.
pub fn run_self_tests() -> Result<SelfTestReport, SelfTestError> {
    SelfTest::new().run()
}
