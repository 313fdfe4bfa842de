//! Test support for driving surrogates to completion and asserting on how
//! they settled.
//!
//! This module provides tools for:
//! - Building surrogates over already-settled values
//! - Blocking on a surrogate and asserting on its value or fault
//! - Observing which blessed handlers fired, and when, on a local executor
//! - Opt-in log output through `RUST_LOG`

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use futures::executor::{block_on, LocalPool};
use futures::task::LocalSpawnExt;
use tracing_subscriber::EnvFilter;

use crate::deferred::{Deferred, Outcome};
use crate::errors::{format_fault, ErrorConfig, Fault};
use crate::surrogate::{wrap, Surrogate};
use crate::value::Value;

// ============================================================================
// Logging
// ============================================================================

static INIT_LOGGING: Once = Once::new();

/// Install a test-friendly subscriber once per process.
///
/// Filtering follows `RUST_LOG`; with it unset only warnings are shown.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Construction
// ============================================================================

/// A surrogate over a value that is already available
pub fn resolved(value: impl Into<Value>) -> Surrogate {
    wrap(Deferred::resolved(value))
}

/// A surrogate over a computation that already failed
pub fn rejected(fault: Fault) -> Surrogate {
    wrap(Deferred::rejected(fault))
}

// ============================================================================
// Settling and Assertions
// ============================================================================

/// Block until the surrogate settles.
///
/// Blocks forever on a pending value whose settler is still alive; use an
/// `Observer` for those.
pub fn settle(surrogate: &Surrogate) -> Outcome {
    block_on(surrogate.then(Ok))
}

/// Settle and return the value, panicking with a rendered report on failure
pub fn expect_value(surrogate: &Surrogate) -> Value {
    match settle(surrogate) {
        Ok(value) => value,
        Err(fault) => panic!(
            "Expected {} to resolve, but it failed:\n{}",
            surrogate.path(),
            format_fault(&fault, &ErrorConfig::default())
        ),
    }
}

/// Settle and return the fault, panicking if the surrogate resolved
pub fn expect_fault(surrogate: &Surrogate) -> Fault {
    match settle(surrogate) {
        Ok(value) => panic!(
            "Expected {} to fail, but it resolved to: {:?}",
            surrogate.path(),
            value
        ),
        Err(fault) => fault,
    }
}

/// Assert that the surrogate resolves to `expected`
pub fn assert_resolves_to(surrogate: &Surrogate, expected: impl Into<Value>) {
    let expected = expected.into();
    let actual = expect_value(surrogate);
    assert_eq!(
        actual,
        expected,
        "Value mismatch at {}.\nExpected: {:?}\nActual: {:?}",
        surrogate.path(),
        expected,
        actual
    );
}

/// Assert that the surrogate fails with a fault accepted by `check`
pub fn assert_fails_with<F>(surrogate: &Surrogate, check: F)
where
    F: FnOnce(&Fault) -> bool,
{
    let fault = expect_fault(surrogate);
    assert!(
        check(&fault),
        "Fault mismatch at {}.\nActual fault: {:?}",
        surrogate.path(),
        fault
    );
}

// ============================================================================
// Observation
// ============================================================================

/// One blessed handler firing
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Success(Value),
    Failure(Fault),
    Settled,
}

/// Subscribes to surrogates on a single-threaded pool and records every
/// handler that fires. Nothing runs until `run` is called.
pub struct Observer {
    pool: LocalPool,
    log: Rc<RefCell<Vec<Observation>>>,
}

impl Observer {
    pub fn new() -> Self {
        Self {
            pool: LocalPool::new(),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Attach success, failure and settled handlers to `surrogate`
    pub fn watch(&mut self, surrogate: &Surrogate) {
        let on_success = Rc::clone(&self.log);
        let on_failure = Rc::clone(&self.log);
        let on_settled = Rc::clone(&self.log);

        let observed = surrogate
            .then(move |value| {
                on_success.borrow_mut().push(Observation::Success(value.clone()));
                Ok(value)
            })
            .catch(move |fault| {
                on_failure.borrow_mut().push(Observation::Failure(fault.clone()));
                Err(fault)
            })
            .finally(move || on_settled.borrow_mut().push(Observation::Settled));

        self.pool
            .spawner()
            .spawn_local(async move {
                let _ = observed.await;
            })
            .expect("local pool accepts tasks");
    }

    /// Drive every watched surrogate as far as it can go without blocking
    pub fn run(&mut self) {
        self.pool.run_until_stalled();
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.log.borrow().clone()
    }

    /// Check that exactly these observations were recorded, in order
    pub fn assert_observed(&self, expected: &[Observation]) {
        let actual = self.observations();
        assert_eq!(
            actual, expected,
            "Observation mismatch.\nExpected: {:?}\nActual: {:?}",
            expected, actual
        );
    }

    /// Print the observation log for debugging
    pub fn print_log(&self) {
        println!("=== Observations ===");
        for (i, observation) in self.log.borrow().iter().enumerate() {
            match observation {
                Observation::Success(value) => println!("{:4}: SUCCESS {:?}", i, value),
                Observation::Failure(fault) => println!("{:4}: FAILURE {}", i, fault),
                Observation::Settled => println!("{:4}: SETTLED", i),
            }
        }
        println!("=== End Observations ===");
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Test Macros
// ============================================================================

/// Macro for asserting a surrogate resolves to a value
#[macro_export]
macro_rules! assert_resolves_to {
    ($surrogate:expr, $expected:expr) => {
        $crate::test_support::assert_resolves_to(&$surrogate, $expected)
    };
}

/// Macro for asserting a surrogate fails with a fault matching a pattern
#[macro_export]
macro_rules! assert_fails_with {
    ($surrogate:expr, $pattern:pat) => {
        $crate::test_support::assert_fails_with(&$surrogate, |fault| matches!(fault, $pattern))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_value() {
        assert_eq!(expect_value(&resolved(3)), Value::from(3));
    }

    #[test]
    #[should_panic(expected = "Expected $ to resolve")]
    fn test_expect_value_panics_on_failure() {
        expect_value(&rejected(Fault::Abandoned));
    }

    #[test]
    fn test_observer_waits_for_run() {
        let (deferred, settler) = Deferred::pending();
        let mut observer = Observer::new();
        observer.watch(&wrap(deferred));

        observer.run();
        observer.assert_observed(&[]);

        settler.resolve(1);
        observer.run();
        observer.assert_observed(&[Observation::Success(Value::from(1)), Observation::Settled]);
    }

    #[test]
    fn test_observer_records_failure() {
        let mut observer = Observer::default();
        observer.watch(&rejected(Fault::thrown("x")));
        observer.run();
        observer.print_log();
        observer.assert_observed(&[
            Observation::Failure(Fault::thrown("x")),
            Observation::Settled,
        ]);
    }

    #[test]
    fn test_macros() {
        assert_resolves_to!(resolved("a"), "a");
        assert_fails_with!(rejected(Fault::Abandoned), Fault::Abandoned);
    }
}
