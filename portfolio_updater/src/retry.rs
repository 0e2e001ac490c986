//! Bounded retries around remote calls.
//!
//! Only errors that `PortfolioError::is_transient` accepts are retried. The
//! delay grows linearly with the attempt number. When the attempts run out the
//! last error is returned and the run aborts.
use std::thread;
use std::time::Duration;

use log::warn;
use portfolio_common::Result;

/// Retry policy for one kind of remote call.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    attempts: u32,
    delay: Duration,
}

impl Retry {
    /// `attempts` is the total number of tries; zero is treated as one.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Retry {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// A single try, no waiting.
    pub fn once() -> Self {
        Retry::new(1, Duration::ZERO)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let wait = self.delay * attempt;
                    warn!(
                        "{what} failed (attempt {attempt}/{}): {e}; retrying in {:?}",
                        self.attempts, wait
                    );
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portfolio_common::PortfolioError;

    #[test]
    fn retries_transient_errors_until_success() {
        let mut calls = 0;
        let value = Retry::new(3, Duration::ZERO)
            .run("fetch", || {
                calls += 1;
                if calls < 3 {
                    Err(PortfolioError::QuoteFetch("timeout".into()))
                } else {
                    Ok(42)
                }
            })
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_the_bound() {
        let mut calls = 0;
        let err = Retry::new(2, Duration::ZERO)
            .run("read", || -> Result<()> {
                calls += 1;
                Err(PortfolioError::SheetAccess("503".into()))
            })
            .unwrap_err();
        assert!(matches!(err, PortfolioError::SheetAccess(_)));
        assert_eq!(calls, 2);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let mut calls = 0;
        let err = Retry::new(5, Duration::ZERO)
            .run("read", || -> Result<()> {
                calls += 1;
                Err(PortfolioError::Authentication("401".into()))
            })
            .unwrap_err();
        assert!(matches!(err, PortfolioError::Authentication(_)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _ = Retry::new(0, Duration::ZERO).run("x", || -> Result<()> {
            calls += 1;
            Err(PortfolioError::QuoteFetch("down".into()))
        });
        assert_eq!(calls, 1);
    }
}
