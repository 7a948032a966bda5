//! Reentrancy guard
//!
//! One mutating call may be in flight at a time. A nested entry, for example
//! from an asset hook calling back into the farm, is rejected instead of
//! blocking.

use lockfarm_core::{FarmError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

/// Held for the duration of a mutating call; releases the guard on drop
#[derive(Debug)]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> Result<Entered<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| {
                tracing::warn!("Rejected reentrant call while another call is in flight");
                FarmError::ReentrancyRejected
            })?;
        Ok(Entered { guard: self })
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let outer = guard.enter().unwrap();
        assert_eq!(guard.enter().unwrap_err(), FarmError::ReentrancyRejected);
        drop(outer);
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_error_path() {
        let guard = ReentrancyGuard::new();
        let attempt = || -> Result<()> {
            let _entered = guard.enter()?;
            Err(FarmError::ZeroAmount)
        };
        assert_eq!(attempt(), Err(FarmError::ZeroAmount));
        assert!(guard.enter().is_ok());
    }
}
