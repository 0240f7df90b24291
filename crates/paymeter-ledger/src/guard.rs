//! Call-scoped reentrancy guard.
//!
//! External asset transfers hand control to untrusted code (transfer and
//! receive hooks) before the invoking entry point returns. The guard is a
//! flag acquired at the top of every value-transferring entry point and
//! released on every exit path — success or failure — so a nested call
//! arriving mid-transfer is rejected and the flag can never stay stuck.

use paymeter_types::{MarketError, Result};

/// Reentrancy gate for the controller's guarded entry points.
#[derive(Debug, Default)]
pub struct CallGuard {
    held: bool,
}

impl CallGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard.
    ///
    /// # Errors
    /// Returns [`MarketError::ReentrancyBlocked`] if a guarded entry point
    /// is already executing.
    pub fn enter(&mut self) -> Result<()> {
        if self.held {
            return Err(MarketError::ReentrancyBlocked);
        }
        self.held = true;
        Ok(())
    }

    /// Release the guard. Idempotent: releasing an unheld guard is a no-op,
    /// so every exit path can call it unconditionally.
    pub fn exit(&mut self) {
        self.held = false;
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }
}
