//! Prepaid balance type
//!
//! Single source of truth for in-memory balance arithmetic. All mutations
//! go through these methods; the durable store mirrors the same rules with
//! conditional SQL updates.
//!
//! # Invariants (enforced by private fields):
//! - balance never observable below zero (u64 + guarded debit)
//! - version increments on every successful mutation
//! - no overflow (checked arithmetic)
use serde::{Deserialize, Serialize};

use crate::core_types::Amount;

/// Prepaid balance in minor currency units
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    avail: Amount,
    version: u64,
}

impl Balance {
    /// Create a balance with an initial amount (seed/import path)
    pub fn with_amount(avail: Amount) -> Self {
        Self { avail, version: 0 }
    }

    /// Rebuild from stored columns
    pub fn from_parts(avail: Amount, version: u64) -> Self {
        Self { avail, version }
    }

    /// Get available balance (read-only)
    #[inline(always)]
    pub const fn avail(&self) -> Amount {
        self.avail
    }

    /// Get mutation version (read-only)
    #[inline(always)]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Credit funds (top-up or refund)
    ///
    /// # Errors
    /// - Returns error on overflow
    pub fn credit(&mut self, amount: Amount) -> Result<(), &'static str> {
        self.avail = self.avail.checked_add(amount).ok_or("Credit overflow")?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Debit funds (order escrow)
    ///
    /// # Errors
    /// - "Insufficient funds" if avail < amount
    pub fn debit(&mut self, amount: Amount) -> Result<(), &'static str> {
        if self.avail < amount {
            return Err("Insufficient funds");
        }
        self.avail = self.avail.checked_sub(amount).ok_or("Debit underflow")?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Check-and-debit in one call: debits only when sufficient
    ///
    /// Returns true if the debit was applied. This is the in-memory
    /// counterpart of the conditional SQL update the Postgres store uses.
    pub fn try_debit(&mut self, amount: Amount) -> bool {
        self.debit(amount).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit() {
        let mut bal = Balance::default();
        assert_eq!(bal.avail(), 0);

        bal.credit(2000).unwrap();
        assert_eq!(bal.avail(), 2000);
        assert_eq!(bal.version(), 1);
    }

    #[test]
    fn test_credit_overflow() {
        let mut bal = Balance::with_amount(u64::MAX);
        assert!(bal.credit(1).is_err());
        assert_eq!(bal.avail(), u64::MAX);
    }

    #[test]
    fn test_debit() {
        let mut bal = Balance::with_amount(2000);
        bal.debit(1500).unwrap();
        assert_eq!(bal.avail(), 500);
        assert_eq!(bal.version(), 1);
    }

    #[test]
    fn test_debit_insufficient() {
        let mut bal = Balance::with_amount(500);
        assert!(bal.debit(1000).is_err());
        assert_eq!(bal.avail(), 500); // Unchanged
        assert_eq!(bal.version(), 0); // No version bump on failure
    }

    #[test]
    fn test_try_debit() {
        let mut bal = Balance::with_amount(2000);
        assert!(bal.try_debit(1500));
        assert!(!bal.try_debit(1000));
        assert_eq!(bal.avail(), 500);
    }

    #[test]
    fn test_escrow_round_trip() {
        // debit on create, credit on cancel: net zero
        let mut bal = Balance::with_amount(2000);
        bal.debit(1500).unwrap();
        bal.credit(1500).unwrap();
        assert_eq!(bal.avail(), 2000);
        assert_eq!(bal.version(), 2);
    }
}
