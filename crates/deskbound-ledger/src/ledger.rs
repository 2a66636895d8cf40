//! The money contract used by the simulation core.

use crate::LedgerError;

/// Receiver of work payouts and purchase settlements.
///
/// All methods take `&self`: implementations synchronise internally so a
/// ledger can be shared between the scheduler and any other caller.
pub trait Ledger: Send + Sync {
    /// Credit `amount` coins. Returns the balance after the credit.
    fn add_money(&self, amount: u64) -> Result<u64, LedgerError>;

    /// Debit `amount` coins if the balance covers it.
    ///
    /// Returns `false` and leaves the balance untouched otherwise.
    fn try_spend_money(&self, amount: u64) -> bool;

    /// Return `amount` coins from a purchase that did not complete.
    /// Returns the balance after the refund.
    fn refund_money(&self, amount: u64) -> Result<u64, LedgerError>;
}
