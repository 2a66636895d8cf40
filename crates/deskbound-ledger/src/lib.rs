//! Money for the Deskbound office simulation.
//!
//! The simulation only ever talks to money through the narrow [`Ledger`]
//! contract: credit a work payout, try to spend on a purchase, refund a
//! cancelled purchase. [`Wallet`] is the in-memory implementation and keeps
//! an append-only log of every balance change.
//!
//! # Modules
//!
//! - [`ledger`] -- The [`Ledger`] trait.
//! - [`wallet`] -- [`Wallet`], a thread-safe balance with an entry log.
//! - [`pricing`] -- [`Shop`] and [`PriceSchedule`]: escalating prices per
//!   shop item, advanced only when a purchase is confirmed.
//!
//! # Usage
//!
//! ```
//! use deskbound_ledger::{Ledger, Wallet};
//!
//! let wallet = Wallet::new(10);
//! assert!(wallet.try_spend_money(8));
//! assert!(!wallet.try_spend_money(8));
//! wallet.refund_money(8).ok();
//! assert_eq!(wallet.balance(), 10);
//! ```

pub mod ledger;
pub mod pricing;
pub mod wallet;

pub use ledger::Ledger;
pub use pricing::{PriceSchedule, Shop, ShopItem, ShopOffer};
pub use wallet::{EntryKind, Wallet, WalletEntry};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by money and pricing operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Crediting would push the balance past `u64::MAX`.
    #[error("balance overflow: {balance} + {amount}")]
    BalanceOverflow {
        /// Balance before the credit.
        balance: u64,
        /// Rejected amount.
        amount: u64,
    },

    /// A shop item was configured without any cost.
    #[error("shop item `{item}` has an empty cost list")]
    EmptyPriceList {
        /// The misconfigured item.
        item: String,
    },

    /// A shop item name was registered twice.
    #[error("shop item `{item}` is already defined")]
    DuplicateItem {
        /// The repeated item name.
        item: String,
    },

    /// No shop item has this name.
    #[error("unknown shop item `{item}`")]
    UnknownItem {
        /// The requested item name.
        item: String,
    },
}
