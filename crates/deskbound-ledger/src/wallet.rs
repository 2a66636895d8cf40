//! The in-memory wallet.
//!
//! [`Wallet`] holds the balance behind a mutex and appends one
//! [`WalletEntry`] per non-zero change, tagged with the scheduler tick that
//! was current when it happened.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::LedgerError;
use crate::ledger::Ledger;

/// Direction of a wallet entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Work payout.
    Earn,
    /// Purchase.
    Spend,
    /// Purchase returned.
    Refund,
}

/// One recorded balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    /// What kind of change this was.
    pub kind: EntryKind,
    /// Coins moved. Always non-zero.
    pub amount: u64,
    /// Balance right after the change.
    pub balance_after: u64,
    /// Scheduler tick during which the change happened.
    pub tick: u64,
    /// Wall-clock time of the change.
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug)]
struct WalletState {
    balance: u64,
    tick: u64,
    entries: Vec<WalletEntry>,
}

impl WalletState {
    fn record(&mut self, kind: EntryKind, amount: u64) {
        self.entries.push(WalletEntry {
            kind,
            amount,
            balance_after: self.balance,
            tick: self.tick,
            recorded_at: Utc::now(),
        });
    }

    fn credit(&mut self, kind: EntryKind, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Ok(self.balance);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                balance: self.balance,
                amount,
            })?;
        self.record(kind, amount);
        Ok(self.balance)
    }
}

/// Thread-safe coin balance with an append-only entry log.
#[derive(Debug)]
pub struct Wallet {
    state: Mutex<WalletState>,
}

impl Wallet {
    /// Create a wallet holding `starting_money` coins. The starting balance
    /// is not logged as an entry.
    pub const fn new(starting_money: u64) -> Self {
        Self {
            state: Mutex::new(WalletState {
                balance: starting_money,
                tick: 0,
                entries: Vec::new(),
            }),
        }
    }

    /// Current balance.
    pub fn balance(&self) -> u64 {
        self.lock().balance
    }

    /// Set the tick stamped on subsequent entries.
    pub fn set_tick(&self, tick: u64) {
        self.lock().tick = tick;
    }

    /// Snapshot of every entry, oldest first.
    pub fn entries(&self) -> Vec<WalletEntry> {
        self.lock().entries.clone()
    }

    /// Number of logged entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no change has been logged yet.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Sum of all entries of one kind, saturating.
    pub fn total(&self, kind: EntryKind) -> u64 {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .fold(0_u64, |sum, entry| sum.saturating_add(entry.amount))
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Ledger for Wallet {
    fn add_money(&self, amount: u64) -> Result<u64, LedgerError> {
        let mut state = self.lock();
        let balance = state.credit(EntryKind::Earn, amount)?;
        debug!(amount, balance, tick = state.tick, "money added");
        Ok(balance)
    }

    fn try_spend_money(&self, amount: u64) -> bool {
        let mut state = self.lock();
        let Some(remaining) = state.balance.checked_sub(amount) else {
            debug!(amount, balance = state.balance, "spend refused, insufficient funds");
            return false;
        };
        if amount > 0 {
            state.balance = remaining;
            state.record(EntryKind::Spend, amount);
            info!(amount, balance = remaining, tick = state.tick, "money spent");
        }
        true
    }

    fn refund_money(&self, amount: u64) -> Result<u64, LedgerError> {
        let mut state = self.lock();
        let balance = state.credit(EntryKind::Refund, amount)?;
        info!(amount, balance, tick = state.tick, "money refunded");
        Ok(balance)
    }
}
