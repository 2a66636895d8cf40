//! Work rate per employee tier.
//!
//! A tier's profile is copied into the task when the employee is hired and
//! never changes afterwards.

use deskbound_types::Tier;
use serde::{Deserialize, Serialize};

/// Work interval and payout for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProfile {
    /// Simulated milliseconds between two payouts.
    pub work_interval_ms: u64,
    /// Coins credited per payout.
    pub money_per_tick: u64,
}

impl TierProfile {
    /// Create a profile.
    pub const fn new(work_interval_ms: u64, money_per_tick: u64) -> Self {
        Self {
            work_interval_ms,
            money_per_tick,
        }
    }
}

const fn default_intern() -> TierProfile {
    TierProfile::new(4000, 5)
}

const fn default_junior() -> TierProfile {
    TierProfile::new(3000, 15)
}

const fn default_mid() -> TierProfile {
    TierProfile::new(2000, 30)
}

const fn default_senior() -> TierProfile {
    TierProfile::new(1000, 60)
}

/// Profiles for every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    /// Intern profile (default: 4000 ms, 5 coins).
    #[serde(default = "default_intern")]
    pub intern: TierProfile,
    /// Junior profile (default: 3000 ms, 15 coins).
    #[serde(default = "default_junior")]
    pub junior: TierProfile,
    /// Mid profile (default: 2000 ms, 30 coins).
    #[serde(default = "default_mid")]
    pub mid: TierProfile,
    /// Senior profile (default: 1000 ms, 60 coins).
    #[serde(default = "default_senior")]
    pub senior: TierProfile,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            intern: default_intern(),
            junior: default_junior(),
            mid: default_mid(),
            senior: default_senior(),
        }
    }
}

impl TierTable {
    /// The profile for `tier`.
    pub const fn profile(&self, tier: Tier) -> TierProfile {
        match tier {
            Tier::Intern => self.intern,
            Tier::Junior => self.junior,
            Tier::Mid => self.mid,
            Tier::Senior => self.senior,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_published_rates() {
        let table = TierTable::default();
        let rates: Vec<_> = Tier::ALL
            .iter()
            .map(|tier| {
                let p = table.profile(*tier);
                (p.work_interval_ms, p.money_per_tick)
            })
            .collect();
        assert_eq!(rates, vec![(4000, 5), (3000, 15), (2000, 30), (1000, 60)]);
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let table: TierTable =
            serde_json::from_str(r#"{"senior": {"work_interval_ms": 500, "money_per_tick": 100}}"#)
                .unwrap();
        assert_eq!(table.senior, TierProfile::new(500, 100));
        assert_eq!(table.intern, TierProfile::new(4000, 5));
    }
}
