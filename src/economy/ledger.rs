//! Resource ledger - settlement-level resource balances
//!
//! Balances are whole units and never go below zero. Multi-resource costs are
//! validated in full before any balance changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{EngineError, Result};
use crate::core::types::ResourceKind;

/// A bundle of resource amounts (an action cost, a loot haul, a yield)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(BTreeMap<ResourceKind, u64>);

impl Cost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper: `Cost::new().with("gold", 20).with("food", 10)`
    pub fn with(mut self, kind: &str, amount: u64) -> Self {
        self.add(ResourceKind::from(kind), amount);
        self
    }

    pub fn add(&mut self, kind: ResourceKind, amount: u64) {
        if amount == 0 {
            return;
        }
        *self.0.entry(kind).or_insert(0) += amount;
    }

    /// Merge another bundle into this one
    pub fn merge(&mut self, other: &Cost) {
        for (kind, amount) in other.iter() {
            self.add(kind.clone(), amount);
        }
    }

    pub fn get(&self, kind: &str) -> u64 {
        self.0
            .iter()
            .find(|(k, _)| k.as_str() == kind)
            .map(|(_, amount)| *amount)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKind, u64)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    /// True when every amount is zero (or there are none)
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }
}

impl FromIterator<(ResourceKind, u64)> for Cost {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, u64)>>(iter: I) -> Self {
        let mut cost = Cost::new();
        for (kind, amount) in iter {
            cost.add(kind, amount);
        }
        cost
    }
}

/// Mapping of resource kind to quantity, optionally capped per resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLedger {
    balances: BTreeMap<ResourceKind, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cap: Option<u64>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded with starting balances
    pub fn with_balances(start: &Cost) -> Self {
        let mut ledger = Self::new();
        ledger.credit_all(start);
        ledger
    }

    pub fn set_cap(&mut self, cap: Option<u64>) {
        self.cap = cap;
    }

    pub fn cap(&self) -> Option<u64> {
        self.cap
    }

    /// Get current amount of a resource
    pub fn get(&self, kind: &ResourceKind) -> u64 {
        self.balances.get(kind).copied().unwrap_or(0)
    }

    /// Convenience lookup by name
    pub fn balance(&self, kind: &str) -> u64 {
        self.get(&ResourceKind::from(kind))
    }

    /// Add up to the cap. Returns the amount actually stored.
    pub fn credit(&mut self, kind: ResourceKind, amount: u64) -> u64 {
        let limit = self.cap.unwrap_or(u64::MAX);
        let entry = self.balances.entry(kind).or_insert(0);
        let stored = amount.min(limit.saturating_sub(*entry));
        *entry += stored;
        stored
    }

    pub fn credit_all(&mut self, bundle: &Cost) {
        for (kind, amount) in bundle.iter() {
            self.credit(kind.clone(), amount);
        }
    }

    /// Remove an amount, rejecting without change if the balance is short
    pub fn debit(&mut self, kind: &ResourceKind, amount: u64) -> Result<()> {
        let available = self.get(kind);
        if available < amount {
            return Err(EngineError::InsufficientResources {
                kind: kind.clone(),
                required: amount,
                available,
            });
        }
        if amount > 0 {
            self.balances.insert(kind.clone(), available - amount);
        }
        Ok(())
    }

    /// Passive consumption: removes up to `amount`, returns what was removed
    pub fn drain(&mut self, kind: &ResourceKind, amount: u64) -> u64 {
        match self.balances.get_mut(kind) {
            Some(balance) => {
                let removed = amount.min(*balance);
                *balance -= removed;
                removed
            }
            None => 0,
        }
    }

    /// Check if every kind in the cost has a sufficient balance
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.shortfall(cost).is_none()
    }

    /// First resource the ledger cannot cover, as the error a debit would raise
    pub fn shortfall(&self, cost: &Cost) -> Option<EngineError> {
        cost.iter().find_map(|(kind, required)| {
            let available = self.get(kind);
            (available < required).then(|| EngineError::InsufficientResources {
                kind: kind.clone(),
                required,
                available,
            })
        })
    }

    /// Pay a multi-resource cost. All-or-nothing.
    pub fn pay(&mut self, cost: &Cost) -> Result<()> {
        if let Some(err) = self.shortfall(cost) {
            return Err(err);
        }
        for (kind, amount) in cost.iter() {
            self.debit(kind, amount)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKind, u64)> {
        self.balances.iter().map(|(k, v)| (k, *v))
    }

    /// Copy of all balances, for snapshots
    pub fn balances(&self) -> BTreeMap<ResourceKind, u64> {
        self.balances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gold() -> ResourceKind {
        ResourceKind::from("gold")
    }

    #[test]
    fn test_credit_debit() {
        let mut ledger = ResourceLedger::new();
        ledger.credit(gold(), 30);
        assert_eq!(ledger.get(&gold()), 30);

        assert!(ledger.debit(&gold(), 20).is_ok());
        assert_eq!(ledger.get(&gold()), 10);
    }

    #[test]
    fn test_debit_rejects_without_mutation() {
        let mut ledger = ResourceLedger::with_balances(&Cost::new().with("gold", 500));

        let err = ledger.debit(&gold(), 600).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientResources { required: 600, available: 500, .. }
        ));
        assert_eq!(ledger.balance("gold"), 500);
    }

    #[test]
    fn test_pay_is_all_or_nothing() {
        let mut ledger = ResourceLedger::with_balances(&Cost::new().with("gold", 50).with("food", 5));

        // Gold suffices, food does not: nothing may be taken
        let cost = Cost::new().with("gold", 20).with("food", 10);
        assert!(!ledger.can_afford(&cost));
        assert!(ledger.pay(&cost).is_err());
        assert_eq!(ledger.balance("gold"), 50);
        assert_eq!(ledger.balance("food"), 5);

        let cost = Cost::new().with("gold", 20).with("food", 5);
        assert!(ledger.pay(&cost).is_ok());
        assert_eq!(ledger.balance("gold"), 30);
        assert_eq!(ledger.balance("food"), 0);
    }

    #[test]
    fn test_unknown_resource_is_zero() {
        let ledger = ResourceLedger::new();
        assert_eq!(ledger.balance("mythril"), 0);
        assert!(ledger.can_afford(&Cost::new()));
        assert!(!ledger.can_afford(&Cost::new().with("mythril", 1)));
    }

    #[test]
    fn test_drain_saturates() {
        let mut ledger = ResourceLedger::with_balances(&Cost::new().with("power", 3));
        assert_eq!(ledger.drain(&ResourceKind::from("power"), 5), 3);
        assert_eq!(ledger.balance("power"), 0);
        assert_eq!(ledger.drain(&ResourceKind::from("oxygen"), 5), 0);
    }

    #[test]
    fn test_cap_limits_credit() {
        let mut ledger = ResourceLedger::with_balances(&Cost::new().with("gold", 9_990));
        ledger.set_cap(Some(10_000));

        assert_eq!(ledger.credit(gold(), 25), 10);
        assert_eq!(ledger.balance("gold"), 10_000);
        assert_eq!(ledger.credit(gold(), 5), 0);

        // Spending frees room again
        ledger.debit(&gold(), 100).unwrap();
        ledger.credit_all(&Cost::new().with("gold", 500).with("food", 20));
        assert_eq!(ledger.balance("gold"), 10_000);
        assert_eq!(ledger.balance("food"), 20);
    }

    #[test]
    fn test_cost_merge() {
        let mut loot = Cost::new().with("gold", 10);
        loot.merge(&Cost::new().with("gold", 5).with("wood", 2));
        assert_eq!(loot.get("gold"), 15);
        assert_eq!(loot.get("wood"), 2);
        assert!(!loot.is_empty());
        assert!(Cost::new().with("gold", 0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_debit_never_negative(start in 0u64..1_000, ops in proptest::collection::vec((any::<bool>(), 0u64..500), 0..50)) {
            let mut ledger = ResourceLedger::with_balances(&Cost::new().with("gold", start));
            let mut expected = start;
            for (is_credit, amount) in ops {
                if is_credit {
                    ledger.credit(gold(), amount);
                    expected += amount;
                } else if ledger.debit(&gold(), amount).is_ok() {
                    prop_assert!(amount <= expected);
                    expected -= amount;
                }
                prop_assert_eq!(ledger.get(&gold()), expected);
            }
        }
    }
}
