//! In-memory opportunity registry with signature dedup and expiry.
//!
//! The signature index is the authoritative form of the "at most one active
//! opportunity per market pair and `(kind, venue, side)`" invariant: upserts
//! and sweeps keep the primary map and the index in lockstep, and dedup
//! stays O(1).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::opportunity::{ArbitrageOpportunity, Signature};

/// Whether an upsert created a new entry or refreshed a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting of this signature: the caller should emit
    /// `opportunity_detected`.
    Inserted,
    /// A live entry was overwritten in place, keeping its id. No event.
    Refreshed,
}

/// Registry of active opportunities.
#[derive(Debug, Default)]
pub struct OpportunityRegistry {
    entries: HashMap<String, ArbitrageOpportunity>,
    by_signature: HashMap<Signature, String>,
}

impl OpportunityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh candidate or refreshes the live entry sharing its
    /// signature.
    ///
    /// On refresh every field except the id is overwritten: prices,
    /// quantities, risk, and the detection/expiry timestamps all move to the
    /// new pass's values. `next_id` is only invoked when a new entry is
    /// actually created.
    pub fn upsert(
        &mut self,
        mut candidate: ArbitrageOpportunity,
        next_id: impl FnOnce() -> String,
    ) -> UpsertOutcome {
        let signature = candidate.signature();
        if let Some(existing_id) = self.by_signature.get(&signature) {
            if let Some(entry) = self.entries.get_mut(existing_id) {
                candidate.id = entry.id.clone();
                *entry = candidate;
                return UpsertOutcome::Refreshed;
            }
        }

        candidate.id = next_id();
        self.by_signature.insert(signature, candidate.id.clone());
        self.entries.insert(candidate.id.clone(), candidate);
        UpsertOutcome::Inserted
    }

    /// Removes and returns every entry whose validity window has elapsed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<ArbitrageOpportunity> {
        let expired_ids: Vec<String> = self
            .entries
            .values()
            .filter(|opp| opp.is_expired(now))
            .map(|opp| opp.id.clone())
            .collect();

        expired_ids
            .into_iter()
            .filter_map(|id| self.remove(&id))
            .collect()
    }

    /// Removes one entry by id, keeping the signature index consistent.
    pub fn remove(&mut self, id: &str) -> Option<ArbitrageOpportunity> {
        let removed = self.entries.remove(id)?;
        self.by_signature.remove(&removed.signature());
        Some(removed)
    }

    /// Returns the live entry with this signature, if any.
    #[must_use]
    pub fn get_by_signature(&self, signature: &Signature) -> Option<&ArbitrageOpportunity> {
        self.by_signature
            .get(signature)
            .and_then(|id| self.entries.get(id))
    }

    /// Snapshot of all active entries.
    #[must_use]
    pub fn active(&self) -> Vec<ArbitrageOpportunity> {
        self.entries.values().cloned().collect()
    }

    /// The executable entry with the highest net profit, if any.
    #[must_use]
    pub fn best_executable(&self) -> Option<&ArbitrageOpportunity> {
        self.entries
            .values()
            .filter(|opp| opp.is_executable)
            .max_by_key(|opp| opp.net_profit)
    }

    /// Number of executable entries.
    #[must_use]
    pub fn executable_count(&self) -> usize {
        self.entries.values().filter(|o| o.is_executable).count()
    }

    /// Highest net profit across all entries.
    #[must_use]
    pub fn best_net_profit(&self) -> Option<Decimal> {
        self.entries.values().map(|o| o.net_profit).max()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
