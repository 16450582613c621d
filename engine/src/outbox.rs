//! Durable queue of remote writes.
//!
//! Every optimistic mutation that must reach the remote store becomes an
//! [`OutboxEntry`]. Writes are set-state (`Add`, `Remove`, `Clear`), never
//! flips, so replaying an entry is harmless.
//!
//! Ordering rules:
//! - Enqueuing supersedes any *pending* entry for the same identity,
//!   category and entity. A `Clear` supersedes every pending entry of its
//!   identity and category. In-flight entries are never superseded.
//! - An entry is ready only when no earlier entry conflicts with it, so at
//!   most one write per key is outstanding and the remote store ends in the
//!   state of the last local intent.

use crate::{Category, EntityId, FavoriteKey, IdentityKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Desired remote state for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    /// The entity must be a favorite
    Add,
    /// The entity must not be a favorite
    Remove,
    /// No entity of the category may be a favorite
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryStatus {
    Pending,
    InFlight,
}

/// A remote write waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    /// Idempotency key sent with the write
    pub id: String,
    /// Enqueue order
    pub seq: u64,
    pub identity: IdentityKey,
    pub category: Category,
    /// Target entity; `None` for a bulk clear
    pub entity_id: Option<EntityId>,
    pub action: WriteAction,
    pub status: EntryStatus,
    /// Failed deliveries so far
    pub attempts: u32,
    pub enqueued_at: Timestamp,
    pub next_attempt_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl OutboxEntry {
    fn conflicts_with(&self, other: &OutboxEntry) -> bool {
        self.identity == other.identity
            && self.category == other.category
            && (self.entity_id.is_none()
                || other.entity_id.is_none()
                || self.entity_id == other.entity_id)
    }

    fn is_superseded_by(&self, newer: &OutboxEntry) -> bool {
        if self.status != EntryStatus::Pending || !self.conflicts_with(newer) {
            return false;
        }
        match newer.action {
            WriteAction::Clear => true,
            // A pending clear still has to run before the newer per-entity write.
            _ => self.action != WriteAction::Clear,
        }
    }

    pub fn key(&self) -> Option<FavoriteKey> {
        self.entity_id
            .as_ref()
            .map(|id| FavoriteKey::new(id.clone(), self.category))
    }
}

/// Exponential backoff for failed deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
    /// Retries after the first failure; `None` retries forever
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            factor: 2.0,
            max_retries: Some(5),
        }
    }
}

impl RetryPolicy {
    /// Give up after the first failure.
    pub fn none() -> Self {
        Self {
            max_retries: Some(0),
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let delay = self.initial_delay_ms as f64 * self.factor.max(1.0).powi(exponent);
        if delay.is_finite() {
            (delay as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        }
    }

    /// Whether an entry that has failed `attempts` times may be retried.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_retries.map_or(true, |max| attempts <= max)
    }
}

/// What enqueuing did to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub seq: u64,
    /// Pending entries dropped in favor of the new one
    pub superseded: usize,
}

/// What happened to a failed entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FailOutcome {
    /// Scheduled again at the given time
    Retry { attempts: u32, at: Timestamp },
    /// Removed from the queue
    Abandoned(OutboxEntry),
}

/// Ordered queue of pending remote writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbox {
    entries: Vec<OutboxEntry>,
    next_seq: u64,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[OutboxEntry] {
        &self.entries
    }

    pub fn get(&self, seq: u64) -> Option<&OutboxEntry> {
        self.entries.iter().find(|e| e.seq == seq)
    }

    /// Queue a write that becomes ready at `ready_at`.
    #[allow(clippy::too_many_arguments)]
    pub fn enqueue(
        &mut self,
        id: impl Into<String>,
        identity: impl Into<IdentityKey>,
        category: Category,
        entity_id: Option<EntityId>,
        action: WriteAction,
        now: Timestamp,
        ready_at: Timestamp,
    ) -> Enqueued {
        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = OutboxEntry {
            id: id.into(),
            seq,
            identity: identity.into(),
            category,
            entity_id,
            action,
            status: EntryStatus::Pending,
            attempts: 0,
            enqueued_at: now,
            next_attempt_at: ready_at,
            last_error: None,
        };

        let before = self.entries.len();
        self.entries.retain(|existing| !existing.is_superseded_by(&entry));
        let superseded = before - self.entries.len();

        self.entries.push(entry);
        Enqueued { seq, superseded }
    }

    /// First entry that may be delivered at `now`.
    pub fn next_ready(&self, now: Timestamp) -> Option<&OutboxEntry> {
        self.entries.iter().enumerate().find_map(|(index, entry)| {
            let blocked = self.entries[..index]
                .iter()
                .any(|earlier| earlier.conflicts_with(entry));
            let ready = entry.status == EntryStatus::Pending && entry.next_attempt_at <= now;
            (ready && !blocked).then_some(entry)
        })
    }

    /// Earliest time an unblocked pending entry becomes due, if any.
    ///
    /// Entries waiting behind an earlier conflicting entry are ignored; they
    /// cannot run before their blocker does.
    pub fn next_wakeup(&self) -> Option<Timestamp> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(index, entry)| {
                entry.status == EntryStatus::Pending
                    && !self.entries[..*index]
                        .iter()
                        .any(|earlier| earlier.conflicts_with(entry))
            })
            .map(|(_, entry)| entry.next_attempt_at)
            .min()
    }

    /// Mark an entry in flight and return a copy for delivery.
    pub fn begin(&mut self, seq: u64) -> Option<OutboxEntry> {
        let entry = self.entries.iter_mut().find(|e| e.seq == seq)?;
        entry.status = EntryStatus::InFlight;
        Some(entry.clone())
    }

    /// Remove a delivered entry.
    pub fn complete(&mut self, seq: u64) -> Option<OutboxEntry> {
        let index = self.entries.iter().position(|e| e.seq == seq)?;
        Some(self.entries.remove(index))
    }

    /// Record a failed delivery and either reschedule or drop the entry.
    pub fn fail(
        &mut self,
        seq: u64,
        error: impl Into<String>,
        now: Timestamp,
        policy: &RetryPolicy,
    ) -> Option<FailOutcome> {
        let index = self.entries.iter().position(|e| e.seq == seq)?;
        let entry = &mut self.entries[index];
        entry.attempts += 1;
        entry.last_error = Some(error.into());

        if policy.allows_retry(entry.attempts) {
            entry.status = EntryStatus::Pending;
            entry.next_attempt_at = now.saturating_add(policy.delay_for(entry.attempts));
            Some(FailOutcome::Retry {
                attempts: entry.attempts,
                at: entry.next_attempt_at,
            })
        } else {
            Some(FailOutcome::Abandoned(self.entries.remove(index)))
        }
    }

    /// Return in-flight entries to pending after a restart.
    ///
    /// Returns how many entries were recovered.
    pub fn recover(&mut self) -> usize {
        let mut recovered = 0;
        for entry in &mut self.entries {
            if entry.status == EntryStatus::InFlight {
                entry.status = EntryStatus::Pending;
                recovered += 1;
            }
        }
        recovered
    }

    /// Keys and categories whose latest queued intent for `identity` is a removal.
    pub fn pending_removals(&self, identity: &str) -> (HashSet<FavoriteKey>, HashSet<Category>) {
        let mut keys = HashSet::new();
        let mut cleared = HashSet::new();

        for entry in self.entries.iter().filter(|e| e.identity == identity) {
            match (entry.action, entry.key()) {
                (WriteAction::Remove, Some(key)) => {
                    keys.insert(key);
                }
                (WriteAction::Add, Some(key)) => {
                    keys.remove(&key);
                }
                (WriteAction::Clear, _) => {
                    cleared.insert(entry.category);
                }
                _ => {}
            }
        }

        (keys, cleared)
    }

    pub fn pending_for(&self, identity: &str) -> impl Iterator<Item = &OutboxEntry> + '_ {
        let identity = identity.to_owned();
        self.entries.iter().filter(move |e| e.identity == identity)
    }
}
