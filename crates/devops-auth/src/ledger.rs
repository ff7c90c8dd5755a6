use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TokenError;

/// One issued token and its usage state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub jti: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Claims as supplied by the caller, before `jti`/`iat`/`exp` were added.
    pub payload: Map<String, Value>,
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

/// Counts over the ledger, as reported by `/health`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    pub total_transactions: usize,
    pub active_tokens: usize,
    pub used_tokens: usize,
}

/// Storage for issued tokens.
///
/// Implementations must be thread-safe (`Send + Sync`) and must make
/// [`consume`](TransactionLedger::consume) atomic per identifier: two
/// concurrent calls for the same token can never both succeed.
pub trait TransactionLedger: Send + Sync {
    /// Record a freshly issued token. Returns `false` without touching the
    /// existing entry if the identifier is already registered.
    fn register(&self, record: TransactionRecord) -> bool;

    /// Check that `token` has not been consumed and that `jti` is known and
    /// unused, then mark both as used at `at`.
    fn consume(&self, jti: &str, token: &str, at: DateTime<Utc>) -> Result<(), TokenError>;

    /// Snapshot of a single record.
    fn get(&self, jti: &str) -> Option<TransactionRecord>;

    fn stats(&self) -> TransactionStats;
}

/// In-memory ledger backed by DashMap. Lives for the process lifetime only.
pub struct InMemoryLedger {
    transactions: DashMap<String, TransactionRecord>,
    used_tokens: DashSet<String>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            used_tokens: DashSet::new(),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLedger for InMemoryLedger {
    fn register(&self, record: TransactionRecord) -> bool {
        match self.transactions.entry(record.jti.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(record);
                true
            }
        }
    }

    fn consume(&self, jti: &str, token: &str, at: DateTime<Utc>) -> Result<(), TokenError> {
        if self.used_tokens.contains(token) {
            return Err(TokenError::AlreadyUsed);
        }

        // The shard write lock is held until `record` drops, which serializes
        // concurrent consumers of the same identifier.
        let mut record = self
            .transactions
            .get_mut(jti)
            .ok_or(TokenError::UnknownTransaction)?;

        if record.used {
            return Err(TokenError::AlreadyUsed);
        }

        self.used_tokens.insert(token.to_string());
        record.used = true;
        record.used_at = Some(at);
        Ok(())
    }

    fn get(&self, jti: &str) -> Option<TransactionRecord> {
        self.transactions.get(jti).map(|r| r.value().clone())
    }

    fn stats(&self) -> TransactionStats {
        let total = self.transactions.len();
        let used = self.transactions.iter().filter(|r| r.used).count();
        TransactionStats {
            total_transactions: total,
            active_tokens: total - used,
            used_tokens: used,
        }
    }
}
