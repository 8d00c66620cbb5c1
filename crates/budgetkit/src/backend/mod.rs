//! Backend trait and implementations for the API-key endpoints.
//!
//! [`KeyApi`] is the seam between the reconciler and the network. The primary
//! implementation is [`http::HttpBackend`].
//!
//! # Testing
//!
//! Use [`MockBackend`] to exercise reconciliation without network access:
//!
//! ```
//! use budgetkit::backend::{KeyApi, MockBackend};
//! use declarative::CancelToken;
//!
//! let mock = MockBackend::new();
//! let cancel = CancelToken::new();
//! let created = mock.create_key(&cancel, "svc-a", 1000).unwrap();
//!
//! let keys = mock.list_key_summaries(&cancel).unwrap();
//! assert_eq!(keys.len(), 1);
//! assert_eq!(keys[0].id, created.id);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{CreatedKey, KeyPatch, KeyRecord, Operation};
use declarative::CancelToken;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Operations on the API-key collection.
///
/// Every call takes the caller's [`CancelToken`] and returns
/// `Error::Cancelled` instead of a result once it fires.
pub trait KeyApi: Send + Sync {
    /// List keys without secret material.
    fn list_key_summaries(&self, cancel: &CancelToken) -> Result<Vec<KeyRecord>>;

    /// List keys including secret material.
    fn list_full_keys(&self, cancel: &CancelToken) -> Result<Vec<KeyRecord>>;

    /// Create a key.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteRejected` unless the service answers 201.
    fn create_key(&self, cancel: &CancelToken, name: &str, budget: i64) -> Result<CreatedKey>;

    /// Change the fields present in `patch` on key `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteRejected` unless the service answers 200.
    fn update_key(&self, cancel: &CancelToken, id: i64, patch: &KeyPatch) -> Result<()>;

    /// Delete key `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteRejected` unless the service answers 200.
    fn delete_key(&self, cancel: &CancelToken, id: i64) -> Result<()>;

    /// Change only the budget of key `id`.
    fn update_key_budget(&self, cancel: &CancelToken, id: i64, budget: i64) -> Result<()> {
        self.update_key(cancel, id, &KeyPatch::budget(budget))
    }
}

/// A call recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Call {
    ListSummaries,
    ListFull,
    Create { name: String, budget: i64 },
    Update { id: i64, patch: KeyPatch },
    Delete { id: i64 },
}

impl Call {
    fn operation(&self) -> Operation {
        match self {
            Self::ListSummaries => Operation::ListSummaries,
            Self::ListFull => Operation::ListFull,
            Self::Create { .. } => Operation::Create,
            Self::Update { .. } => Operation::Update,
            Self::Delete { .. } => Operation::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    records: BTreeMap<i64, KeyRecord>,
    last_id: i64,
    hidden_from_full: BTreeSet<i64>,
    rejections: HashMap<Operation, u16>,
    calls: Vec<Call>,
}

/// In-memory budget service for tests and offline runs.
///
/// Clones share the same store. Update and delete of an unknown id are
/// rejected with 404, like the real service.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed a record that already exists remotely; returns its id.
    pub fn seed(&self, name: &str, budget: i64) -> i64 {
        let mut state = self.lock();
        insert_record(&mut state, name, budget).id
    }

    /// Current record for `id`, secret included.
    #[must_use]
    pub fn record(&self, id: i64) -> Option<KeyRecord> {
        self.lock().records.get(&id).cloned()
    }

    /// Every stored record, ordered by id.
    #[must_use]
    pub fn records(&self) -> Vec<KeyRecord> {
        self.lock().records.values().cloned().collect()
    }

    /// Simulate spend on a key.
    pub fn set_costs(&self, id: i64, costs: f64) {
        if let Some(record) = self.lock().records.get_mut(&id) {
            record.costs = costs;
        }
    }

    /// Simulate use of a key.
    pub fn set_last_used_at(&self, id: i64, at: &str) {
        if let Some(record) = self.lock().records.get_mut(&id) {
            record.last_used_at = Some(at.to_string());
        }
    }

    /// Delete a record behind the reconciler's back.
    pub fn remove(&self, id: i64) -> Option<KeyRecord> {
        self.lock().records.remove(&id)
    }

    /// Leave `id` out of the full listing (partial outage).
    pub fn hide_from_full_listing(&self, id: i64) {
        self.lock().hidden_from_full.insert(id);
    }

    /// Keep `id` in the full listing but without its secret.
    pub fn strip_secret(&self, id: i64) {
        if let Some(record) = self.lock().records.get_mut(&id) {
            record.key = None;
        }
    }

    /// Reject the next call of `operation` with `status`.
    pub fn reject_next(&self, operation: Operation, status: u16) {
        self.lock().rejections.insert(operation, status);
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls made for `operation`.
    #[must_use]
    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Record the call, then apply cancellation and injected rejections.
    fn begin(&self, cancel: &CancelToken, call: Call) -> Result<MutexGuard<'_, MockState>> {
        let operation = call.operation();
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }

        let mut state = self.lock();
        state.calls.push(call);
        if let Some(status) = state.rejections.remove(&operation) {
            return Err(Error::rejected(operation, status, "injected failure"));
        }
        Ok(state)
    }
}

fn insert_record<'a>(state: &'a mut MockState, name: &str, budget: i64) -> &'a KeyRecord {
    state.last_id += 1;
    let id = state.last_id;
    let record = KeyRecord {
        id,
        name: name.to_string(),
        budget,
        costs: 0.0,
        created_at: Some(chrono::Utc::now().to_rfc3339()),
        last_used_at: None,
        key: Some(format!("bk-{:04}-{}", id, name)),
    };
    state.records.entry(id).or_insert(record)
}

impl KeyApi for MockBackend {
    fn list_key_summaries(&self, cancel: &CancelToken) -> Result<Vec<KeyRecord>> {
        let state = self.begin(cancel, Call::ListSummaries)?;
        Ok(state
            .records
            .values()
            .map(|record| KeyRecord {
                key: None,
                ..record.clone()
            })
            .collect())
    }

    fn list_full_keys(&self, cancel: &CancelToken) -> Result<Vec<KeyRecord>> {
        let state = self.begin(cancel, Call::ListFull)?;
        Ok(state
            .records
            .values()
            .filter(|record| !state.hidden_from_full.contains(&record.id))
            .cloned()
            .collect())
    }

    fn create_key(&self, cancel: &CancelToken, name: &str, budget: i64) -> Result<CreatedKey> {
        let call = Call::Create {
            name: name.to_string(),
            budget,
        };
        let mut state = self.begin(cancel, call)?;
        let record = insert_record(&mut state, name, budget);
        Ok(CreatedKey {
            id: record.id,
            key: record.key.clone(),
        })
    }

    fn update_key(&self, cancel: &CancelToken, id: i64, patch: &KeyPatch) -> Result<()> {
        let call = Call::Update {
            id,
            patch: patch.clone(),
        };
        let mut state = self.begin(cancel, call)?;
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| Error::rejected(Operation::Update, 404, "key not found"))?;
        if let Some(name) = &patch.name {
            record.name.clone_from(name);
        }
        if let Some(budget) = patch.budget {
            record.budget = budget;
        }
        Ok(())
    }

    fn delete_key(&self, cancel: &CancelToken, id: i64) -> Result<()> {
        let mut state = self.begin(cancel, Call::Delete { id })?;
        state
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::rejected(Operation::Delete, 404, "key not found"))
    }
}
