//! Remote store abstraction.
//!
//! The sync engine only talks to the remote triple-store through
//! [`RemoteStore`], so any backend (HTTP, in-memory) can be plugged in.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One record persisted by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Entity identifier the record was created from.
    #[serde(rename = "_ori")]
    pub identifier: String,
    /// The store's own key for the record.
    #[serde(rename = "_uuid")]
    pub storage_key: String,
}

/// One page of a find request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindResult {
    #[serde(rename = "total_items", default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<RemoteRecord>,
}

/// Status reported by a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreStatus(pub u16);

impl StoreStatus {
    pub const OK: Self = Self(200);
    pub const GATEWAY_TIMEOUT: Self = Self(504);

    pub fn code(self) -> u16 {
        self.0
    }

    /// Statuses below 400 are successes.
    pub fn is_success(self) -> bool {
        self.0 < 400
    }

    /// The transient timeout status eligible for backoff.
    pub fn is_gateway_timeout(self) -> bool {
        self == Self::GATEWAY_TIMEOUT
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A remote triple-store holding one record per entity.
///
/// Request-level failures are errors; write outcomes are reported as a
/// [`StoreStatus`] so the caller decides what a failure status means.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Finds the record created from `identifier`, if any.
    async fn find_by_identifier(&self, identifier: &str) -> SyncResult<FindResult>;

    /// Finds the records created from any of `identifiers`, one page of at
    /// most `page_size` items.
    async fn find_by_identifiers(&self, identifiers: &[String], page_size: usize) -> SyncResult<FindResult>;

    /// Creates one record per entity in `statements`.
    async fn create_batch(&self, statements: &str) -> SyncResult<StoreStatus>;

    /// Replaces the records owned by the entities in `statements`.
    async fn update_replace_batch(&self, statements: &str) -> SyncResult<StoreStatus>;

    /// Deletes records by storage key.
    async fn delete_batch(&self, storage_keys: &[String]) -> SyncResult<StoreStatus>;

    /// Lists one page of every record in the namespace.
    async fn find_in_namespace(&self, page_size: usize, page_index: usize) -> SyncResult<FindResult>;
}

/// An in-memory store for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use indexmap::IndexMap;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    /// One request received by a [`MockStore`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StoreCall {
        FindOne(String),
        FindMany { identifiers: Vec<String>, page_size: usize },
        Create(String),
        UpdateReplace(String),
        Delete(Vec<String>),
        FindInNamespace { page_size: usize, page_index: usize },
    }

    #[derive(Debug, Default)]
    struct MockState {
        /// identifier → storage key
        records: IndexMap<String, String>,
        calls: Vec<StoreCall>,
        write_statuses: VecDeque<StoreStatus>,
        fail_on_call: Option<usize>,
    }

    /// A store whose records are set up by the test. Writes are recorded,
    /// not applied; deletes do remove records.
    ///
    /// Clones share state, so a test can keep a handle after moving one into
    /// the engine.
    #[derive(Debug, Clone, Default)]
    pub struct MockStore {
        state: Arc<Mutex<MockState>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds a record already persisted remotely.
        pub fn with_record(self, identifier: impl Into<String>, storage_key: impl Into<String>) -> Self {
            self.lock().records.insert(identifier.into(), storage_key.into());
            self
        }

        /// Queues the status returned by the next create or update request.
        /// Requests beyond the queue succeed.
        pub fn push_write_status(&self, status: StoreStatus) {
            self.lock().write_statuses.push_back(status);
        }

        /// Makes the request with this zero-based index fail with a network error.
        pub fn fail_on_call(&self, index: usize) {
            self.lock().fail_on_call = Some(index);
        }

        pub fn calls(&self) -> Vec<StoreCall> {
            self.lock().calls.clone()
        }

        pub fn record_count(&self) -> usize {
            self.lock().records.len()
        }

        /// Number of single and multi identifier find requests.
        pub fn find_calls(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, StoreCall::FindOne(_) | StoreCall::FindMany { .. }))
                .count()
        }

        /// Bodies of every create request, in order.
        pub fn created(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    StoreCall::Create(body) => Some(body),
                    _ => None,
                })
                .collect()
        }

        /// Bodies of every update request, in order.
        pub fn updated(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    StoreCall::UpdateReplace(body) => Some(body),
                    _ => None,
                })
                .collect()
        }

        fn lock(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn record(&self, call: StoreCall) -> SyncResult<MutexGuard<'_, MockState>> {
            let mut state = self.lock();
            let index = state.calls.len();
            state.calls.push(call);
            if state.fail_on_call == Some(index) {
                return Err(SyncError::Network(format!("mock failure on call {index}")));
            }
            Ok(state)
        }

        fn find(state: &MockState, identifiers: &[String], page_size: usize) -> FindResult {
            let items: Vec<RemoteRecord> = identifiers
                .iter()
                .filter_map(|id| {
                    state.records.get(id).map(|key| RemoteRecord {
                        identifier: id.clone(),
                        storage_key: key.clone(),
                    })
                })
                .collect();
            FindResult {
                total_count: items.len() as u64,
                items: items.into_iter().take(page_size).collect(),
            }
        }
    }

    #[async_trait]
    impl RemoteStore for MockStore {
        async fn find_by_identifier(&self, identifier: &str) -> SyncResult<FindResult> {
            let state = self.record(StoreCall::FindOne(identifier.to_string()))?;
            Ok(Self::find(&state, &[identifier.to_string()], 1))
        }

        async fn find_by_identifiers(&self, identifiers: &[String], page_size: usize) -> SyncResult<FindResult> {
            let state = self.record(StoreCall::FindMany {
                identifiers: identifiers.to_vec(),
                page_size,
            })?;
            Ok(Self::find(&state, identifiers, page_size))
        }

        async fn create_batch(&self, statements: &str) -> SyncResult<StoreStatus> {
            let mut state = self.record(StoreCall::Create(statements.to_string()))?;
            Ok(state.write_statuses.pop_front().unwrap_or(StoreStatus::OK))
        }

        async fn update_replace_batch(&self, statements: &str) -> SyncResult<StoreStatus> {
            let mut state = self.record(StoreCall::UpdateReplace(statements.to_string()))?;
            Ok(state.write_statuses.pop_front().unwrap_or(StoreStatus::OK))
        }

        async fn delete_batch(&self, storage_keys: &[String]) -> SyncResult<StoreStatus> {
            let mut state = self.record(StoreCall::Delete(storage_keys.to_vec()))?;
            state.records.retain(|_, key| !storage_keys.contains(key));
            Ok(StoreStatus::OK)
        }

        async fn find_in_namespace(&self, page_size: usize, page_index: usize) -> SyncResult<FindResult> {
            let state = self.record(StoreCall::FindInNamespace { page_size, page_index })?;
            let items = state
                .records
                .iter()
                .skip(page_size * page_index)
                .take(page_size)
                .map(|(id, key)| RemoteRecord {
                    identifier: id.clone(),
                    storage_key: key.clone(),
                })
                .collect();
            Ok(FindResult {
                total_count: state.records.len() as u64,
                items,
            })
        }
    }
}
