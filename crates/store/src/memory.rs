use std::sync::Mutex;

use opmatch_core::{Bill, Operation};

use crate::client::{OperationStore, StoreError};
use crate::query::OperationQuery;

/// In-memory document store honoring the same selector, sort and paging
/// contract as the real one. The standard test double; also what the
/// standalone connector runner uses when no store is reachable.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    operations: Vec<Operation>,
    bills: Vec<Bill>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operations(operations: Vec<Operation>) -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().operations = operations;
        store
    }

    pub fn seed_bills(&self, bills: Vec<Bill>) {
        self.inner.lock().unwrap().bills.extend(bills);
    }

    /// Snapshot of every stored operation.
    pub fn operations(&self) -> Vec<Operation> {
        self.inner.lock().unwrap().operations.clone()
    }

    pub fn operation(&self, id: &str) -> Option<Operation> {
        self.inner
            .lock()
            .unwrap()
            .operations
            .iter()
            .find(|op| op.id == id)
            .cloned()
    }
}

impl OperationStore for MemoryStore {
    async fn query_operations(
        &self,
        query: OperationQuery,
    ) -> Result<Vec<Operation>, StoreError> {
        let mut hits: Vec<Operation> = self
            .inner
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| query.matches(op))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.date.cmp(&a.date).then(b.amount.cmp(&a.amount)));
        Ok(hits
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .collect())
    }

    async fn update_operation(&self, operation: Operation) -> Result<Operation, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.operations.iter_mut().find(|op| op.id == operation.id) {
            Some(slot) => {
                *slot = operation.clone();
                Ok(operation)
            }
            None => Err(StoreError::NotFound(operation.id)),
        }
    }

    async fn batch_update(&self, operations: Vec<Operation>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for operation in operations {
            match inner.operations.iter_mut().find(|op| op.id == operation.id) {
                Some(slot) => *slot = operation,
                None => inner.operations.push(operation),
            }
        }
        Ok(())
    }

    async fn fetch_all_bills(&self) -> Result<Vec<Bill>, StoreError> {
        Ok(self.inner.lock().unwrap().bills.clone())
    }
}
