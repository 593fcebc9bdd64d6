use opmatch_core::{Bill, Operation};
use thiserror::Error;

use crate::query::OperationQuery;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store responded with status {code}")]
    Status { code: u16 },
    #[error("failed to decode store document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("document not found: {0}")]
    NotFound(String),
}

/// The document-store seam. The linker is generic over this trait so
/// tests inject [`crate::MemoryStore`] and production injects
/// [`crate::HttpStore`]; there is no ambient client.
#[allow(async_fn_in_trait)]
pub trait OperationStore {
    /// Range query over the operations collection. The store may cap a
    /// page at [`crate::query::QUERY_PAGE_LIMIT`] results.
    async fn query_operations(
        &self,
        query: OperationQuery,
    ) -> Result<Vec<Operation>, StoreError>;

    /// Partial update of a single operation, last-write-wins.
    async fn update_operation(&self, operation: Operation) -> Result<Operation, StoreError>;

    /// Bulk write of every given operation. All-or-nothing on the store
    /// side.
    async fn batch_update(&self, operations: Vec<Operation>) -> Result<(), StoreError>;

    /// Full read of the bill collection.
    async fn fetch_all_bills(&self) -> Result<Vec<Bill>, StoreError>;
}
