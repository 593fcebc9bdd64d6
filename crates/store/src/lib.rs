pub mod client;
pub mod http;
pub mod memory;
pub mod query;

pub use client::{OperationStore, StoreError};
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use query::{OperationQuery, QUERY_PAGE_LIMIT};
