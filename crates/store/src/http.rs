use opmatch_core::{Bill, Operation, BILLS_DOCTYPE, OPERATIONS_DOCTYPE};
use serde::Deserialize;

use crate::client::{OperationStore, StoreError};
use crate::query::OperationQuery;

/// Document store reached over HTTP with bearer-token auth.
///
/// Endpoint layout follows the stack's data API: `_find` for selector
/// queries, `PUT data/<doctype>/<id>` for single updates, `_bulk_docs`
/// for batch writes and `_all_docs` for collection listing.
pub struct HttpStore {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct FindResponse {
    docs: Vec<Operation>,
}

#[derive(Deserialize)]
struct AllDocsRow {
    doc: Bill,
}

#[derive(Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        HttpStore {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/data/{}", self.base_url, path)
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(StoreError::Status {
                code: status.as_u16(),
            })
        }
    }
}

impl OperationStore for HttpStore {
    async fn query_operations(
        &self,
        query: OperationQuery,
    ) -> Result<Vec<Operation>, StoreError> {
        let response = self
            .client
            .post(self.url(&format!("{OPERATIONS_DOCTYPE}/_find")))
            .bearer_auth(&self.token)
            .json(&query.to_mango())
            .send()
            .await?;
        let found: FindResponse = Self::check(response)?.json().await?;
        Ok(found.docs)
    }

    async fn update_operation(&self, operation: Operation) -> Result<Operation, StoreError> {
        let response = self
            .client
            .put(self.url(&format!("{OPERATIONS_DOCTYPE}/{}", operation.id)))
            .bearer_auth(&self.token)
            .json(&operation)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(operation.id));
        }
        Ok(Self::check(response)?.json().await?)
    }

    async fn batch_update(&self, operations: Vec<Operation>) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url(&format!("{OPERATIONS_DOCTYPE}/_bulk_docs")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "docs": operations }))
            .send()
            .await?;
        Self::check(response)?;
        Ok(())
    }

    async fn fetch_all_bills(&self) -> Result<Vec<Bill>, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("{BILLS_DOCTYPE}/_all_docs")))
            .bearer_auth(&self.token)
            .query(&[("include_docs", "true")])
            .send()
            .await?;
        let listed: AllDocsResponse = Self::check(response)?.json().await?;
        Ok(listed.rows.into_iter().map(|row| row.doc).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_doctype_scoped() {
        let store = HttpStore::new("https://user.example.net/", "tok");
        assert_eq!(
            store.url(&format!("{OPERATIONS_DOCTYPE}/_find")),
            "https://user.example.net/data/io.cozy.bank.operations/_find"
        );
        assert_eq!(
            store.url(&format!("{BILLS_DOCTYPE}/_all_docs")),
            "https://user.example.net/data/io.cozy.bills/_all_docs"
        );
    }
}
