use chrono::NaiveDateTime;
use opmatch_core::{Money, Operation};
use serde_json::{json, Value};

/// Store-imposed hard cap on a single result page.
pub const QUERY_PAGE_LIMIT: usize = 100;

/// Range query over the operations collection. Selector bounds are
/// exclusive (`$gt`/`$lt`), the store's contract; callers wanting an
/// inclusive window widen the bounds and re-filter.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationQuery {
    pub date_gt: NaiveDateTime,
    pub date_lt: NaiveDateTime,
    pub amount_gt: Money,
    pub amount_lt: Money,
    pub limit: usize,
    pub skip: usize,
}

impl OperationQuery {
    /// Selector check, as the store's query planner would apply it.
    pub fn matches(&self, operation: &Operation) -> bool {
        operation.date > self.date_gt
            && operation.date < self.date_lt
            && operation.amount > self.amount_gt
            && operation.amount < self.amount_lt
    }

    /// Mango-style body for the store's `_find` endpoint. Results come
    /// back sorted by date then amount, both descending.
    pub fn to_mango(&self) -> Value {
        let mut body = json!({
            "selector": {
                "date": {
                    "$gt": format_store_date(self.date_gt),
                    "$lt": format_store_date(self.date_lt),
                },
                "amount": {
                    "$gt": self.amount_gt,
                    "$lt": self.amount_lt,
                },
            },
            "sort": [{"date": "desc"}, {"amount": "desc"}],
            "limit": self.limit,
        });
        if self.skip > 0 {
            body["skip"] = json!(self.skip);
        }
        body
    }
}

fn format_store_date(date: NaiveDateTime) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
