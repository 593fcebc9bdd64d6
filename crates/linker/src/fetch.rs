use std::time::Duration;

use chrono::{Days, NaiveTime};
use opmatch_core::{Bill, Money, Operation};
use opmatch_store::{OperationQuery, OperationStore, QUERY_PAGE_LIMIT};

use crate::linker::LinkError;
use crate::options::LinkOptions;
use crate::ranges::{amount_range, date_range, Side};
use crate::util::with_retries;

/// Pulls every operation in the bill's date/amount neighborhood,
/// page by page. The store's selector bounds are exclusive, so they are
/// widened one step past the inclusive windows; the filter pipeline
/// re-applies the exact check.
///
/// The page loop is capped: a store that keeps returning full pages
/// past `options.max_pages` is misbehaving and the fetch fails instead
/// of spinning.
pub(crate) async fn fetch_neighboring_operations<S: OperationStore>(
    store: &S,
    bill: &Bill,
    options: &LinkOptions,
    side: Side,
) -> Result<Vec<Operation>, LinkError> {
    let dates = date_range(bill, options, side);
    let amounts = amount_range(bill, options, side);
    let backoff = Duration::from_millis(options.retry_backoff_ms);

    let mut operations: Vec<Operation> = Vec::new();
    let mut pages = 0u32;
    loop {
        if pages >= options.max_pages {
            return Err(LinkError::PaginationCap { pages });
        }
        let query = OperationQuery {
            date_gt: (dates.start - Days::new(1)).and_time(NaiveTime::MIN),
            date_lt: (dates.end + Days::new(1)).and_time(NaiveTime::MIN),
            amount_gt: amounts.min - Money::from_cents(1),
            amount_lt: amounts.max + Money::from_cents(1),
            limit: QUERY_PAGE_LIMIT,
            skip: operations.len(),
        };
        let page = with_retries(options.retry_attempts, backoff, "candidate query", || {
            store.query_operations(query.clone())
        })
        .await?;
        pages += 1;
        let full_page = page.len() == QUERY_PAGE_LIMIT;
        operations.extend(page);
        if !full_page {
            tracing::debug!(
                bill = %bill.id,
                candidates = operations.len(),
                pages,
                "fetched neighboring operations"
            );
            return Ok(operations);
        }
    }
}
