use chrono::NaiveTime;
use opmatch_core::{Bill, Operation};

use crate::options::LinkOptions;
use crate::ranges::{search_amount, search_date, Side};

#[derive(Debug, Clone)]
pub(crate) struct RankedOperation {
    pub operation: Operation,
    pub distance: f64,
}

/// Weighted distance between a bill and a candidate: hours of date gap
/// against units of amount gap, 0.7/0.3 by default. The weights are an
/// inherited heuristic, not derived from anything.
fn distance(bill: &Bill, operation: &Operation, options: &LinkOptions, side: Side) -> f64 {
    let reference = search_date(bill, side).and_time(NaiveTime::MIN);
    let hours = (operation.date - reference).num_minutes() as f64 / 60.0;
    let amount_gap = (search_amount(bill, side) - operation.amount).abs().to_f64();
    options.date_weight * hours.abs() + options.amount_weight * amount_gap
}

/// Best surviving candidate, or `None` on an empty list. Sort is
/// stable: equidistant candidates keep their incoming order.
pub(crate) fn best_operation(
    bill: &Bill,
    operations: Vec<Operation>,
    options: &LinkOptions,
    side: Side,
) -> Option<RankedOperation> {
    let mut ranked: Vec<RankedOperation> = operations
        .into_iter()
        .map(|operation| RankedOperation {
            distance: distance(bill, &operation, options, side),
            operation,
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.into_iter().next()
}
