use std::collections::BTreeMap;

use chrono::NaiveDate;
use opmatch_core::{Bill, Money};

/// Subsets below this size are just the single-bill search again.
const MIN_COMBINATION_SIZE: usize = 2;

/// Groups larger than this would enumerate millions of subsets; such a
/// group is almost certainly bad input, not a real payout bundle.
pub(crate) const MAX_GROUP_SIZE: usize = 20;

/// Only bills of vendors known to bundle payouts are worth combining.
pub(crate) fn can_group(bill: &Bill, group_vendors: &[String]) -> bool {
    bill.bill_type.as_deref() == Some("health_costs")
        || group_vendors.iter().any(|vendor| vendor == &bill.vendor)
}

/// Partitions groupable bills by `(vendor, original date)` — the key a
/// bundled reimbursement shares. Deterministic group order.
pub(crate) fn group_bills(
    bills: Vec<Bill>,
    group_vendors: &[String],
) -> Vec<Vec<Bill>> {
    let mut groups: BTreeMap<(String, NaiveDate), Vec<Bill>> = BTreeMap::new();
    for bill in bills {
        if !can_group(&bill, group_vendors) {
            continue;
        }
        let key = (
            bill.vendor.clone(),
            bill.original_date.unwrap_or(bill.date),
        );
        groups.entry(key).or_default().push(bill);
    }
    groups.into_values().collect()
}

/// Every subset of `bills` of exactly `size` members, in lexicographic
/// index order. Combinations, not permutations.
pub(crate) fn combinations_of_size(bills: &[Bill], size: usize) -> Vec<Vec<Bill>> {
    let mut subsets = Vec::new();
    if size == 0 || size > bills.len() {
        return subsets;
    }
    let mut indices: Vec<usize> = (0..size).collect();
    loop {
        subsets.push(indices.iter().map(|&i| bills[i].clone()).collect());
        // Advance the rightmost index that still has room.
        let mut cursor = size;
        loop {
            if cursor == 0 {
                return subsets;
            }
            cursor -= 1;
            if indices[cursor] != cursor + bills.len() - size {
                break;
            }
        }
        indices[cursor] += 1;
        for i in cursor + 1..size {
            indices[i] = indices[i - 1] + 1;
        }
    }
}

pub(crate) fn subset_sizes(group_len: usize) -> std::ops::RangeInclusive<usize> {
    MIN_COMBINATION_SIZE..=group_len
}

/// One pseudo-bill standing in for several bills paid out together.
/// Amounts sum; everything else comes from the first member.
pub(crate) fn combine_bills(members: &[Bill]) -> Bill {
    let mut combined = members[0].clone();
    combined.id = std::iter::once("combined")
        .chain(members.iter().map(|bill| bill.id.as_str()))
        .collect::<Vec<_>>()
        .join(":");
    combined.amount = members.iter().map(|bill| bill.amount).sum();
    combined.original_amount = Some(
        members
            .iter()
            .map(|bill| bill.original_amount.unwrap_or(bill.amount))
            .sum::<Money>(),
    );
    combined
}
