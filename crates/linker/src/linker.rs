use std::collections::BTreeMap;
use std::time::Duration;

use opmatch_core::{Bill, Operation, Reimbursement};
use opmatch_store::{OperationStore, StoreError};
use thiserror::Error;

use crate::combine::{combinations_of_size, combine_bills, group_bills, subset_sizes, MAX_GROUP_SIZE};
use crate::fetch::fetch_neighboring_operations;
use crate::filters::filter_operations;
use crate::options::LinkOptions;
use crate::rank::{best_operation, RankedOperation};
use crate::ranges::Side;
use crate::util::with_retries;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("cannot link operations without the \"identifiers\" option")]
    MissingIdentifiers,
    #[error("invalid linker configuration: {0}")]
    Config(String),
    #[error("candidate query still returned full pages after {pages} pages")]
    PaginationCap { pages: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where one bill ended up after a run. Unresolved sides stay `None`;
/// that is the normal "nothing matched" outcome, not a failure.
#[derive(Debug, Clone)]
pub struct BillLinkage {
    pub bill: Bill,
    pub debit_operation: Option<Operation>,
    pub credit_operation: Option<Operation>,
}

/// Links each bill to its debit operation (the expense) and, for
/// refundable bills, its credit operation (the reimbursement), then
/// writes every touched operation back in one batch.
pub async fn link_bills_to_operations<S: OperationStore>(
    store: &S,
    bills: Vec<Bill>,
    options: LinkOptions,
) -> Result<BTreeMap<String, BillLinkage>, LinkError> {
    Linker::new(store, options)?.run(bills).await
}

/// Single-use run context. Mutations are buffered in `pending` and only
/// flushed in one terminal batch write: a run that fails mid-way has
/// written nothing.
pub struct Linker<'a, S> {
    store: &'a S,
    options: LinkOptions,
    pending: BTreeMap<String, Operation>,
}

impl<'a, S: OperationStore> Linker<'a, S> {
    /// Validates options before any I/O; a missing `identifiers` is a
    /// caller bug, not a runtime condition.
    pub fn new(store: &'a S, mut options: LinkOptions) -> Result<Self, LinkError> {
        options.validate()?;
        Ok(Linker {
            store,
            options,
            pending: BTreeMap::new(),
        })
    }

    pub async fn run(
        mut self,
        bills: Vec<Bill>,
    ) -> Result<BTreeMap<String, BillLinkage>, LinkError> {
        // Third-party-payer bills leave no trace on the account.
        let bills: Vec<Bill> = bills
            .into_iter()
            .filter(|bill| !bill.is_third_party_payer)
            .collect();
        tracing::info!(bills = bills.len(), "linking bills to bank operations");

        let mut result = BTreeMap::new();
        for bill in &bills {
            result.insert(
                bill.id.clone(),
                BillLinkage {
                    bill: bill.clone(),
                    debit_operation: None,
                    credit_operation: None,
                },
            );
            // One bill's fetch failure must not sink the rest of the run.
            if let Err(error) = self.link_bill(bill, &mut result).await {
                tracing::warn!(bill = %bill.id, %error, "leaving bill unlinked after store failure");
            }
        }

        self.link_combinations(&mut result).await;
        self.commit().await?;
        Ok(result)
    }

    async fn link_bill(
        &mut self,
        bill: &Bill,
        result: &mut BTreeMap<String, BillLinkage>,
    ) -> Result<(), LinkError> {
        let debit = self.find_match(bill, Side::Debit).await?;
        if let Some(operation) = &debit {
            tracing::debug!(
                bill = %bill.id,
                operation = %operation.id,
                label = %operation.label,
                "matched debit operation"
            );
            self.add_bill_to_operation(bill, operation);
            if let Some(linkage) = result.get_mut(&bill.id) {
                linkage.debit_operation = Some(self.current(operation));
            }
        }

        if !bill.is_refund {
            return Ok(());
        }

        let credit = self.find_match(bill, Side::Credit).await?;
        if let Some(operation) = &credit {
            tracing::debug!(
                bill = %bill.id,
                operation = %operation.id,
                label = %operation.label,
                "matched credit operation"
            );
            self.add_bill_to_operation(bill, operation);
        }
        if let (Some(debit_op), Some(credit_op)) = (&debit, &credit) {
            self.add_reimbursement_to_operation(bill, debit_op, credit_op);
        }
        if let Some(linkage) = result.get_mut(&bill.id) {
            linkage.credit_operation = credit.map(|op| self.current(&op));
            if let Some(debit_op) = &debit {
                // Refresh: the reimbursement may have landed on it.
                linkage.debit_operation = Some(self.current(debit_op));
            }
        }
        Ok(())
    }

    async fn find_match(&self, bill: &Bill, side: Side) -> Result<Option<Operation>, LinkError> {
        Ok(self
            .find_ranked(bill, side)
            .await?
            .map(|ranked| ranked.operation))
    }

    async fn find_ranked(
        &self,
        bill: &Bill,
        side: Side,
    ) -> Result<Option<RankedOperation>, LinkError> {
        // Only refundable bills have a credit side at all.
        if side.is_credit() && !bill.is_refund {
            return Ok(None);
        }
        let fetched =
            fetch_neighboring_operations(self.store, bill, &self.options, side).await?;
        let fetched = self.overlay_pending(fetched);
        let survivors = filter_operations(bill, fetched, &self.options, side);
        Ok(best_operation(bill, survivors, &self.options, side))
    }

    /// Candidates must reflect this run's buffered mutations: two bills
    /// settling against the same operation see each other's writes.
    fn overlay_pending(&self, operations: Vec<Operation>) -> Vec<Operation> {
        operations
            .into_iter()
            .map(|operation| {
                self.pending
                    .get(&operation.id)
                    .cloned()
                    .unwrap_or(operation)
            })
            .collect()
    }

    fn current(&self, operation: &Operation) -> Operation {
        self.pending
            .get(&operation.id)
            .cloned()
            .unwrap_or_else(|| operation.clone())
    }

    fn add_bill_to_operation(&mut self, bill: &Bill, operation: &Operation) {
        if bill.id.is_empty() {
            tracing::warn!("bill has no id, cannot attach it to an operation");
            return;
        }
        let mut updated = self.current(operation);
        if updated.link_bill(bill.document_ref()) {
            self.pending.insert(updated.id.clone(), updated);
        }
    }

    fn add_reimbursement_to_operation(
        &mut self,
        bill: &Bill,
        debit_operation: &Operation,
        credit_operation: &Operation,
    ) {
        if bill.id.is_empty() {
            tracing::warn!("bill has no id, cannot record its reimbursement");
            return;
        }
        let mut updated = self.current(debit_operation);
        let changed = updated.add_reimbursement(Reimbursement {
            bill_id: bill.document_ref(),
            amount: bill.amount,
            operation_id: Some(credit_operation.id.clone()),
        });
        if changed {
            self.pending.insert(updated.id.clone(), updated);
        }
    }

    /// Bundled-payout pass: bills that did not match alone may match as
    /// a same-vendor, same-day group summed into one pseudo-bill.
    /// Smallest subsets are tried first, ties broken by ranker
    /// distance; matched bills leave the pool and the search restarts
    /// until a pass links nothing.
    async fn link_combinations(&mut self, result: &mut BTreeMap<String, BillLinkage>) {
        let mut stored_bills: Option<Vec<Bill>> = None;
        loop {
            let unlinked: Vec<Bill> = result
                .values()
                .filter(|linkage| linkage.debit_operation.is_none())
                .map(|linkage| linkage.bill.clone())
                .collect();
            if unlinked.is_empty() {
                return;
            }
            if stored_bills.is_none() {
                // A bundle may span bills saved by an earlier run.
                let backoff = Duration::from_millis(self.options.retry_backoff_ms);
                let store = self.store;
                let listed = with_retries(
                    self.options.retry_attempts,
                    backoff,
                    "bill listing",
                    || store.fetch_all_bills(),
                )
                .await
                .unwrap_or_else(|error| {
                    tracing::warn!(%error, "cannot list stored bills, bundling current run only");
                    Vec::new()
                });
                stored_bills = Some(listed);
            }
            let mut pool = unlinked;
            pool.extend(
                stored_bills
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .filter(|stored| {
                        !result.contains_key(&stored.id) && !stored.is_third_party_payer
                    })
                    .cloned(),
            );

            if !self.link_one_bundle(pool, result).await {
                return;
            }
        }
    }

    /// Tries every group for one bundle match. Returns whether a match
    /// was recorded (the caller then rebuilds the pool and retries).
    async fn link_one_bundle(
        &mut self,
        pool: Vec<Bill>,
        result: &mut BTreeMap<String, BillLinkage>,
    ) -> bool {
        for group in group_bills(pool, &self.options.group_vendors) {
            if group.len() < 2 {
                continue;
            }
            if group.len() > MAX_GROUP_SIZE {
                tracing::warn!(
                    vendor = %group[0].vendor,
                    size = group.len(),
                    "bill group too large, skipping combination search"
                );
                continue;
            }
            for size in subset_sizes(group.len()) {
                let mut best: Option<(Vec<Bill>, RankedOperation)> = None;
                for subset in combinations_of_size(&group, size) {
                    // A bundle is only actionable if it involves at
                    // least one bill from this run.
                    if !subset.iter().any(|bill| result.contains_key(&bill.id)) {
                        continue;
                    }
                    let combined = combine_bills(&subset);
                    match self.find_ranked(&combined, Side::Debit).await {
                        Ok(Some(ranked)) => {
                            let better = best
                                .as_ref()
                                .map_or(true, |(_, held)| ranked.distance < held.distance);
                            if better {
                                best = Some((subset, ranked));
                            }
                        }
                        Ok(None) => {}
                        Err(error) => {
                            tracing::warn!(%error, "combination candidate fetch failed");
                        }
                    }
                }
                if let Some((members, ranked)) = best {
                    self.record_bundle(&members, &ranked.operation, result);
                    return true;
                }
            }
        }
        false
    }

    fn record_bundle(
        &mut self,
        members: &[Bill],
        operation: &Operation,
        result: &mut BTreeMap<String, BillLinkage>,
    ) {
        tracing::debug!(
            members = ?members.iter().map(|bill| bill.id.as_str()).collect::<Vec<_>>(),
            operation = %operation.id,
            "matched a bill bundle"
        );
        for member in members {
            self.add_bill_to_operation(member, operation);
        }
        for member in members {
            if let Some(linkage) = result.get_mut(&member.id) {
                if let Some(credit) = linkage.credit_operation.clone() {
                    self.add_reimbursement_to_operation(member, operation, &credit);
                }
                linkage.debit_operation = Some(self.current(operation));
            }
        }
    }

    /// Terminal flush: either every buffered mutation lands or none do.
    async fn commit(&mut self) -> Result<(), LinkError> {
        if self.pending.is_empty() {
            tracing::debug!("no operation updates to commit");
            return Ok(());
        }
        let updates: Vec<Operation> = self.pending.values().cloned().collect();
        tracing::info!(operations = updates.len(), "committing buffered operation updates");
        let store = self.store;
        with_retries(
            self.options.retry_attempts,
            Duration::from_millis(self.options.retry_backoff_ms),
            "batch commit",
            || store.batch_update(updates.clone()),
        )
        .await?;
        self.pending.clear();
        Ok(())
    }
}
