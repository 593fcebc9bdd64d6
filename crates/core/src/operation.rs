use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::money::Money;

pub const OPERATIONS_DOCTYPE: &str = "io.cozy.bank.operations";

/// A reimbursement credited against a debit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reimbursement {
    pub bill_id: String,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

/// A bank transaction already present in the user's financial store.
/// The linker only ever touches `bills` and `reimbursements`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(rename = "_id")]
    pub id: String,
    pub date: NaiveDateTime,
    pub amount: Money,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_category_id: Option<String>,
    /// Doctype-qualified refs of the bills this operation settles.
    /// Append-only, no duplicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bills: Vec<String>,
    /// No two entries share a `bill_id`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reimbursements: Vec<Reimbursement>,
}

impl Operation {
    /// A manual categorization wins over the automatic one.
    pub fn category_id(&self) -> Option<&str> {
        self.manual_category_id
            .as_deref()
            .or(self.automatic_category_id.as_deref())
    }

    pub fn total_reimbursed(&self) -> Money {
        self.reimbursements.iter().map(|r| r.amount).sum()
    }

    pub fn has_bill(&self, bill_ref: &str) -> bool {
        self.bills.iter().any(|b| b == bill_ref)
    }

    pub fn has_reimbursement_for(&self, bill_id: &str) -> bool {
        self.reimbursements.iter().any(|r| r.bill_id == bill_id)
    }

    /// Appends a bill ref unless already present. Returns whether the
    /// operation changed.
    pub fn link_bill(&mut self, bill_ref: String) -> bool {
        if self.has_bill(&bill_ref) {
            return false;
        }
        self.bills.push(bill_ref);
        true
    }

    /// Appends a reimbursement unless one exists for the same bill.
    /// Returns whether the operation changed.
    pub fn add_reimbursement(&mut self, reimbursement: Reimbursement) -> bool {
        if self.has_reimbursement_for(&reimbursement.bill_id) {
            return false;
        }
        self.reimbursements.push(reimbursement);
        true
    }
}
