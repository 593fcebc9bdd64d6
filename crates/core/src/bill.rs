use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;

pub const BILLS_DOCTYPE: &str = "io.cozy.bills";

/// A vendor invoice fetched by a connector, pending reconciliation with
/// bank activity. Read-only to the linker.
///
/// Sign convention: `amount` is positive. An expense bill is matched
/// against a negative (debit) operation; a bill with `is_refund` is the
/// reimbursement notice for an expense of `original_amount` and is
/// additionally matched against a positive (credit) operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(rename = "_id")]
    pub id: String,
    pub amount: Money,
    /// Amount of the underlying expense, when the bill itself documents a
    /// reimbursement of it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<Money>,
    /// Total of the payout bundle this bill was reimbursed in, when the
    /// credit operation covers several bills at once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_amount: Option<Money>,
    pub date: NaiveDate,
    /// Date the expense was incurred; `date` may be the invoice or payout
    /// date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_date: Option<NaiveDate>,
    pub vendor: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<String>,
    #[serde(default)]
    pub is_refund: bool,
    /// Paid directly by a third party: no operation exists on the user's
    /// account, so the bill never participates in matching.
    #[serde(default)]
    pub is_third_party_payer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

impl Bill {
    /// Foreign-key form stored in an operation's `bills` list.
    pub fn document_ref(&self) -> String {
        format!("{}:{}", BILLS_DOCTYPE, self.id)
    }
}
