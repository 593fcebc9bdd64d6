use chrono::{Days, NaiveDate};
use opmatch_core::{AmountRange, Bill, DateRange, Money};

use crate::options::LinkOptions;

/// Which side of the bill a search is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// The expense: money leaving the account.
    Debit,
    /// The reimbursement: money coming back in.
    Credit,
}

impl Side {
    pub(crate) fn is_credit(self) -> bool {
        matches!(self, Side::Credit)
    }
}

/// Date the search windows around. The expense happened near
/// `original_date`; a reimbursement arrives near the bill's own `date`.
pub(crate) fn search_date(bill: &Bill, side: Side) -> NaiveDate {
    match side {
        Side::Credit => bill.date,
        Side::Debit => bill.original_date.unwrap_or(bill.date),
    }
}

/// Amount a matching operation would carry, sign included. Bills record
/// positive amounts; the debit side flips the sign, and a refund bill's
/// debit is the original expense. Bundled reimbursements settle the
/// group total in one credit.
pub(crate) fn search_amount(bill: &Bill, side: Side) -> Money {
    match side {
        Side::Credit => bill.group_amount.unwrap_or(bill.amount),
        Side::Debit if bill.is_refund => -bill.original_amount.unwrap_or(bill.amount),
        Side::Debit => -bill.amount,
    }
}

pub(crate) fn date_range(bill: &Bill, options: &LinkOptions, side: Side) -> DateRange {
    let reference = search_date(bill, side);
    DateRange::new(
        reference - Days::new(options.past_window),
        reference + Days::new(options.future_window),
    )
}

pub(crate) fn amount_range(bill: &Bill, options: &LinkOptions, side: Side) -> AmountRange {
    let amount = search_amount(bill, side);
    AmountRange::new(amount - options.min_delta(), amount + options.max_delta())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 12, day).unwrap()
    }

    fn expense_bill() -> Bill {
        Bill {
            id: "b1".to_string(),
            amount: Money::from_cents(2000),
            original_amount: None,
            group_amount: None,
            date: d(15),
            original_date: None,
            vendor: "SFR".to_string(),
            bill_type: None,
            is_refund: false,
            is_third_party_payer: false,
            subtype: None,
        }
    }

    fn refund_bill() -> Bill {
        Bill {
            amount: Money::from_cents(500),
            original_amount: Some(Money::from_cents(2000)),
            group_amount: None,
            original_date: Some(d(13)),
            bill_type: Some("health_costs".to_string()),
            is_refund: true,
            vendor: "Ameli".to_string(),
            ..expense_bill()
        }
    }

    #[test]
    fn date_window_is_inclusive_at_both_boundaries() {
        let mut options = LinkOptions::for_identifiers(["sfr"]);
        options.past_window = 2;
        options.future_window = 3;
        let range = date_range(&expense_bill(), &options, Side::Debit);
        assert!(range.contains(d(13)));
        assert!(range.contains(d(18)));
        assert!(!range.contains(d(12)));
        assert!(!range.contains(d(19)));
    }

    #[test]
    fn debit_window_prefers_original_date() {
        let mut options = LinkOptions::for_identifiers(["cpam"]);
        options.past_window = 1;
        options.future_window = 1;
        let range = date_range(&refund_bill(), &options, Side::Debit);
        assert_eq!(range.start, d(12));
        assert_eq!(range.end, d(14));
    }

    #[test]
    fn credit_window_uses_the_bill_date() {
        let mut options = LinkOptions::for_identifiers(["cpam"]);
        options.past_window = 1;
        options.future_window = 1;
        let range = date_range(&refund_bill(), &options, Side::Credit);
        assert_eq!(range.start, d(14));
        assert_eq!(range.end, d(16));
    }

    #[test]
    fn expense_amount_is_negated() {
        assert_eq!(
            search_amount(&expense_bill(), Side::Debit),
            Money::from_cents(-2000)
        );
    }

    #[test]
    fn refund_debit_targets_the_original_expense() {
        assert_eq!(
            search_amount(&refund_bill(), Side::Debit),
            Money::from_cents(-2000)
        );
        assert_eq!(
            search_amount(&refund_bill(), Side::Credit),
            Money::from_cents(500)
        );
    }

    #[test]
    fn credit_amount_prefers_the_group_total() {
        let mut bill = refund_bill();
        bill.group_amount = Some(Money::from_cents(5750));
        assert_eq!(
            search_amount(&bill, Side::Credit),
            Money::from_cents(5750)
        );
    }

    #[test]
    fn amount_window_boundaries() {
        let mut options = LinkOptions::for_identifiers(["sfr"]);
        options.amount_delta = Money::from_cents(100);
        let range = amount_range(&expense_bill(), &options, Side::Debit);
        assert!(range.contains(Money::from_cents(-2100)));
        assert!(range.contains(Money::from_cents(-1900)));
        assert!(!range.contains(Money::from_cents(-2101)));
        assert!(!range.contains(Money::from_cents(-1899)));
    }

    #[test]
    fn zero_delta_still_matches_the_exact_amount() {
        let mut options = LinkOptions::for_identifiers(["sfr"]);
        options.amount_delta = Money::zero();
        let range = amount_range(&expense_bill(), &options, Side::Debit);
        assert!(range.contains(Money::from_cents(-2000)));
        assert!(!range.contains(Money::from_cents(-2001)));
    }
}
