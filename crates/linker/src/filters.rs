use opmatch_core::{Bill, Operation};

use crate::options::LinkOptions;
use crate::ranges::{amount_range, date_range, Side};

/// Vendors whose bills are settled by a health insurer; their debit
/// side is recognized by category, not by label.
const HEALTH_VENDORS: [&str; 4] = ["Ameli", "Harmonie", "Malakoff Mederic", "MGEN"];
const HEALTH_COSTS_TYPE: &str = "health_costs";

const HEALTH_EXPENSE_CATEGORY: &str = "400610";
const HEALTH_INSURANCE_CATEGORY: &str = "400620";
const UNCATEGORIZED: &str = "0";

pub(crate) fn is_health_bill(bill: &Bill) -> bool {
    bill.bill_type.as_deref() == Some(HEALTH_COSTS_TYPE)
        || HEALTH_VENDORS.contains(&bill.vendor.as_str())
}

fn matches_identifiers(operation: &Operation, identifiers: &[String]) -> bool {
    let label = operation.label.to_lowercase();
    identifiers
        .iter()
        .any(|identifier| label.contains(&identifier.to_lowercase()))
}

fn matches_category(bill: &Bill, operation: &Operation, allow_uncategorized: bool) -> bool {
    let category = operation.category_id();
    if is_health_bill(bill) {
        match category {
            None | Some(UNCATEGORIZED) => allow_uncategorized,
            Some(HEALTH_EXPENSE_CATEGORY) => true,
            // The auto-categorizer may tag a reimbursement as insurance
            // income; an expense never carries that category.
            Some(HEALTH_INSURANCE_CATEGORY) => !operation.amount.is_negative(),
            Some(_) => false,
        }
    } else {
        match category {
            None | Some(UNCATEGORIZED) => true,
            Some(category) => category != HEALTH_EXPENSE_CATEGORY,
        }
    }
}

/// A debit operation can only absorb reimbursements up to its own
/// magnitude.
fn has_reimbursement_capacity(bill: &Bill, operation: &Operation) -> bool {
    operation.total_reimbursed() + bill.amount <= -operation.amount
}

/// Narrows candidates to the ones plausibly settling `bill`, in order:
/// identifier, date window, amount window, category, remaining
/// reimbursement capacity. The identifier check is skipped for the
/// debit side of a health bill, whose expense label never carries the
/// insurer's alias.
pub(crate) fn filter_operations(
    bill: &Bill,
    operations: Vec<Operation>,
    options: &LinkOptions,
    side: Side,
) -> Vec<Operation> {
    let dates = date_range(bill, options, side);
    let amounts = amount_range(bill, options, side);
    let identifier_applies = side.is_credit() || !is_health_bill(bill);
    let capacity_applies = !side.is_credit() && bill.is_refund;

    operations
        .into_iter()
        .filter(|operation| {
            (!identifier_applies || matches_identifiers(operation, &options.identifiers))
                && dates.contains(operation.date.date())
                && amounts.contains(operation.amount)
                && matches_category(bill, operation, options.allow_uncategorized)
                && (!capacity_applies || has_reimbursement_capacity(bill, operation))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use opmatch_core::{Money, Reimbursement};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 12, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn operation(id: &str, day: u32, cents: i64, label: &str) -> Operation {
        Operation {
            id: id.to_string(),
            date: at(day),
            amount: Money::from_cents(cents),
            label: label.to_string(),
            manual_category_id: None,
            automatic_category_id: None,
            bills: Vec::new(),
            reimbursements: Vec::new(),
        }
    }

    fn categorized(id: &str, day: u32, cents: i64, label: &str, category: &str) -> Operation {
        Operation {
            automatic_category_id: Some(category.to_string()),
            ..operation(id, day, cents, label)
        }
    }

    /// The fixture set the filter pipeline was originally designed
    /// around: a doctor's visit, two phone invoices, assorted noise and
    /// reimbursements in both directions.
    fn fixtures() -> Vec<Operation> {
        vec![
            categorized("o1", 13, -2000, "Visite chez le médecin", "400610"),
            categorized("o2", 15, 500, "Remboursement CPAM", "400610"),
            operation("o3", 8, -12000, "Facture SFR"),
            operation("o4", 7, -3000, "Facture SFR"),
            operation("o5", 7, -8000, "Matériel d'escalade"),
            operation("o6", 5, -550, "Burrito"),
            operation("o7", 6, -260, "Salade"),
            Operation {
                reimbursements: vec![Reimbursement {
                    bill_id: "io.cozy.bills:prior".to_string(),
                    amount: Money::from_cents(5000),
                    operation_id: None,
                }],
                ..categorized("o8", 15, 5000, "Remboursement CPAM", "400610")
            },
            categorized("o9", 16, -5000, "Visite chez le dentiste", "400610"),
            categorized("o10", 16, -750, "Dafalgan", "400610"),
            categorized("o11", 16, 5750, "Remboursement CPAM", "400610"),
        ]
    }

    fn health_bill() -> Bill {
        Bill {
            id: "b1".to_string(),
            amount: Money::from_cents(500),
            original_amount: Some(Money::from_cents(2000)),
            group_amount: None,
            date: NaiveDate::from_ymd_opt(2017, 12, 15).unwrap(),
            original_date: Some(NaiveDate::from_ymd_opt(2017, 12, 13).unwrap()),
            vendor: "Ameli".to_string(),
            bill_type: Some(HEALTH_COSTS_TYPE.to_string()),
            is_refund: true,
            is_third_party_payer: false,
            subtype: None,
        }
    }

    fn phone_bill() -> Bill {
        Bill {
            id: "b2".to_string(),
            amount: Money::from_cents(3000),
            original_amount: None,
            group_amount: None,
            date: NaiveDate::from_ymd_opt(2017, 12, 8).unwrap(),
            original_date: None,
            vendor: "SFR".to_string(),
            bill_type: None,
            is_refund: false,
            is_third_party_payer: false,
            subtype: None,
        }
    }

    fn narrow_options(identifiers: &[&str]) -> LinkOptions {
        let mut options = LinkOptions::for_identifiers(identifiers.iter().copied());
        options.amount_delta = Money::from_cents(100);
        options.past_window = 1;
        options.future_window = 1;
        options
    }

    #[test]
    fn identifier_match_is_case_insensitive() {
        let candidates = vec![
            operation("hit", 15, 500, "Remboursement cpam"),
            operation("miss", 15, 500, "CapitainTrain"),
        ];
        let kept = filter_operations(
            &Bill {
                vendor: "CPAM".to_string(),
                bill_type: None,
                ..health_bill()
            },
            candidates,
            &narrow_options(&["CPAM"]),
            Side::Credit,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "hit");
    }

    #[test]
    fn health_debit_ignores_identifiers_and_matches_by_category() {
        let kept = filter_operations(
            &health_bill(),
            fixtures(),
            &narrow_options(&["CPAM"]),
            Side::Debit,
        );
        let ids: Vec<&str> = kept.iter().map(|op| op.id.as_str()).collect();
        assert_eq!(ids, ["o1"]);
    }

    #[test]
    fn health_credit_matches_the_reimbursement() {
        let kept = filter_operations(
            &health_bill(),
            fixtures(),
            &narrow_options(&["CPAM"]),
            Side::Credit,
        );
        let ids: Vec<&str> = kept.iter().map(|op| op.id.as_str()).collect();
        assert_eq!(ids, ["o2"]);
    }

    #[test]
    fn phone_debit_needs_the_vendor_label() {
        let kept = filter_operations(
            &phone_bill(),
            fixtures(),
            &narrow_options(&["SFR"]),
            Side::Debit,
        );
        let ids: Vec<&str> = kept.iter().map(|op| op.id.as_str()).collect();
        assert_eq!(ids, ["o4"]);
    }

    #[test]
    fn phone_credit_finds_nothing() {
        let kept = filter_operations(
            &phone_bill(),
            fixtures(),
            &narrow_options(&["SFR"]),
            Side::Credit,
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn group_amount_credit_targets_the_bundle_total() {
        let bill = Bill {
            amount: Money::from_cents(5000),
            group_amount: Some(Money::from_cents(5750)),
            original_amount: None,
            date: NaiveDate::from_ymd_opt(2017, 12, 16).unwrap(),
            original_date: None,
            ..health_bill()
        };
        let options = narrow_options(&["CPAM"]);
        let debit = filter_operations(&bill, fixtures(), &options, Side::Debit);
        assert_eq!(debit.len(), 1);
        assert_eq!(debit[0].id, "o9");
        let credit = filter_operations(&bill, fixtures(), &options, Side::Credit);
        assert_eq!(credit.len(), 1);
        assert_eq!(credit[0].id, "o11");
    }

    #[test]
    fn health_category_matrix() {
        let bill = health_bill();
        let expense_debit = categorized("a", 13, -1000, "x", HEALTH_EXPENSE_CATEGORY);
        let insurance_debit = categorized("b", 13, -1000, "x", HEALTH_INSURANCE_CATEGORY);
        let insurance_credit = categorized("c", 13, 1000, "x", HEALTH_INSURANCE_CATEGORY);
        let expense_credit = categorized("d", 13, 1000, "x", HEALTH_EXPENSE_CATEGORY);
        let other = categorized("e", 13, -1000, "x", "400611");
        let uncategorized = operation("f", 13, -1000, "x");

        assert!(matches_category(&bill, &expense_debit, false));
        assert!(!matches_category(&bill, &insurance_debit, false));
        assert!(matches_category(&bill, &insurance_credit, false));
        assert!(matches_category(&bill, &expense_credit, false));
        assert!(!matches_category(&bill, &other, false));
        assert!(!matches_category(&bill, &uncategorized, false));
        assert!(matches_category(&bill, &uncategorized, true));
    }

    #[test]
    fn non_health_bill_only_rejects_health_expenses() {
        let bill = phone_bill();
        let health = categorized("a", 8, -3000, "Facture SFR", HEALTH_EXPENSE_CATEGORY);
        let other = categorized("b", 8, -3000, "Facture SFR", "400611");
        let uncategorized = operation("c", 8, -3000, "Facture SFR");

        assert!(!matches_category(&bill, &health, false));
        assert!(matches_category(&bill, &other, false));
        assert!(matches_category(&bill, &uncategorized, false));
    }

    #[test]
    fn reimbursement_capacity_boundary() {
        let bill = Bill {
            amount: Money::from_cents(1000),
            ..health_bill()
        };
        let mut full = operation("full", 13, -1000, "x");
        full.reimbursements.push(Reimbursement {
            bill_id: "io.cozy.bills:earlier".to_string(),
            amount: Money::from_cents(1000),
            operation_id: None,
        });
        let mut split = operation("split", 13, -1000, "x");
        for (bill_id, cents) in [("p1", 700), ("p2", 300)] {
            split.reimbursements.push(Reimbursement {
                bill_id: format!("io.cozy.bills:{bill_id}"),
                amount: Money::from_cents(cents),
                operation_id: None,
            });
        }
        let mut roomy = operation("roomy", 13, -2000, "x");
        roomy.reimbursements.push(Reimbursement {
            bill_id: "io.cozy.bills:p3".to_string(),
            amount: Money::from_cents(1000),
            operation_id: None,
        });

        assert!(!has_reimbursement_capacity(&bill, &full));
        assert!(!has_reimbursement_capacity(&bill, &split));
        assert!(has_reimbursement_capacity(&bill, &roomy));
    }
}
