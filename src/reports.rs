//! Sales-report aggregation over stored payments.
//!
//! Payments embed their cart as a list of line items; reporting flattens that
//! nesting into one row per item and reduces paid/pending totals either
//! globally or per seller. Everything here is pure so the route handlers only
//! fetch and serialize.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::PaymentDoc;

/// One line of the flattened sales ledger.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesReportRow {
    pub payment_id: String,
    pub medicine_name: String,
    pub seller_email: String,
    pub buyer_email: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub line_total: f64,
    pub status: String,
    pub date: DateTime<Utc>,
}

#[derive(Serialize, Debug, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub paid_total: f64,
    pub pending_total: f64,
}

fn is_paid(status: &str) -> bool {
    status.eq_ignore_ascii_case("paid")
}

fn is_pending(status: &str) -> bool {
    status.eq_ignore_ascii_case("pending") || status.eq_ignore_ascii_case("unpaid")
}

/// Flatten payments into one row per embedded line item, preserving payment
/// order and embedded item order. Missing quantity defaults to 1, missing
/// unit price to 0.0.
pub fn flatten(payments: &[PaymentDoc]) -> Vec<SalesReportRow> {
    payments
        .iter()
        .flat_map(|payment| {
            let payment_id = payment
                .id
                .map(|id| id.to_hex())
                .unwrap_or_default();
            payment.cart_items.iter().map(move |item| {
                let quantity = item.quantity.unwrap_or(1);
                let unit_price = item.unit_price.unwrap_or(0.0);
                SalesReportRow {
                    payment_id: payment_id.clone(),
                    medicine_name: item.name.clone(),
                    seller_email: item.seller_email.clone(),
                    buyer_email: payment.buyer_email.clone(),
                    quantity,
                    unit_price,
                    line_total: quantity as f64 * unit_price,
                    status: payment.status.clone(),
                    date: payment.date,
                }
            })
        })
        .collect()
}

/// Global paid/pending totals from each payment's top-level `totalPrice`.
pub fn summarize(payments: &[PaymentDoc]) -> PaymentSummary {
    let mut summary = PaymentSummary::default();
    for payment in payments {
        if is_paid(&payment.status) {
            summary.paid_total += payment.total_price;
        } else if is_pending(&payment.status) {
            summary.pending_total += payment.total_price;
        }
    }
    summary
}

/// Paid/pending totals for one seller, summing the seller's line totals.
/// Seller attribution lives on the line items, not the payment, so this goes
/// through the flattened rows.
pub fn summarize_for_seller(payments: &[PaymentDoc], seller_email: &str) -> PaymentSummary {
    let mut summary = PaymentSummary::default();
    for row in flatten(payments) {
        if row.seller_email != seller_email {
            continue;
        }
        if is_paid(&row.status) {
            summary.paid_total += row.line_total;
        } else if is_pending(&row.status) {
            summary.pending_total += row.line_total;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use chrono::TimeZone;

    fn payment(status: &str, total_price: f64, cart_items: Vec<LineItem>) -> PaymentDoc {
        PaymentDoc {
            id: Some(mongodb::bson::oid::ObjectId::new()),
            buyer_email: "buyer@example.com".to_string(),
            transaction_id: None,
            total_price,
            status: status.to_string(),
            date: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            paid_date: None,
            cart_items,
        }
    }

    fn item(name: &str, seller: &str, quantity: Option<i64>, unit_price: Option<f64>) -> LineItem {
        LineItem {
            name: name.to_string(),
            seller_email: seller.to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn flatten_defaults_missing_quantity_and_price() {
        let payments = vec![payment(
            "paid",
            10.0,
            vec![
                item("A", "s1", Some(2), Some(5.0)),
                item("B", "s2", None, None),
            ],
        )];

        let rows = flatten(&payments);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].medicine_name, "A");
        assert_eq!(rows[0].line_total, 10.0);
        assert_eq!(rows[1].medicine_name, "B");
        assert_eq!(rows[1].quantity, 1);
        assert_eq!(rows[1].unit_price, 0.0);
        assert_eq!(rows[1].line_total, 0.0);
    }

    #[test]
    fn flatten_preserves_payment_then_item_order() {
        let payments = vec![
            payment("paid", 1.0, vec![item("A", "s1", None, None)]),
            payment(
                "pending",
                2.0,
                vec![item("B", "s1", None, None), item("C", "s2", None, None)],
            ),
        ];

        let names: Vec<_> = flatten(&payments)
            .into_iter()
            .map(|row| row.medicine_name)
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn admin_summary_buckets_paid_vs_pending_and_unpaid() {
        let payments = vec![
            payment("paid", 100.0, vec![]),
            payment("pending", 50.0, vec![]),
            payment("unpaid", 20.0, vec![]),
        ];

        let summary = summarize(&payments);
        assert_eq!(summary.paid_total, 100.0);
        assert_eq!(summary.pending_total, 70.0);
    }

    #[test]
    fn summary_status_comparison_is_case_insensitive() {
        let payments = vec![
            payment("PAID", 30.0, vec![]),
            payment("Pending", 5.0, vec![]),
        ];

        let summary = summarize(&payments);
        assert_eq!(summary.paid_total, 30.0);
        assert_eq!(summary.pending_total, 5.0);
    }

    #[test]
    fn unknown_statuses_are_ignored_by_summaries() {
        let payments = vec![payment("refunded", 40.0, vec![])];
        assert_eq!(summarize(&payments), PaymentSummary::default());
    }

    #[test]
    fn seller_summary_sums_only_that_sellers_line_totals() {
        let payments = vec![
            payment(
                "paid",
                999.0,
                vec![
                    item("A", "s1", Some(2), Some(5.0)),
                    item("B", "s2", Some(1), Some(7.0)),
                ],
            ),
            payment("unpaid", 999.0, vec![item("C", "s1", Some(3), Some(4.0))]),
        ];

        let summary = summarize_for_seller(&payments, "s1");
        assert_eq!(summary.paid_total, 10.0);
        assert_eq!(summary.pending_total, 12.0);

        let other = summarize_for_seller(&payments, "s2");
        assert_eq!(other.paid_total, 7.0);
        assert_eq!(other.pending_total, 0.0);
    }
}
