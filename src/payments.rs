//! Payment settlement.
//!
//! One function decides whether an order can be settled and what the
//! `transaksi` row looks like; the cashier flow and the guest checkout both
//! go through it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Order, OrderStatus, PaymentMethod};

/// Insert payload for the `transaksi` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    #[serde(rename = "id_order")]
    pub order_id: i64,
    #[serde(rename = "id_user")]
    pub cashier_id: i64,
    #[serde(rename = "tanggal")]
    pub date: NaiveDate,
    #[serde(rename = "total_bayar")]
    pub amount: f64,
    #[serde(rename = "uang_diterima")]
    pub cash_received: Option<f64>,
    #[serde(rename = "kembalian")]
    pub change: Option<f64>,
    #[serde(rename = "metode_pembayaran")]
    pub method: PaymentMethod,
}

/// Validate a settlement and produce the `transaksi` insert payload.
///
/// Cash (`tunai`) must cover the bill and records the change due. `debit`
/// and `qris` settle the exact amount, so `uang_diterima`/`kembalian` stay
/// null for them. Orders still `pending` or already `dibatalkan` are not
/// payable.
pub fn settle(
    order: &Order,
    cashier_id: i64,
    method: PaymentMethod,
    amount_received: f64,
    date: NaiveDate,
) -> Result<NewTransaction> {
    match order.status {
        OrderStatus::Proses | OrderStatus::Selesai => {}
        other => {
            return Err(Error::Settlement(format!(
                "order {} is '{other}', not payable",
                order.id
            )))
        }
    }
    if order.total <= 0.0 {
        return Err(Error::Settlement(format!(
            "order {} has no billable total",
            order.id
        )));
    }

    let (cash_received, change) = match method {
        PaymentMethod::Tunai => {
            if amount_received < order.total {
                return Err(Error::Settlement(format!(
                    "received {amount_received} does not cover the bill of {}",
                    order.total
                )));
            }
            (Some(amount_received), Some(amount_received - order.total))
        }
        PaymentMethod::Debit | PaymentMethod::Qris => {
            if amount_received != order.total {
                return Err(Error::Settlement(format!(
                    "{method} settlements must match the bill exactly"
                )));
            }
            (None, None)
        }
    };

    Ok(NewTransaction {
        order_id: order.id,
        cashier_id,
        date,
        amount: order.total,
        cash_received,
        change,
        method,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn payable_order(status: OrderStatus, total: f64) -> Order {
        Order {
            id: 12,
            table_number: "A1".to_string(),
            date: "2024-08-05".parse().unwrap(),
            user_id: 3,
            status,
            total,
            created_at: "2024-08-05T12:00:00+00:00".to_string(),
            user: None,
            line_items: None,
        }
    }

    fn today() -> NaiveDate {
        "2024-08-05".parse().unwrap()
    }

    #[test]
    fn cash_settlement_records_change() {
        let order = payable_order(OrderStatus::Selesai, 85_000.0);
        let tx = settle(&order, 2, PaymentMethod::Tunai, 100_000.0, today())
            .expect("cash settlement should pass");
        assert_eq!(tx.amount, 85_000.0);
        assert_eq!(tx.cash_received, Some(100_000.0));
        assert_eq!(tx.change, Some(15_000.0));
        assert_eq!(tx.order_id, 12);
        assert_eq!(tx.cashier_id, 2);
    }

    #[test]
    fn insufficient_cash_is_rejected() {
        let order = payable_order(OrderStatus::Selesai, 85_000.0);
        let err = settle(&order, 2, PaymentMethod::Tunai, 80_000.0, today())
            .expect_err("short cash must fail");
        assert!(err.to_string().contains("does not cover"));
    }

    #[test]
    fn cashless_must_match_the_bill_exactly() {
        let order = payable_order(OrderStatus::Proses, 85_000.0);
        assert!(settle(&order, 2, PaymentMethod::Debit, 90_000.0, today()).is_err());
        let tx = settle(&order, 2, PaymentMethod::Qris, 85_000.0, today())
            .expect("exact qris settlement should pass");
        assert_eq!(tx.cash_received, None);
        assert_eq!(tx.change, None);
    }

    #[test]
    fn pending_and_cancelled_orders_are_not_payable() {
        let pending = payable_order(OrderStatus::Pending, 85_000.0);
        assert!(settle(&pending, 2, PaymentMethod::Tunai, 100_000.0, today()).is_err());

        let cancelled = payable_order(OrderStatus::Dibatalkan, 85_000.0);
        assert!(settle(&cancelled, 2, PaymentMethod::Tunai, 100_000.0, today()).is_err());
    }

    #[test]
    fn zero_total_orders_are_rejected() {
        let order = payable_order(OrderStatus::Selesai, 0.0);
        assert!(settle(&order, 2, PaymentMethod::Tunai, 10_000.0, today()).is_err());
    }
}
