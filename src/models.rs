//! Domain types over the hosted store's schema.
//!
//! Field names are idiomatic Rust; `#[serde(rename)]` maps them onto the
//! store's column names (`id_order`, `no_meja`, `tanggal`, ...) so the wire
//! format stays exactly what the dashboard pages already read.
//!
//! Money columns arrive inconsistently typed from the store (number, numeric
//! string, or null). The deserialisers here fold all of those into `f64` so a
//! single bad row can never blank a whole report.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Order status state machine
// ---------------------------------------------------------------------------

/// Lifecycle status of an order.
///
/// All status changes go through [`OrderStatus::transition`]; call sites
/// never assign raw status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Proses,
    Selesai,
    Dibatalkan,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Proses => "proses",
            OrderStatus::Selesai => "selesai",
            OrderStatus::Dibatalkan => "dibatalkan",
        }
    }

    /// Terminal statuses are immutable for reporting purposes.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Selesai | OrderStatus::Dibatalkan)
    }

    fn allows(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Proses) | (Pending, Dibatalkan) | (Proses, Selesai) | (Proses, Dibatalkan)
        )
    }

    /// Validate a status change.
    ///
    /// The kitchen flow is `pending -> proses -> selesai`; cancellation is
    /// allowed from any non-terminal status. Everything else (including
    /// reopening a finished order) is rejected.
    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, Error> {
        if self.allows(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payment method
// ---------------------------------------------------------------------------

/// How a transaction was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Tunai,
    Debit,
    Qris,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Tunai => "tunai",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Qris => "qris",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lenient numeric parsing
// ---------------------------------------------------------------------------

fn coerce_number(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Money column: number, numeric string, null, or absent all parse; null and
/// absent become zero.
fn money<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().map(coerce_number).unwrap_or(0.0))
}

/// Nullable money column: null stays `None` instead of zero.
fn opt_money<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().map(coerce_number))
}

/// Hour-of-day (0-23) read from the timestamp's own text (chars 11..13).
///
/// The store records wall-clock timestamps; slicing keeps the bucket on the
/// recorded hour, where converting through a local timezone could shift it
/// across a day boundary.
pub(crate) fn hour_of(timestamp: &str) -> Option<u32> {
    timestamp
        .get(11..13)
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|h| *h < 24)
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Reference data: one menu item (`masakan`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "id_masakan")]
    pub id: i64,
    #[serde(rename = "nama_masakan")]
    pub name: String,
    #[serde(rename = "harga", deserialize_with = "money", default)]
    pub price: f64,
    #[serde(rename = "kategori", default)]
    pub category: Option<String>,
    #[serde(rename = "status_masakan", default)]
    pub availability: Option<String>,
    #[serde(rename = "deskripsi", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Embedded `users:id_user(nama_user)` join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "nama_user")]
    pub name: String,
}

/// Embedded `order:id_order(no_meja)` join on a transaction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRef {
    #[serde(rename = "no_meja")]
    pub table_number: String,
}

/// A customer's placed order, tied to a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "id_order")]
    pub id: i64,
    #[serde(rename = "no_meja")]
    pub table_number: String,
    #[serde(rename = "tanggal")]
    pub date: NaiveDate,
    #[serde(rename = "id_user")]
    pub user_id: i64,
    #[serde(rename = "status_order")]
    pub status: OrderStatus,
    #[serde(rename = "total_harga", deserialize_with = "money", default)]
    pub total: f64,
    #[serde(default)]
    pub created_at: String,
    /// Present when the query embeds `users:id_user(nama_user)`.
    #[serde(rename = "users", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    /// Present when the query embeds `detail_order(...)`.
    #[serde(
        rename = "detail_order",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub line_items: Option<Vec<OrderLineItem>>,
}

impl Order {
    /// Hour-of-day the order was created, from the timestamp text.
    pub fn created_hour(&self) -> Option<u32> {
        hour_of(&self.created_at)
    }
}

/// Parent-order fields embedded into a line-item row via
/// `order!inner(tanggal, created_at)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentOrder {
    #[serde(rename = "tanggal")]
    pub date: NaiveDate,
    #[serde(default)]
    pub created_at: String,
}

/// One menu-item line within an order (`detail_order`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    #[serde(rename = "id_detail_order", default)]
    pub id: i64,
    #[serde(rename = "id_order")]
    pub order_id: i64,
    #[serde(rename = "id_masakan")]
    pub menu_id: i64,
    #[serde(rename = "jumlah")]
    pub quantity: i64,
    #[serde(rename = "harga_satuan", deserialize_with = "money", default)]
    pub unit_price: f64,
    #[serde(rename = "subtotal", deserialize_with = "money", default)]
    pub subtotal: f64,
    #[serde(rename = "keterangan", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "masakan", default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<MenuItem>,
    #[serde(rename = "order", default, skip_serializing_if = "Option::is_none")]
    pub order: Option<ParentOrder>,
}

impl OrderLineItem {
    /// Hour-of-day the parent order was created, when the join is present.
    pub fn created_hour(&self) -> Option<u32> {
        self.order.as_ref().and_then(|o| hour_of(&o.created_at))
    }
}

/// A recorded payment event settling one order (`transaksi`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "id_transaksi")]
    pub id: i64,
    #[serde(rename = "id_order")]
    pub order_id: i64,
    #[serde(rename = "id_user")]
    pub user_id: i64,
    #[serde(rename = "tanggal")]
    pub date: NaiveDate,
    #[serde(rename = "total_bayar", deserialize_with = "money", default)]
    pub amount: f64,
    #[serde(rename = "uang_diterima", deserialize_with = "opt_money", default)]
    pub cash_received: Option<f64>,
    #[serde(rename = "kembalian", deserialize_with = "opt_money", default)]
    pub change: Option<f64>,
    #[serde(rename = "metode_pembayaran")]
    pub method: PaymentMethod,
    #[serde(default)]
    pub created_at: String,
    #[serde(rename = "order", default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderRef>,
    #[serde(rename = "users", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_follow_kitchen_flow() {
        let status = OrderStatus::Pending;
        let status = status.transition(OrderStatus::Proses).expect("pending -> proses");
        let status = status.transition(OrderStatus::Selesai).expect("proses -> selesai");
        assert!(status.is_terminal());
    }

    #[test]
    fn cancellation_allowed_from_non_terminal_only() {
        assert!(OrderStatus::Pending.transition(OrderStatus::Dibatalkan).is_ok());
        assert!(OrderStatus::Proses.transition(OrderStatus::Dibatalkan).is_ok());
        assert!(OrderStatus::Selesai.transition(OrderStatus::Dibatalkan).is_err());
        assert!(OrderStatus::Dibatalkan.transition(OrderStatus::Dibatalkan).is_err());
    }

    #[test]
    fn finished_orders_cannot_reopen() {
        let err = OrderStatus::Selesai
            .transition(OrderStatus::Pending)
            .expect_err("selesai -> pending must be rejected");
        assert!(err.to_string().contains("selesai"));
        assert!(err.to_string().contains("pending"));
    }

    #[test]
    fn skipping_the_kitchen_is_rejected() {
        assert!(OrderStatus::Pending.transition(OrderStatus::Selesai).is_err());
    }

    #[test]
    fn money_fields_tolerate_strings_and_null() {
        let rows = serde_json::json!([
            { "id_transaksi": 1, "id_order": 1, "id_user": 2, "tanggal": "2024-08-01",
              "total_bayar": 50000, "metode_pembayaran": "tunai" },
            { "id_transaksi": 2, "id_order": 2, "id_user": 2, "tanggal": "2024-08-01",
              "total_bayar": "30000.50", "metode_pembayaran": "debit" },
            { "id_transaksi": 3, "id_order": 3, "id_user": 2, "tanggal": "2024-08-01",
              "total_bayar": null, "metode_pembayaran": "qris" },
        ]);
        let parsed: Vec<Transaction> = serde_json::from_value(rows).expect("rows should parse");
        assert_eq!(parsed[0].amount, 50000.0);
        assert_eq!(parsed[1].amount, 30000.5);
        assert_eq!(parsed[2].amount, 0.0);
        assert_eq!(parsed[2].cash_received, None);
    }

    #[test]
    fn hour_of_reads_timestamp_text() {
        assert_eq!(hour_of("2024-08-01T09:30:00+00:00"), Some(9));
        assert_eq!(hour_of("2024-08-01 21:05:12"), Some(21));
        assert_eq!(hour_of("2024-08-01"), None);
        assert_eq!(hour_of("not a timestamp at all"), None);
    }

    #[test]
    fn order_row_parses_with_embedded_joins() {
        let row = serde_json::json!({
            "id_order": 17,
            "no_meja": "A3",
            "tanggal": "2024-08-05",
            "id_user": 4,
            "status_order": "proses",
            "total_harga": "125000",
            "created_at": "2024-08-05T12:41:09.123+00:00",
            "users": { "nama_user": "Sari" },
            "detail_order": [
                { "id_detail_order": 1, "id_order": 17, "id_masakan": 9,
                  "jumlah": 2, "harga_satuan": 25000, "subtotal": 50000 }
            ]
        });
        let order: Order = serde_json::from_value(row).expect("order row should parse");
        assert_eq!(order.status, OrderStatus::Proses);
        assert_eq!(order.total, 125000.0);
        assert_eq!(order.created_hour(), Some(12));
        assert_eq!(order.user.as_ref().map(|u| u.name.as_str()), Some("Sari"));
        assert_eq!(order.line_items.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn enums_serialize_to_wire_vocabulary() {
        assert_eq!(
            serde_json::to_value(OrderStatus::Dibatalkan).unwrap(),
            serde_json::json!("dibatalkan")
        );
        assert_eq!(
            serde_json::to_value(PaymentMethod::Qris).unwrap(),
            serde_json::json!("qris")
        );
    }
}
