//! Order drafting.
//!
//! Mirrors the table-side cart: lines are keyed by menu item, re-adding an
//! item merges quantities, and a quantity of zero removes the line. The
//! insert payloads built here always satisfy `subtotal = quantity x unit
//! price`.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{MenuItem, OrderStatus};

/// One drafted line, keyed by menu item.
#[derive(Debug, Clone)]
pub struct DraftLine {
    pub menu: MenuItem,
    pub quantity: i64,
    pub note: Option<String>,
}

impl DraftLine {
    pub fn subtotal(&self) -> f64 {
        self.menu.price * self.quantity as f64
    }
}

/// A not-yet-submitted order for one table.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    pub table_number: String,
    lines: Vec<DraftLine>,
}

impl OrderDraft {
    pub fn new(table_number: impl Into<String>) -> Self {
        Self {
            table_number: table_number.into(),
            lines: Vec::new(),
        }
    }

    /// Add `quantity` of a menu item, merging into an existing line.
    /// Non-positive quantities are ignored.
    pub fn add_item(&mut self, menu: MenuItem, quantity: i64) {
        if quantity <= 0 {
            return;
        }
        match self.lines.iter_mut().find(|l| l.menu.id == menu.id) {
            Some(line) => line.quantity += quantity,
            None => self.lines.push(DraftLine {
                menu,
                quantity,
                note: None,
            }),
        }
    }

    /// Set a line's quantity outright; zero or less removes the line.
    pub fn set_quantity(&mut self, menu_id: i64, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(menu_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.menu.id == menu_id) {
            line.quantity = quantity;
        }
    }

    pub fn set_note(&mut self, menu_id: i64, note: impl Into<String>) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.menu.id == menu_id) {
            line.note = Some(note.into());
        }
    }

    pub fn remove_item(&mut self, menu_id: i64) {
        self.lines.retain(|l| l.menu.id != menu_id);
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(DraftLine::subtotal).sum()
    }

    /// Build the store insert payloads. Line items carry no order id yet;
    /// the client fills it in once the `order` row exists.
    pub fn into_payloads(self, user_id: i64, date: NaiveDate) -> (NewOrder, Vec<NewLineItem>) {
        let total = self.total();
        let items = self
            .lines
            .into_iter()
            .map(|line| NewLineItem {
                order_id: None,
                menu_id: line.menu.id,
                quantity: line.quantity,
                unit_price: line.menu.price,
                subtotal: line.menu.price * line.quantity as f64,
                note: line.note,
            })
            .collect();
        let order = NewOrder {
            table_number: self.table_number,
            date,
            user_id,
            status: OrderStatus::Pending,
            total,
        };
        (order, items)
    }
}

/// Insert payload for the `order` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    #[serde(rename = "no_meja")]
    pub table_number: String,
    #[serde(rename = "tanggal")]
    pub date: NaiveDate,
    #[serde(rename = "id_user")]
    pub user_id: i64,
    #[serde(rename = "status_order")]
    pub status: OrderStatus,
    #[serde(rename = "total_harga")]
    pub total: f64,
}

/// Insert payload for the `detail_order` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewLineItem {
    #[serde(rename = "id_order", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(rename = "id_masakan")]
    pub menu_id: i64,
    #[serde(rename = "jumlah")]
    pub quantity: i64,
    #[serde(rename = "harga_satuan")]
    pub unit_price: f64,
    #[serde(rename = "subtotal")]
    pub subtotal: f64,
    #[serde(rename = "keterangan", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ===========================================================================
// Tests
// ===========================================================================
