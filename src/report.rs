//! The report aggregator.
//!
//! One parameterised engine turns a date range plus fetched snapshots into
//! the overview totals, growth comparisons, and chart series every dashboard
//! page renders. Pages differ only in [`ReportOptions`]; there is exactly one
//! copy of each formula.
//!
//! Aggregation itself is pure: [`Snapshot::load`] does the fan-out/fan-in
//! fetching, [`aggregate`] only folds the rows it is given.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::dates::{short_label, ReportRange};
use crate::error::Result;
use crate::models::{Order, OrderLineItem, OrderStatus, PaymentMethod, Transaction};

// ---------------------------------------------------------------------------
// Fetch seam
// ---------------------------------------------------------------------------

/// Range-filtered reads the aggregator needs from the hosted store.
///
/// [`StoreClient`](crate::client::StoreClient) implements this against
/// PostgREST; tests implement it over in-memory vectors.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Orders whose `tanggal` falls in range.
    async fn fetch_orders(&self, range: ReportRange) -> Result<Vec<Order>>;

    /// Transactions whose `tanggal` falls in range, newest first.
    async fn fetch_transactions(&self, range: ReportRange) -> Result<Vec<Transaction>>;

    /// Line items whose parent order falls in range, joined with the menu
    /// item and the parent order's date and creation timestamp.
    async fn fetch_line_items(&self, range: ReportRange) -> Result<Vec<OrderLineItem>>;

    /// Newest orders regardless of range (dashboard passthrough table).
    async fn fetch_recent_orders(&self, limit: usize) -> Result<Vec<Order>>;

    /// Orders currently in any of the given statuses, newest first.
    async fn fetch_orders_with_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>>;
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Knobs the dashboard pages vary. Everything else is shared.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Menu-ranking size.
    pub top_n: usize,
    /// Inclusive hour-of-day window for the hourly series; `None` keeps all
    /// 24 buckets.
    pub hour_window: Option<(u32, u32)>,
    /// Emit a zero bucket for every day in range instead of only days that
    /// saw a transaction.
    pub dense_daily: bool,
    /// Carry the raw newest-first transaction list for detail tables.
    pub include_transactions: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: 5,
            hour_window: Some((8, 22)),
            dense_daily: false,
            include_transactions: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Headline totals plus growth versus the preceding equal-length period.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub total_transactions: u64,
    /// Revenue over *order* count (not transaction count); zero when the
    /// range has no orders.
    pub avg_order_value: f64,
    pub order_growth: f64,
    pub revenue_growth: f64,
    pub transaction_growth: f64,
    pub avg_order_growth: f64,
}

/// One point of the daily revenue series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: f64,
    /// id-ID short label for chart axes, e.g. `5 Agu`.
    pub label: String,
}

/// One hour-of-day bucket. `orders` counts line items, not orders: a
/// three-item order adds 3 to its hour, mirroring what the dashboards have
/// always displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBucket {
    pub hour: u32,
    pub label: String,
    pub orders: u64,
}

/// One row of the best-seller ranking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSales {
    pub menu_id: i64,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub revenue: f64,
}

/// Transaction counts per settlement method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaymentMethodBreakdown {
    pub tunai: u64,
    pub debit: u64,
    pub qris: u64,
}

impl PaymentMethodBreakdown {
    fn record(&mut self, method: PaymentMethod) {
        match method {
            PaymentMethod::Tunai => self.tunai += 1,
            PaymentMethod::Debit => self.debit += 1,
            PaymentMethod::Qris => self.qris += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.tunai + self.debit + self.qris
    }
}

/// Order counts per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub pending: u64,
    pub proses: u64,
    pub selesai: u64,
    pub dibatalkan: u64,
}

impl StatusBreakdown {
    fn record(&mut self, status: OrderStatus) {
        match status {
            OrderStatus::Pending => self.pending += 1,
            OrderStatus::Proses => self.proses += 1,
            OrderStatus::Selesai => self.selesai += 1,
            OrderStatus::Dibatalkan => self.dibatalkan += 1,
        }
    }
}

/// Everything a dashboard page needs for one reporting window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub range: ReportRange,
    pub overview: Overview,
    pub revenue_by_date: Vec<DailyRevenue>,
    pub hourly_orders: Vec<HourlyBucket>,
    pub top_menu: Vec<MenuSales>,
    pub payment_methods: PaymentMethodBreakdown,
    pub orders_by_status: StatusBreakdown,
    /// Newest-first detail rows; present only when
    /// [`ReportOptions::include_transactions`] is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
}

// ---------------------------------------------------------------------------
// Snapshot (fan-out / fan-in)
// ---------------------------------------------------------------------------

/// Raw rows for one reporting window plus its comparison window.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub orders: Vec<Order>,
    pub transactions: Vec<Transaction>,
    pub line_items: Vec<OrderLineItem>,
    pub prev_orders: Vec<Order>,
    pub prev_transactions: Vec<Transaction>,
}

impl Snapshot {
    /// Dispatch the five reads concurrently and join them all. Any failed
    /// read fails the whole snapshot; there are no partial results.
    pub async fn load<S>(source: &S, range: ReportRange) -> Result<Self>
    where
        S: ReportSource + ?Sized,
    {
        let prev = range.previous();
        let (orders, transactions, line_items, prev_orders, prev_transactions) = tokio::try_join!(
            source.fetch_orders(range),
            source.fetch_transactions(range),
            source.fetch_line_items(range),
            source.fetch_orders(prev),
            source.fetch_transactions(prev),
        )?;
        Ok(Self {
            orders,
            transactions,
            line_items,
            prev_orders,
            prev_transactions,
        })
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Percentage change versus the previous period. A zero previous period
/// reports 100 when anything was sold and 0 when both periods are empty.
pub fn growth(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Fetch and aggregate one report.
pub async fn generate<S>(source: &S, range: ReportRange, options: &ReportOptions) -> Result<Report>
where
    S: ReportSource + ?Sized,
{
    debug!(start = %range.start, end = %range.end, "generating report");
    let snapshot = Snapshot::load(source, range).await?;
    Ok(aggregate(range, &snapshot, options))
}

/// Fold a snapshot into a [`Report`]. Pure; never touches the store.
pub fn aggregate(range: ReportRange, snapshot: &Snapshot, options: &ReportOptions) -> Report {
    let overview = build_overview(snapshot);

    let mut orders_by_status = StatusBreakdown::default();
    for order in &snapshot.orders {
        orders_by_status.record(order.status);
    }

    let mut payment_methods = PaymentMethodBreakdown::default();
    for tx in &snapshot.transactions {
        payment_methods.record(tx.method);
    }

    let transactions = options.include_transactions.then(|| {
        let mut list = snapshot.transactions.clone();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    });

    Report {
        range,
        overview,
        revenue_by_date: revenue_by_date(range, &snapshot.transactions, options.dense_daily),
        hourly_orders: hourly_orders(&snapshot.line_items, options.hour_window),
        top_menu: top_menu(&snapshot.line_items, options.top_n),
        payment_methods,
        orders_by_status,
        transactions,
    }
}

fn build_overview(snapshot: &Snapshot) -> Overview {
    let total_orders = snapshot.orders.len() as u64;
    let total_transactions = snapshot.transactions.len() as u64;
    let total_revenue: f64 = snapshot.transactions.iter().map(|t| t.amount).sum();
    let avg_order_value = if total_orders > 0 {
        total_revenue / total_orders as f64
    } else {
        0.0
    };

    let prev_orders = snapshot.prev_orders.len() as u64;
    let prev_transactions = snapshot.prev_transactions.len() as u64;
    let prev_revenue: f64 = snapshot.prev_transactions.iter().map(|t| t.amount).sum();
    let prev_avg = if prev_orders > 0 {
        prev_revenue / prev_orders as f64
    } else {
        0.0
    };

    Overview {
        total_orders,
        total_revenue,
        total_transactions,
        avg_order_value,
        order_growth: growth(total_orders as f64, prev_orders as f64),
        revenue_growth: growth(total_revenue, prev_revenue),
        transaction_growth: growth(total_transactions as f64, prev_transactions as f64),
        avg_order_growth: growth(avg_order_value, prev_avg),
    }
}

/// Group transactions by their calendar date (`tanggal`), summing amounts.
/// Sparse by default; dense mode pre-seeds every day in range with zero.
fn revenue_by_date(
    range: ReportRange,
    transactions: &[Transaction],
    dense: bool,
) -> Vec<DailyRevenue> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    if dense {
        for day in range.iter_days() {
            by_date.insert(day, 0.0);
        }
    }
    for tx in transactions {
        *by_date.entry(tx.date).or_insert(0.0) += tx.amount;
    }
    by_date
        .into_iter()
        .map(|(date, revenue)| DailyRevenue {
            date,
            revenue,
            label: short_label(date),
        })
        .collect()
}

/// Count line items into the hour their parent order was created, then trim
/// to the display window. Items whose parent timestamp is missing are
/// skipped rather than guessed.
fn hourly_orders(line_items: &[OrderLineItem], window: Option<(u32, u32)>) -> Vec<HourlyBucket> {
    let mut counts = [0u64; 24];
    for item in line_items {
        if let Some(hour) = item.created_hour() {
            counts[hour as usize] += 1;
        }
    }
    let (lo, hi) = window.unwrap_or((0, 23));
    (0..24u32)
        .filter(|h| *h >= lo && *h <= hi)
        .map(|hour| HourlyBucket {
            hour,
            label: format!("{hour:02}:00"),
            orders: counts[hour as usize],
        })
        .collect()
}

/// Rank menu items by quantity sold. Ties break on revenue (descending),
/// then menu id, so equal quantities always land in the same order.
fn top_menu(line_items: &[OrderLineItem], top_n: usize) -> Vec<MenuSales> {
    let mut sales: HashMap<i64, MenuSales> = HashMap::new();
    for item in line_items {
        let entry = sales.entry(item.menu_id).or_insert_with(|| MenuSales {
            menu_id: item.menu_id,
            name: item
                .menu
                .as_ref()
                .map(|m| m.name.clone())
                .unwrap_or_else(|| format!("#{}", item.menu_id)),
            category: item.menu.as_ref().and_then(|m| m.category.clone()),
            quantity: 0,
            revenue: 0.0,
        });
        entry.quantity += item.quantity;
        entry.revenue += item.subtotal;
    }

    let mut ranked: Vec<MenuSales> = sales.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| {
                b.revenue
                    .partial_cmp(&a.revenue)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.menu_id.cmp(&b.menu_id))
    });
    ranked.truncate(top_n);
    ranked
}

// ===========================================================================
// Test support
// ===========================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory [`ReportSource`]: rows filtered the way PostgREST would
    /// filter them, plus a switchable failure mode.
    #[derive(Default)]
    pub struct InMemorySource {
        pub orders: Vec<Order>,
        pub transactions: Vec<Transaction>,
        pub line_items: Vec<OrderLineItem>,
        pub fail: AtomicBool,
        pub calls: AtomicUsize,
    }

    impl InMemorySource {
        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::Fetch("stub data service is offline".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ReportSource for InMemorySource {
        async fn fetch_orders(&self, range: ReportRange) -> Result<Vec<Order>> {
            self.check()?;
            Ok(self
                .orders
                .iter()
                .filter(|o| range.contains(o.date))
                .cloned()
                .collect())
        }

        async fn fetch_transactions(&self, range: ReportRange) -> Result<Vec<Transaction>> {
            self.check()?;
            Ok(self
                .transactions
                .iter()
                .filter(|t| range.contains(t.date))
                .cloned()
                .collect())
        }

        async fn fetch_line_items(&self, range: ReportRange) -> Result<Vec<OrderLineItem>> {
            self.check()?;
            Ok(self
                .line_items
                .iter()
                .filter(|i| i.order.as_ref().is_some_and(|o| range.contains(o.date)))
                .cloned()
                .collect())
        }

        async fn fetch_recent_orders(&self, limit: usize) -> Result<Vec<Order>> {
            self.check()?;
            let mut orders = self.orders.clone();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            orders.truncate(limit);
            Ok(orders)
        }

        async fn fetch_orders_with_status(
            &self,
            statuses: &[OrderStatus],
        ) -> Result<Vec<Order>> {
            self.check()?;
            let mut orders: Vec<Order> = self
                .orders
                .iter()
                .filter(|o| statuses.contains(&o.status))
                .cloned()
                .collect();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(orders)
        }
    }

    pub fn day(s: &str) -> NaiveDate {
        s.parse().expect("valid test date")
    }

    pub fn order(id: i64, date: &str, status: OrderStatus, total: f64, hour: u32) -> Order {
        Order {
            id,
            table_number: format!("M{id}"),
            date: day(date),
            user_id: 1,
            status,
            total,
            created_at: format!("{date}T{hour:02}:15:00+00:00"),
            user: None,
            line_items: None,
        }
    }

    pub fn tx(id: i64, date: &str, amount: f64, method: PaymentMethod) -> Transaction {
        Transaction {
            id,
            order_id: id,
            user_id: 2,
            date: day(date),
            amount,
            cash_received: None,
            change: None,
            method,
            created_at: format!("{date}T12:{:02}:00+00:00", id % 60),
            order: None,
            user: None,
        }
    }

    pub fn item(
        order_id: i64,
        menu_id: i64,
        name: &str,
        quantity: i64,
        subtotal: f64,
        date: &str,
        hour: u32,
    ) -> OrderLineItem {
        OrderLineItem {
            id: order_id * 100 + menu_id,
            order_id,
            menu_id,
            quantity,
            unit_price: if quantity > 0 {
                subtotal / quantity as f64
            } else {
                0.0
            },
            subtotal,
            note: None,
            menu: Some(crate::models::MenuItem {
                id: menu_id,
                name: name.to_string(),
                price: 0.0,
                category: Some("makanan".to_string()),
                availability: Some("tersedia".to_string()),
                description: None,
            }),
            order: Some(crate::models::ParentOrder {
                date: day(date),
                created_at: format!("{date}T{hour:02}:15:00+00:00"),
            }),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
