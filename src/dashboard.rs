//! Role-dashboard summaries.
//!
//! Every page is a thin parameterisation of the one report engine plus,
//! where the page shows one, a passthrough list fetch. No page carries its
//! own copy of a formula.

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::ReportRange;
use crate::error::Result;
use crate::models::{Order, OrderStatus};
use crate::report::{self, Report, ReportOptions, ReportSource};

/// Rows shown in "recent orders" tables.
const RECENT_ORDERS_LIMIT: usize = 5;

/// Admin report page (`laporan`): arbitrary range with the detail table.
pub async fn admin_report<S>(source: &S, range: ReportRange, top_n: usize) -> Result<Report>
where
    S: ReportSource + ?Sized,
{
    let options = ReportOptions {
        top_n,
        include_transactions: true,
        ..ReportOptions::default()
    };
    report::generate(source, range, &options).await
}

/// Admin landing page: today's numbers against yesterday, the week trend,
/// and the newest orders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminHome {
    /// Single-day report; its previous period is yesterday, which is where
    /// the "vs kemarin" growth badges come from.
    pub today: Report,
    /// Dense last-7-days report for the trend charts.
    pub week: Report,
    pub pending_orders: u64,
    pub recent_orders: Vec<Order>,
}

pub async fn admin_home<S>(source: &S, today: NaiveDate) -> Result<AdminHome>
where
    S: ReportSource + ?Sized,
{
    let today_report = report::generate(
        source,
        ReportRange::single_day(today),
        &ReportOptions::default(),
    )
    .await?;
    let week = report::generate(
        source,
        ReportRange::last_n_days(today, 7),
        &ReportOptions {
            dense_daily: true,
            ..ReportOptions::default()
        },
    )
    .await?;
    let recent_orders = source.fetch_recent_orders(RECENT_ORDERS_LIMIT).await?;
    let pending_orders = today_report.orders_by_status.pending;
    Ok(AdminHome {
        today: today_report,
        week,
        pending_orders,
        recent_orders,
    })
}

/// Owner landing page: month-to-date performance plus the week trend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerHome {
    pub month: Report,
    pub week: Report,
}

pub async fn owner_home<S>(source: &S, today: NaiveDate) -> Result<OwnerHome>
where
    S: ReportSource + ?Sized,
{
    let month = report::generate(
        source,
        ReportRange::month_to_date(today),
        &ReportOptions::default(),
    )
    .await?;
    let week = report::generate(
        source,
        ReportRange::last_n_days(today, 7),
        &ReportOptions {
            dense_daily: true,
            ..ReportOptions::default()
        },
    )
    .await?;
    Ok(OwnerHome { month, week })
}

/// Cashier landing page: today's numbers plus the queue of orders waiting
/// to be paid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashierHome {
    pub today: Report,
    pub awaiting_payment: Vec<Order>,
}

pub async fn cashier_home<S>(source: &S, today: NaiveDate) -> Result<CashierHome>
where
    S: ReportSource + ?Sized,
{
    let today_report = report::generate(
        source,
        ReportRange::single_day(today),
        &ReportOptions::default(),
    )
    .await?;
    let awaiting_payment = source
        .fetch_orders_with_status(&[OrderStatus::Proses, OrderStatus::Selesai])
        .await?;
    Ok(CashierHome {
        today: today_report,
        awaiting_payment,
    })
}

/// Waiter board: the active orders, newest first, with per-status counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiterBoard {
    pub orders: Vec<Order>,
    pub total: u64,
    pub pending: u64,
    pub proses: u64,
}

pub async fn waiter_board<S>(source: &S) -> Result<WaiterBoard>
where
    S: ReportSource + ?Sized,
{
    let orders = source
        .fetch_orders_with_status(&[OrderStatus::Pending, OrderStatus::Proses])
        .await?;
    let pending = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Pending)
        .count() as u64;
    let proses = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Proses)
        .count() as u64;
    Ok(WaiterBoard {
        total: orders.len() as u64,
        pending,
        proses,
        orders,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod::*;
    use crate::report::testing::{day, item, order, tx, InMemorySource};

    fn seeded_source() -> InMemorySource {
        InMemorySource {
            orders: vec![
                order(1, "2024-08-07", OrderStatus::Pending, 30_000.0, 9),
                order(2, "2024-08-07", OrderStatus::Proses, 45_000.0, 10),
                order(3, "2024-08-07", OrderStatus::Selesai, 60_000.0, 11),
                order(4, "2024-08-06", OrderStatus::Selesai, 80_000.0, 19),
                order(5, "2024-07-28", OrderStatus::Selesai, 55_000.0, 13),
            ],
            transactions: vec![
                tx(1, "2024-08-07", 60_000.0, Tunai),
                tx(2, "2024-08-06", 30_000.0, Debit),
                tx(3, "2024-07-28", 55_000.0, Qris),
            ],
            line_items: vec![
                item(3, 101, "Nasi Goreng", 2, 50_000.0, "2024-08-07", 11),
                item(4, 102, "Sate Ayam", 1, 30_000.0, "2024-08-06", 19),
            ],
            ..InMemorySource::default()
        }
    }

    #[tokio::test]
    async fn admin_home_compares_today_against_yesterday() {
        let source = seeded_source();
        let home = admin_home(&source, day("2024-08-07")).await.unwrap();

        assert_eq!(home.today.overview.total_revenue, 60_000.0);
        // yesterday took 30k, today 60k
        assert_eq!(home.today.overview.revenue_growth, 100.0);
        assert_eq!(home.pending_orders, 1);
        assert_eq!(home.recent_orders.len(), 5);
        // newest first
        assert_eq!(home.recent_orders[0].id, 3);
    }

    #[tokio::test]
    async fn admin_home_week_trend_is_dense() {
        let source = seeded_source();
        let home = admin_home(&source, day("2024-08-07")).await.unwrap();
        assert_eq!(home.week.revenue_by_date.len(), 7);
        let week_sum: f64 = home.week.revenue_by_date.iter().map(|d| d.revenue).sum();
        // only the two August transactions fall in the window
        assert_eq!(week_sum, 90_000.0);
    }

    #[tokio::test]
    async fn owner_home_limits_totals_to_the_month() {
        let source = seeded_source();
        let home = owner_home(&source, day("2024-08-07")).await.unwrap();
        // the July transaction is outside month-to-date
        assert_eq!(home.month.overview.total_revenue, 90_000.0);
        assert_eq!(home.month.top_menu.len(), 2);
        assert_eq!(home.month.top_menu[0].name, "Nasi Goreng");
    }

    #[tokio::test]
    async fn cashier_home_lists_orders_awaiting_payment() {
        let source = seeded_source();
        let home = cashier_home(&source, day("2024-08-07")).await.unwrap();
        assert_eq!(home.awaiting_payment.len(), 4);
        assert!(home
            .awaiting_payment
            .iter()
            .all(|o| matches!(o.status, OrderStatus::Proses | OrderStatus::Selesai)));
    }

    #[tokio::test]
    async fn waiter_board_counts_active_statuses() {
        let source = seeded_source();
        let board = waiter_board(&source).await.unwrap();
        assert_eq!(board.total, 2);
        assert_eq!(board.pending, 1);
        assert_eq!(board.proses, 1);
        assert_eq!(board.orders.len(), 2);
    }

    #[tokio::test]
    async fn page_summaries_propagate_fetch_failures() {
        let source = seeded_source();
        source.set_fail(true);
        assert!(admin_home(&source, day("2024-08-07")).await.is_err());
        assert!(cashier_home(&source, day("2024-08-07")).await.is_err());
        assert!(waiter_board(&source).await.is_err());
    }
}
