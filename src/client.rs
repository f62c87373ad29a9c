//! Hosted data-store client (PostgREST).
//!
//! All dashboard reads and writes go through [`StoreClient`]: range-filtered
//! selects with embedded joins for the aggregator, plus the order and
//! transaction write paths. Date filters are plain `YYYY-MM-DD` comparisons
//! on the `tanggal` column, so the store compares calendar dates and a
//! viewer's timezone never shifts a boundary.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{StoreConfig, REQUEST_TIMEOUT};
use crate::dates::ReportRange;
use crate::error::{Error, Result};
use crate::models::{Order, OrderLineItem, OrderStatus, PaymentMethod, Transaction};
use crate::orders::OrderDraft;
use crate::payments;
use crate::report::ReportSource;

/// Select list for transaction reads: the row plus the joins the detail
/// table renders (table number, cashier name).
const TRANSACTION_SELECT: &str = "*,order:id_order(no_meja),users:id_user(nama_user)";

/// Select list for line-item reads: the row, its menu item, and the parent
/// order fields the hourly series needs.
const LINE_ITEM_SELECT: &str = "*,masakan(*),order!inner(tanggal,created_at)";

/// Select list for order passthrough tables (waiter board, cashier queue).
const ORDER_LIST_SELECT: &str = "*,users:id_user(nama_user),detail_order(*,masakan(*))";

pub struct StoreClient {
    http: Client,
    config: StoreConfig,
}

impl StoreClient {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    fn table_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url> {
        let base = self.config.url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/rest/v1/{table}"))
            .map_err(|e| Error::Config(format!("invalid service URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.config.anon_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.anon_key),
            )
            .header("Content-Type", "application/json")
    }

    async fn read_rows<T>(&self, resp: reqwest::Response) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Fetch(friendly_error(&self.config.url, &e)))?;
        if !status.is_success() {
            return Err(service_error(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str::<Vec<T>>(&body)?)
    }

    async fn get_rows<T>(&self, table: &str, params: &[(&str, String)]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.table_url(table, params)?;
        debug!(%url, "data service GET");
        let resp = self
            .authed(self.http.get(url))
            .send()
            .await
            .map_err(|e| Error::Fetch(friendly_error(&self.config.url, &e)))?;
        self.read_rows(resp).await
    }

    async fn post_rows<T, B>(&self, table: &str, body: &B) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, &[])?;
        debug!(%url, "data service POST");
        let resp = self
            .authed(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Fetch(friendly_error(&self.config.url, &e)))?;
        self.read_rows(resp).await
    }

    async fn patch_rows<T, B>(
        &self,
        table: &str,
        params: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, params)?;
        debug!(%url, "data service PATCH");
        let resp = self
            .authed(self.http.patch(url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Fetch(friendly_error(&self.config.url, &e)))?;
        self.read_rows(resp).await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn orders_in_range(&self, range: ReportRange) -> Result<Vec<Order>> {
        self.get_rows("order", &range_params("*", range)).await
    }

    pub async fn transactions_in_range(&self, range: ReportRange) -> Result<Vec<Transaction>> {
        let mut params = range_params(TRANSACTION_SELECT, range);
        params.push(("order", "created_at.desc".to_string()));
        self.get_rows("transaksi", &params).await
    }

    pub async fn line_items_in_range(&self, range: ReportRange) -> Result<Vec<OrderLineItem>> {
        self.get_rows("detail_order", &line_item_params(range))
            .await
    }

    pub async fn recent_orders(&self, limit: usize) -> Result<Vec<Order>> {
        let params = vec![
            ("select", "*,users:id_user(nama_user)".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_rows("order", &params).await
    }

    pub async fn orders_with_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>> {
        let params = vec![
            ("select", ORDER_LIST_SELECT.to_string()),
            ("status_order", status_filter(statuses)),
            ("order", "created_at.desc".to_string()),
        ];
        self.get_rows("order", &params).await
    }

    /// One transaction with its table join, for the guest receipt view.
    pub async fn transaction_by_id(&self, transaction_id: i64) -> Result<Transaction> {
        let params = vec![
            ("select", TRANSACTION_SELECT.to_string()),
            ("id_transaksi", format!("eq.{transaction_id}")),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<Transaction> = self.get_rows("transaksi", &params).await?;
        rows.into_iter().next().ok_or_else(|| Error::Fetch(format!(
            "transaction {transaction_id} not found"
        )))
    }

    async fn order_by_id(&self, order_id: i64) -> Result<Order> {
        let params = vec![
            ("select", "*".to_string()),
            ("id_order", format!("eq.{order_id}")),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<Order> = self.get_rows("order", &params).await?;
        rows.into_iter()
            .next()
            .ok_or(Error::OrderNotFound(order_id))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Advance an order's status through the state machine.
    ///
    /// Reads the current row first; an invalid transition never reaches the
    /// store.
    pub async fn update_order_status(&self, order_id: i64, next: OrderStatus) -> Result<Order> {
        let current = self.order_by_id(order_id).await?;
        let next = current.status.transition(next)?;

        let params = vec![("id_order", format!("eq.{order_id}"))];
        let updated: Vec<Order> = self
            .patch_rows("order", &params, &serde_json::json!({ "status_order": next }))
            .await?;
        let updated = updated
            .into_iter()
            .next()
            .ok_or(Error::OrderNotFound(order_id))?;
        info!(order_id, status = %updated.status, "order status updated");
        Ok(updated)
    }

    /// Submit a drafted order: insert the `order` row, then its
    /// `detail_order` rows keyed to the new id.
    pub async fn create_order(
        &self,
        draft: OrderDraft,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Order> {
        if draft.is_empty() {
            return Err(Error::EmptyDraft);
        }
        let (new_order, mut items) = draft.into_payloads(user_id, date);
        let created: Vec<Order> = self.post_rows("order", &new_order).await?;
        let created = created
            .into_iter()
            .next()
            .ok_or_else(|| Error::Fetch("data service returned no order row".into()))?;

        for item in &mut items {
            item.order_id = Some(created.id);
        }
        let _: Vec<OrderLineItem> = self.post_rows("detail_order", &items).await?;
        info!(order_id = created.id, total = created.total, "order created");
        Ok(created)
    }

    /// Settle an order and record the `transaksi` row.
    pub async fn settle_order(
        &self,
        order: &Order,
        cashier_id: i64,
        method: PaymentMethod,
        amount_received: f64,
        date: NaiveDate,
    ) -> Result<Transaction> {
        let payload = payments::settle(order, cashier_id, method, amount_received, date)?;
        let rows: Vec<Transaction> = self.post_rows("transaksi", &payload).await?;
        let recorded = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::Fetch("data service returned no transaction row".into()))?;
        info!(
            order_id = order.id,
            transaction_id = recorded.id,
            method = %method,
            "payment recorded"
        );
        Ok(recorded)
    }
}

#[async_trait]
impl ReportSource for StoreClient {
    async fn fetch_orders(&self, range: ReportRange) -> Result<Vec<Order>> {
        self.orders_in_range(range).await
    }

    async fn fetch_transactions(&self, range: ReportRange) -> Result<Vec<Transaction>> {
        self.transactions_in_range(range).await
    }

    async fn fetch_line_items(&self, range: ReportRange) -> Result<Vec<OrderLineItem>> {
        self.line_items_in_range(range).await
    }

    async fn fetch_recent_orders(&self, limit: usize) -> Result<Vec<Order>> {
        self.recent_orders(limit).await
    }

    async fn fetch_orders_with_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>> {
        self.orders_with_status(statuses).await
    }
}

// ---------------------------------------------------------------------------
// Query building
// ---------------------------------------------------------------------------

/// Range filter on the row's own `tanggal` column.
fn range_params(select: &str, range: ReportRange) -> Vec<(&'static str, String)> {
    vec![
        ("select", select.to_string()),
        ("tanggal", format!("gte.{}", range.start)),
        ("tanggal", format!("lte.{}", range.end)),
    ]
}

/// Range filter on the embedded parent order's `tanggal`, for `detail_order`.
fn line_item_params(range: ReportRange) -> Vec<(&'static str, String)> {
    vec![
        ("select", LINE_ITEM_SELECT.to_string()),
        ("order.tanggal", format!("gte.{}", range.start)),
        ("order.tanggal", format!("lte.{}", range.end)),
    ]
}

fn status_filter(statuses: &[OrderStatus]) -> String {
    let list: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    format!("in.({})", list.join(","))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("cannot reach data service at {url}");
    }
    if err.is_timeout() {
        return format!("request to {url} timed out");
    }
    if err.is_builder() {
        return format!("invalid data service URL: {url}");
    }
    format!("network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_text(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "anon key is invalid or expired".to_string(),
        403 => "access denied by the data service".to_string(),
        404 => "data service endpoint not found".to_string(),
        s if s >= 500 => format!("data service error (HTTP {s})"),
        s => format!("unexpected response from data service (HTTP {s})"),
    }
}

/// Build a [`Error::Service`], preferring the PostgREST error message from
/// the response body when one is present.
fn service_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| status_text(status));
    Error::Service {
        status: status.as_u16(),
        message,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("valid test date")
    }

    fn test_client() -> StoreClient {
        let config = StoreConfig::new("https://abc.supabase.co", "anon-key").unwrap();
        StoreClient::new(config).expect("client should build")
    }

    #[test]
    fn range_params_use_plain_calendar_dates() {
        let range = ReportRange::new(day("2024-08-01"), day("2024-08-31")).unwrap();
        let params = range_params("*", range);
        assert_eq!(params[1], ("tanggal", "gte.2024-08-01".to_string()));
        assert_eq!(params[2], ("tanggal", "lte.2024-08-31".to_string()));
    }

    #[test]
    fn line_item_params_filter_on_the_parent_order() {
        let range = ReportRange::single_day(day("2024-08-05"));
        let params = line_item_params(range);
        assert_eq!(params[0].1, LINE_ITEM_SELECT);
        assert_eq!(params[1], ("order.tanggal", "gte.2024-08-05".to_string()));
        assert_eq!(params[2], ("order.tanggal", "lte.2024-08-05".to_string()));
    }

    #[test]
    fn status_filter_builds_postgrest_in_list() {
        assert_eq!(
            status_filter(&[OrderStatus::Pending, OrderStatus::Proses]),
            "in.(pending,proses)"
        );
    }

    #[test]
    fn table_url_appends_rest_path_and_query() {
        let client = test_client();
        let url = client
            .table_url("transaksi", &[("select", "*".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/transaksi?select=*"
        );
    }

    #[test]
    fn service_error_prefers_body_message() {
        let err = service_error(
            StatusCode::BAD_REQUEST,
            r#"{"message": "invalid input syntax for type date"}"#,
        );
        match err {
            Error::Service { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid input syntax for type date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn service_error_falls_back_to_status_text() {
        let err = service_error(StatusCode::UNAUTHORIZED, "not json");
        assert_eq!(err.to_string(), "anon key is invalid or expired (HTTP 401)");
    }

    #[test]
    fn server_errors_keep_the_status_code_visible() {
        assert_eq!(
            status_text(StatusCode::BAD_GATEWAY),
            "data service error (HTTP 502)"
        );
    }
}
