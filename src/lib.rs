//! resto-reports — reporting backend for a Supabase-backed restaurant POS
//! dashboard.
//!
//! The hosted store keeps four tables (`order`, `transaksi`, `detail_order`,
//! `masakan`); every role dashboard renders aggregations of them. This crate
//! owns those aggregations: one parameterised report engine
//! ([`report::aggregate`]) fed by a fan-out/fan-in snapshot load, the
//! PostgREST client behind it ([`client::StoreClient`]), the order and
//! payment write paths, and the refresh loop that keeps page state warm
//! without ever clearing good data on a failed fetch.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod logging;
pub mod models;
pub mod orders;
pub mod payments;
pub mod refresh;
pub mod report;

pub use client::StoreClient;
pub use config::StoreConfig;
pub use dates::ReportRange;
pub use error::{Error, Result};
pub use models::{MenuItem, Order, OrderLineItem, OrderStatus, PaymentMethod, Transaction};
pub use orders::OrderDraft;
pub use refresh::DisplayState;
pub use report::{aggregate, Report, ReportOptions, ReportSource, Snapshot};
