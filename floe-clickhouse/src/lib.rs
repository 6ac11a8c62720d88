//! # floe-clickhouse
//!
//! ClickHouse driver for the Floe migration engine, over the HTTP
//! interface via the `clickhouse` crate.
//!
//! This crate provides:
//! - Connection configuration from a URL or a builder
//! - A thin client wrapper implementing `floe_migrate::Database`
//! - Ledger reads/appends against the `schema_versions` table
//! - `system.mutations` introspection for queued execution mode
//!
//! ## Example
//!
//! ```rust,ignore
//! use floe_clickhouse::{ChClient, ChConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ChConfig::from_url("clickhouse://default@localhost:8123/analytics")?;
//! ChClient::create_database(&config).await?;
//! let client = ChClient::connect(&config);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::ChClient;
pub use config::{ChConfig, ChConfigBuilder, DEFAULT_PORT};
pub use error::{ChError, ChResult};
