#![forbid(unsafe_code)]

mod cli;
pub mod client;
mod config;
pub mod credentials;
pub mod error;
pub mod history;
mod logging;
pub mod params;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use cli::run;
pub use client::{NewUser, Trackobot};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use history::{HistoryPage, PageMeta, collect_pages};
pub use params::{Hero, MetadataField, ResetMode, StatsMode, StatsQuery, StatsType, TimeRange};
pub use transport::{ApiRequest, ApiResponse, Transport, UreqTransport};
