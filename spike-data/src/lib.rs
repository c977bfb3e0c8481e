#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Spike-Data
//! Normalised REST integration for a volume spike feed. Provides:
//! * The wire data model ([`SpikeRecord`](model::SpikeRecord), [`SpikesPage`](model::SpikesPage)).
//! * Strongly typed query parameters ([`SpikeFilters`](query::SpikeFilters),
//!   [`SpikeQuery`](query::SpikeQuery)).
//! * An async `reqwest` client and the [`SpikeSource`](client::SpikeSource) seam it implements.
//!
//! The deduplication identity used by notifiers lives here as well:
//! [`SpikeIdentity`](model::SpikeIdentity).

/// All [`Error`](std::error::Error)s generated in Spike-Data.
pub mod error;

/// Records returned by the spike API.
pub mod model;

/// Filter and query parameters for `GET /spikes`.
pub mod query;

/// HTTP client and the [`SpikeSource`](client::SpikeSource) trait.
pub mod client;

pub use client::{ApiConfig, SpikeApiClient, SpikeSource};
pub use error::DataError;
pub use model::{SpikeIdentity, SpikeRecord, SpikesPage, SymbolsResponse};
pub use query::{DateOption, Segment, SortBy, SortOrder, SpikeFilters, SpikeQuery};
