//! `tradier-http` is an async HTTP client for the Tradier brokerage API.
//!
//! The interesting part is the request executor underneath the endpoint
//! methods:
//! - structured API faults are returned at once, never retried;
//! - transport failures back off exponentially;
//! - plain-text "Quota Violation" rejections wait until the embedded expiry;
//! - time-series requests rejected as too large are bisected and merged.
//!
//! Entry point: [`TradierClient`].

mod backoff;
pub mod classify;
mod client;
mod error;
pub mod executor;
pub mod normalize;
mod observe;
mod options;
pub mod order;
pub mod split;
pub mod time;
mod types;

pub use backoff::ExponentialBackoff;
pub use classify::{Fault, RateLimit};
pub use client::{Interval, TradierClient};
pub use error::TradierError;
pub use executor::{ApiResponse, Form, RequestExecutor};
pub use normalize::{one_or_many, OneOrMany};
pub use observe::{RetryObserver, TracingObserver};
pub use options::{BackoffOptions, ClientOptions, API_ENDPOINT, SANDBOX_ENDPOINT};
pub use order::{OrderChange, OrderClass, OrderDuration, OrderLeg, OrderRequest, OrderSide, OrderType};
pub use split::TimeRange;
pub use time::{parse_timestamp, Timestamp};
pub use types::{
    AccountBalances, ClosedPosition, Event, MarketCalendar, MarketStatus, Order, OrderPreview,
    Position, Quote, SessionHours, StreamSession, TimeSale,
};

pub type Result<T> = std::result::Result<T, TradierError>;
