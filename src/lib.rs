//! Client for the Duke Energy usage analysis portal.
//!
//! The portal has no public API: this crate logs in with the account credentials, scrapes the meter
//! list off the usage analysis dashboard, and then calls the JSON endpoints the dashboard itself uses
//! for the billing summary and the daily usage chart.

pub mod api;
pub mod config;
pub mod error;
pub mod meter;
mod prelude;
pub mod transport;

pub use self::{
    api::{BillingInfo, ChartUsage, Client, Session},
    config::{Config, Credentials, UserAgent},
    error::{ApiError, AuthError, DiscoveryError, Error, TransportError},
    meter::{Meter, MeterType, Refresh},
    transport::{Transport, UreqTransport},
};
