mod auth;
mod client;
mod discovery;
mod response;
mod usage;

pub use self::{
    auth::Session,
    client::Client,
    usage::{BillingInfo, ChartUsage, chart_date},
};
