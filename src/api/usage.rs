use chrono::{Datelike, Local, NaiveDate, Weekday};
use http::{
    Method,
    Request,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{Client, Session, response},
    error::ApiError,
    meter::{Meter, MeterType},
    prelude::*,
    transport::Transport,
};

/// Totals over the most recent billing cycle.
///
/// Figures of a fuel the account has no meter for are absent.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BillingInfo {
    #[serde(rename = "BillingDays")]
    pub billing_days: Option<u32>,

    #[serde(rename = "ElectricityUsed")]
    pub electricity_used: Option<f64>,

    #[serde(rename = "AvgElectricityUsed")]
    pub avg_electricity_used: Option<f64>,

    #[serde(rename = "GasUsed")]
    pub gas_used: Option<f64>,

    #[serde(rename = "AvgGasUsed")]
    pub avg_gas_used: Option<f64>,
}

/// Daily readings of one meter's fuel.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartUsage {
    pub unit: Option<String>,

    /// Oldest first.
    pub readings: Vec<f64>,
}

impl ChartUsage {
    /// The most recent reading, which is yesterday's.
    #[must_use]
    pub fn yesterday(&self) -> Option<f64> {
        self.readings.last().copied()
    }
}

#[derive(Deserialize)]
struct BillingPayload {
    #[serde(rename = "Data")]
    data: Vec<BillingInfo>,
}

#[derive(Deserialize)]
struct ChartPayload {
    #[serde(rename = "meterData")]
    meter_data: MeterData,

    #[serde(rename = "unitOfMeasure1", default)]
    unit_of_measure_1: Option<String>,

    #[serde(rename = "unitOfMeasure2", default)]
    unit_of_measure_2: Option<String>,
}

#[derive(Deserialize)]
struct MeterData {
    #[serde(rename = "Electric", default)]
    electric: Option<Vec<f64>>,

    #[serde(rename = "Gas", default)]
    gas: Option<Vec<f64>>,
}

#[derive(Serialize)]
struct BillingRequest<'a> {
    #[serde(rename = "MeterNumber")]
    meter_number: &'a str,
}

#[derive(Serialize)]
struct ChartRequest<'a> {
    #[serde(rename = "Graph")]
    graph: &'static str,

    #[serde(rename = "BillingFrequency")]
    billing_frequency: &'static str,

    #[serde(rename = "GraphText")]
    graph_text: &'static str,

    #[serde(rename = "Date")]
    date: String,

    #[serde(rename = "MeterNumber")]
    meter_number: &'a str,

    #[serde(rename = "ActiveDate")]
    active_date: &'a str,
}

/// Billing period figures: the last element of `Data` is the current period.
fn parse_billing_response(status: http::StatusCode, body: &[u8]) -> Result<BillingInfo, ApiError> {
    response::parse::<BillingPayload>(status, body)?
        .data
        .pop()
        .ok_or_else(|| ApiError::malformed("`Data` is empty"))
}

fn parse_chart_response(
    status: http::StatusCode,
    body: &[u8],
    kind: &MeterType,
) -> Result<ChartUsage, ApiError> {
    kind.ensure_supported()?;
    let payload = response::parse::<ChartPayload>(status, body)?;
    let readings = match kind {
        MeterType::Electric => payload.meter_data.electric,
        MeterType::Gas => payload.meter_data.gas,
        MeterType::Other(label) => return Err(ApiError::UnsupportedMeterType(label.clone())),
    }
    .ok_or_else(|| ApiError::malformed("no readings for the meter type in `meterData`"))?;
    let unit = [payload.unit_of_measure_1, payload.unit_of_measure_2]
        .into_iter()
        .flatten()
        .find(|unit| !unit.is_empty());
    Ok(ChartUsage { unit, readings })
}

/// Date to request the chart for.
///
/// The portal has not posted Sunday's data yet on Sunday itself, so Sundays ask for Saturday.
#[must_use]
pub fn chart_date(today: NaiveDate) -> NaiveDate {
    if today.weekday() == Weekday::Sun { today.pred_opt().unwrap_or(today) } else { today }
}

impl<T: Transport> Client<T> {
    const BILLING_PATH: &'static str = "api/UsageAnalysis/GetBillingInformation";
    const CHART_PATH: &'static str = "api/UsageAnalysis/GetUsageChartData";

    /// Fetch the current billing cycle totals.
    #[instrument(skip_all, fields(meter = %meter.number()))]
    pub fn fetch_billing(&self, session: &mut Session, meter: &Meter) -> Result<BillingInfo, ApiError> {
        meter.kind().ensure_supported()?;
        info!("fetching billing information…");
        let meter_number = meter.number();
        let (status, body) =
            self.post_json(session, Self::BILLING_PATH, &BillingRequest { meter_number: &meter_number })?;
        let billing = parse_billing_response(status, &body)?;
        debug!(?billing, "fetched");
        Ok(billing)
    }

    /// Fetch the daily usage chart of this week.
    #[instrument(skip_all, fields(meter = %meter.number()))]
    pub fn fetch_chart(&self, session: &mut Session, meter: &Meter) -> Result<ChartUsage, ApiError> {
        meter.kind().ensure_supported()?;
        let date = chart_date(Local::now().date_naive());
        info!(%date, "fetching usage chart…");
        let meter_number = meter.number();
        let request = ChartRequest {
            graph: "DailyEnergy",
            billing_frequency: "Week",
            graph_text: "Daily Energy and Avg. ",
            date: date.format("%m / %d / %Y").to_string(),
            meter_number: &meter_number,
            active_date: meter.start_date(),
        };
        let (status, body) = self.post_json(session, Self::CHART_PATH, &request)?;
        let chart = parse_chart_response(status, &body, meter.kind())?;
        debug!(n_readings = chart.readings.len(), yesterday = ?chart.yesterday(), unit = ?chart.unit, "fetched");
        Ok(chart)
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(path = path))]
    fn post_json(
        &self,
        session: &mut Session,
        path: &str,
        body: &impl Serialize,
    ) -> Result<(http::StatusCode, Vec<u8>), ApiError> {
        let body = serde_json::to_vec(body).map_err(ApiError::InvalidRequest)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.config().endpoint(path))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/plain, */*");
        let response = self.send(session, request, body)?;
        Ok((response.status(), response.into_body()))
    }
}
