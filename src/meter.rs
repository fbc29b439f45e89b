use chrono::{DateTime, Local, TimeDelta};

use crate::{
    api::{BillingInfo, ChartUsage, Client},
    error::{ApiError, Error},
    prelude::*,
    transport::Transport,
};

/// Kind of service point, as spelled in the portal's meter labels.
#[derive(Clone, Debug, Eq, Hash, PartialEq, derive_more::Display)]
pub enum MeterType {
    #[display("ELECTRIC")]
    Electric,

    #[display("GAS")]
    Gas,

    /// Anything else the portal lists. Such meters are kept, but cannot be fetched.
    #[display("{_0}")]
    Other(String),
}

impl From<&str> for MeterType {
    fn from(label: &str) -> Self {
        match label {
            "ELECTRIC" => Self::Electric,
            "GAS" => Self::Gas,
            _ => Self::Other(label.to_owned()),
        }
    }
}

impl MeterType {
    pub fn ensure_supported(&self) -> Result<(), ApiError> {
        match self {
            Self::Electric | Self::Gas => Ok(()),
            Self::Other(label) => Err(ApiError::UnsupportedMeterType(label.clone())),
        }
    }
}

/// Outcome of [`Meter::update`].
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Refresh {
    /// The cooldown has not passed yet, nothing was fetched.
    Skipped,

    /// Fresh billing and chart data were applied.
    Updated,
}

/// Usage figures of the meter's own fuel.
#[derive(Clone, Debug, Default, PartialEq)]
struct Usage {
    total: Option<f64>,
    average: Option<f64>,
    yesterday: Option<f64>,
}

/// Single utility service point with its last known statistics.
#[derive(Clone, Debug)]
pub struct Meter {
    kind: MeterType,
    id: String,
    start_date: String,
    update_interval: TimeDelta,
    last_update_time: Option<DateTime<Local>>,
    billing_days: Option<u32>,
    usage: Usage,
    unit: Option<String>,
}

impl Meter {
    pub const MIN_UPDATE_INTERVAL_MINUTES: u32 = 10;

    /// The update interval is clamped to at least [`Self::MIN_UPDATE_INTERVAL_MINUTES`].
    #[must_use]
    pub fn new(
        kind: MeterType,
        id: impl Into<String>,
        start_date: impl Into<String>,
        update_interval_minutes: u32,
    ) -> Self {
        let update_interval_minutes =
            update_interval_minutes.max(Self::MIN_UPDATE_INTERVAL_MINUTES);
        Self {
            kind,
            id: id.into(),
            start_date: start_date.into(),
            update_interval: TimeDelta::minutes(i64::from(update_interval_minutes)),
            last_update_time: None,
            billing_days: None,
            usage: Usage::default(),
            unit: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &MeterType {
        &self.kind
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Calendar start date, verbatim as the portal returned it.
    #[must_use]
    pub fn start_date(&self) -> &str {
        &self.start_date
    }

    /// The `<TYPE> - <ID>` label the portal identifies the meter with.
    #[must_use]
    pub fn number(&self) -> String {
        format!("{} - {}", self.kind, self.id)
    }

    #[must_use]
    pub const fn update_interval(&self) -> TimeDelta {
        self.update_interval
    }

    #[must_use]
    pub const fn last_update_time(&self) -> Option<DateTime<Local>> {
        self.last_update_time
    }

    /// Whether the cooldown has passed at `now`. A meter that was never updated is always due.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        self.last_update_time.is_none_or(|last_update_time| now - last_update_time >= self.update_interval)
    }

    /// Yesterday's usage.
    pub fn usage(&self) -> Result<Option<f64>, ApiError> {
        self.kind.ensure_supported()?;
        Ok(self.usage.yesterday)
    }

    /// Average daily usage over the last billing cycle.
    pub fn average(&self) -> Result<Option<f64>, ApiError> {
        self.kind.ensure_supported()?;
        Ok(self.usage.average)
    }

    /// Total usage over the last billing cycle.
    pub fn total(&self) -> Result<Option<f64>, ApiError> {
        self.kind.ensure_supported()?;
        Ok(self.usage.total)
    }

    pub fn days_billed(&self) -> Result<Option<u32>, ApiError> {
        self.kind.ensure_supported()?;
        Ok(self.billing_days)
    }

    pub fn unit(&self) -> Result<Option<&str>, ApiError> {
        self.kind.ensure_supported()?;
        Ok(self.unit.as_deref())
    }

    /// Take the billing cycle figures of this meter's fuel.
    pub fn set_billing_usage(&mut self, billing: &BillingInfo) -> Result<(), ApiError> {
        let (total, average) = match &self.kind {
            MeterType::Electric => (billing.electricity_used, billing.avg_electricity_used),
            MeterType::Gas => (billing.gas_used, billing.avg_gas_used),
            MeterType::Other(label) => return Err(ApiError::UnsupportedMeterType(label.clone())),
        };
        self.billing_days = billing.billing_days;
        self.usage.total = total;
        self.usage.average = average;
        Ok(())
    }

    /// Take the unit and the most recent daily reading.
    ///
    /// An empty series keeps the previous reading.
    pub fn set_chart_usage(&mut self, chart: &ChartUsage) -> Result<(), ApiError> {
        self.kind.ensure_supported()?;
        if let Some(unit) = &chart.unit {
            self.unit = Some(unit.clone());
        }
        if let Some(yesterday) = chart.yesterday() {
            self.usage.yesterday = Some(yesterday);
        }
        Ok(())
    }

    /// Fetch fresh statistics through `client`, unless the cooldown has not passed and not `force`.
    ///
    /// On failure the previously cached statistics stay as they were.
    #[instrument(skip_all, fields(meter = %self.number(), force = force))]
    pub fn update<T: Transport>(&mut self, client: &Client<T>, force: bool) -> Result<Refresh, Error> {
        let now = Local::now();
        if !force && !self.is_due(now) {
            trace!("cooling down");
            return Ok(Refresh::Skipped);
        }
        self.kind.ensure_supported()?;

        info!("updating…");
        self.last_update_time = Some(now);
        let mut session = client.login()?;
        let fetched = client
            .fetch_billing(&mut session, self)
            .and_then(|billing| Ok((billing, client.fetch_chart(&mut session, self)?)));
        client.logout(session);
        let (billing, chart) = fetched?;

        self.set_billing_usage(&billing)?;
        self.set_chart_usage(&chart)?;
        info!(total = ?self.usage.total, yesterday = ?self.usage.yesterday, unit = ?self.unit, "updated");
        Ok(Refresh::Updated)
    }
}
