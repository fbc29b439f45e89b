use std::{thread::sleep, time::Duration};

use clap::Parser;
use duke_energy::{Client, Refresh};

use crate::prelude::*;

#[derive(Parser)]
pub struct WatchArgs {
    /// How often to check whether a meter is due for a refresh.
    #[clap(long = "polling-interval-secs", env = "DUKE_ENERGY_POLLING_INTERVAL_SECS", default_value = "60")]
    pub polling_interval_secs: u64,
}

impl WatchArgs {
    /// Poll forever. Each meter's own cooldown decides whether the portal is actually called.
    #[instrument(skip_all)]
    pub fn run(self, client: &Client) -> Result {
        let mut meters = client.get_meters().context("failed to discover the meters")?;
        let polling_interval = Duration::from_secs(self.polling_interval_secs);
        info!(n_meters = meters.len(), ?polling_interval, "watching…");

        loop {
            for meter in &mut meters {
                match client.refresh(meter) {
                    Ok(Refresh::Updated) => {
                        info!(
                            meter = %meter.number(),
                            days_billed = ?meter.days_billed().ok().flatten(),
                            total = ?meter.total().ok().flatten(),
                            average = ?meter.average().ok().flatten(),
                            yesterday = ?meter.usage().ok().flatten(),
                            unit = ?meter.unit().ok().flatten(),
                            "refreshed",
                        );
                    }
                    Ok(Refresh::Skipped) => {}
                    Err(error) => {
                        warn!(
                            meter = %meter.number(),
                            "failed to refresh, keeping the cached values: {:#}",
                            anyhow::Error::from(error),
                        );
                    }
                }
            }
            sleep(polling_interval);
        }
    }
}
