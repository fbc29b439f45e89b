use clap::Parser;
use duke_energy::Client;

use crate::{prelude::*, tables::build_usage_table};

#[derive(Parser)]
pub struct UsageArgs {
    /// Only this meter (by ID).
    #[clap(long = "meter-id")]
    pub meter_id: Option<String>,
}

impl UsageArgs {
    #[instrument(skip_all)]
    pub fn run(self, client: &Client) -> Result {
        let mut meters = client.get_meters().context("failed to discover the meters")?;
        if let Some(meter_id) = &self.meter_id {
            meters.retain(|meter| meter.id() == meter_id);
            ensure!(!meters.is_empty(), "there is no meter `{meter_id}` on the account");
        }
        for meter in &mut meters {
            if let Err(error) = meter.update(client, true) {
                warn!(meter = %meter.number(), "failed to update: {:#}", anyhow::Error::from(error));
            }
        }
        println!("{}", build_usage_table(&meters));
        Ok(())
    }
}
