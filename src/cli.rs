mod usage;
mod watch;

use std::time::Duration;

use clap::{Parser, Subcommand};
use duke_energy::{Client, Config, Credentials};
use url::Url;

use crate::{
    cli::{usage::UsageArgs, watch::WatchArgs},
    prelude::*,
    tables::build_meters_table,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[clap(flatten)]
    pub portal: PortalArgs,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn run(self) -> Result {
        let client = self.portal.new_client();
        match self.command {
            Command::Meters => {
                let meters = client.get_meters().context("failed to discover the meters")?;
                println!("{}", build_meters_table(&meters));
                Ok(())
            }
            Command::Usage(args) => args.run(&client),
            Command::Watch(args) => args.run(&client),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// List the meters on the account.
    #[clap(name = "meters")]
    Meters,

    /// Fetch and print the current billing cycle and yesterday's usage.
    #[clap(name = "usage")]
    Usage(UsageArgs),

    /// Keep refreshing the meters and log their usage.
    #[clap(name = "watch")]
    Watch(WatchArgs),
}

#[derive(Parser)]
pub struct PortalArgs {
    /// Account email address.
    #[clap(long, env = "DUKE_ENERGY_EMAIL")]
    pub email: String,

    /// Account password.
    #[clap(long, env = "DUKE_ENERGY_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[clap(long = "base-url", env = "DUKE_ENERGY_BASE_URL", default_value = Config::DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// Timeout of every portal call.
    #[clap(long = "timeout-secs", env = "DUKE_ENERGY_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: u64,

    /// Minimal time between two refreshes of the same meter (at least 10 minutes).
    #[clap(
        long = "update-interval-minutes",
        env = "DUKE_ENERGY_UPDATE_INTERVAL_MINUTES",
        default_value = "10"
    )]
    pub update_interval_minutes: u32,
}

impl PortalArgs {
    pub fn new_client(&self) -> Client {
        let config = Config::builder()
            .credentials(Credentials { email: self.email.clone(), password: self.password.clone() })
            .base_url(self.base_url.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
            .update_interval_minutes(self.update_interval_minutes)
            .build();
        Client::new(config)
    }
}
