#![allow(unused_imports)]

pub use anyhow::{Context, bail, ensure};
pub use tracing::{Level, debug, error, info, instrument, trace, warn};

pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
