use std::io::Write as _;

use anyhow::Result;
use chrono::{Local, SecondsFormat};
use env_logger::{Builder, WriteStyle};
use log::LevelFilter;

pub const LOG_FILTERS_VARIABLE: &str = "EPOCH_REWARDS_LOG";

const WORKSPACE_CRATES: &[&str] = &[
    "beacon_api",
    "binary_utils",
    "epoch_rewards",
    "execution_api",
    "prometheus_metrics",
];

pub fn initialize_logger(module_path: &str, always_write_style: bool) -> Result<()> {
    let filters = std::env::var(LOG_FILTERS_VARIABLE).ok();

    let mut builder = logger_builder(module_path, filters.as_deref());

    if always_write_style {
        builder.write_style(WriteStyle::Always);
    }

    builder.try_init()?;

    Ok(())
}

// Filters passed in `filters` take precedence over the defaults.
fn logger_builder(module_path: &str, filters: Option<&str>) -> Builder {
    let mut builder = Builder::new();

    builder.filter_level(LevelFilter::Off);

    for module in WORKSPACE_CRATES.iter().copied().chain([module_path]) {
        builder.filter_module(module, LevelFilter::Info);
    }

    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }

    builder.format(|formatter, record| {
        let style = formatter.default_level_style(record.level());

        writeln!(
            formatter,
            "[{} {style}{:<5}{style:#} {}] {}",
            Local::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            record.level(),
            record.target(),
            record.args(),
        )
    });

    builder
}
