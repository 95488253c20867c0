use std::{
    io::{self, Write as _},
    process::ExitCode,
    sync::Arc,
};

use anyhow::Result;
use beacon_api::BeaconApi;
use clap::{Error as ClapError, Parser as _};
use epoch_rewards::{EpochIncome, EpochRewardsAggregator, Providers};
use execution_api::ExecutionApi;
use log::{debug, error, info, warn};
use prometheus::Registry;
use prometheus_metrics::Metrics;
use reqwest::Client;
use tokio::runtime::Builder;

use crate::{args::EpochRewardsArgs, config::EpochRewardsConfig};

mod args;
mod config;

fn main() -> ExitCode {
    if let Err(error) = try_main() {
        error.downcast_ref().map(ClapError::exit);
        error!("{error:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    binary_utils::initialize_logger(module_path!(), false)?;

    let config = EpochRewardsArgs::try_parse()?
        .try_into_config()
        .map_err(EpochRewardsArgs::clap_error)?;

    config.report();

    let registry = Registry::new();
    let metrics = Arc::new(Metrics::new()?);
    metrics.register(&registry)?;

    let result = Builder::new_multi_thread()
        .thread_name("epoch-rewards")
        .enable_all()
        .build()?
        .block_on(run(&config, metrics));

    report_metrics(&registry);

    write_income(io::stdout().lock(), &result?, config.pretty)
}

// Failed runs are reported too, so provider errors and skips can be inspected.
fn report_metrics(registry: &Registry) {
    match prometheus_metrics::encode(registry) {
        Ok(encoded) => debug!("metrics at exit:\n{encoded}"),
        Err(error) => warn!("unable to encode metrics: {error:?}"),
    }
}

async fn run(config: &EpochRewardsConfig, metrics: Arc<Metrics>) -> Result<EpochIncome> {
    let client = Client::builder().timeout(config.request_timeout).build()?;

    let beacon_api = Arc::new(BeaconApi::new(
        client.clone(),
        config.beacon_api_config(),
        Some(Arc::clone(&metrics)),
    ));

    let execution_api = Arc::new(ExecutionApi::new(
        client,
        config.execution_rpc_url.clone(),
        Some(Arc::clone(&metrics)),
    ));

    let aggregator = EpochRewardsAggregator::new(
        config.aggregator_config(),
        Providers::new(&beacon_api, &execution_api),
        Some(metrics),
    );

    let income = aggregator.compute_epoch_rewards(config.epoch).await?;

    let (rewards, penalties) = income.values().fold((0, 0), |(rewards, penalties), record| {
        (
            rewards + record.total_reward(),
            penalties + record.total_penalty(),
        )
    });

    info!(
        "epoch {}: {} validators, {rewards} Gwei in rewards, {penalties} Gwei in penalties",
        config.epoch,
        income.len(),
    );

    Ok(income)
}

fn write_income(mut writer: impl io::Write, income: &EpochIncome, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, income)?;
    } else {
        serde_json::to_writer(&mut writer, income)?;
    }

    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}
