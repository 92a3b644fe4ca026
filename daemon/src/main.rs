use std::{fs::File, io::Write, path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use sika_common::{
    config::VERSION, logger, plan::PlanSchedule, referral::ReferralConfig,
};
use sika_daemon::{
    config::{Config, LedgerOptions},
    core::{
        ledger::{Ledger, LedgerConfig},
        storage::{LedgerStorage, SledStorage},
        sweep::spawn_expiry_sweep,
    },
    rpc::LedgerRpcServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let mut config: Config = Config::parse();
    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {}", path);
                return Ok(());
            }

            let mut file = File::create(path).context("Error while creating config file")?;
            let json = serde_json::to_string_pretty(&config)
                .context("Error while serializing config file")?;
            file.write_all(json.as_bytes())
                .context("Error while writing config file")?;
            println!("Config file template generated at {}", path);
            return Ok(());
        }

        let file = File::open(path).context("Error while opening config file")?;
        config = serde_json::from_reader(file).context("Error while reading config file")?;
    } else if config.generate_config_template {
        eprintln!(
            "Provided config file path is required to generate the template with --config-file"
        );
        return Ok(());
    }

    let log_config = &config.log;
    let logs_dir =
        (!log_config.disable_file_logging).then(|| Path::new(log_config.logs_path.as_str()));
    let module_levels: Vec<(String, LevelFilter)> = log_config
        .logs_modules
        .iter()
        .map(|module| (module.module.clone(), module.level.into()))
        .collect();
    logger::setup(
        log_config.log_level.into(),
        log_config
            .file_log_level
            .unwrap_or(log_config.log_level)
            .into(),
        logs_dir,
        &log_config.filename_log,
        log_config.disable_log_color,
        &module_levels,
    )?;

    info!("Sika ledger daemon v{}", VERSION);

    let ledger_config = build_ledger_config(&config.ledger)?;
    if !ledger_config.is_valid() {
        error!("Invalid ledger configuration: the plan schedule must have at least one tier with a non-zero video limit and the referral bonus cannot exceed 100%");
        return Ok(());
    }

    let storage = Arc::new(SledStorage::open(&config.storage_directory)?);
    info!("Ledger database opened at {}", config.storage_directory);

    let ledger = Arc::new(Ledger::new(storage, ledger_config));
    spawn_expiry_sweep(Arc::clone(&ledger), config.ledger.sweep_interval);

    let server = LedgerRpcServer::new(Arc::clone(&ledger), config.rpc).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Error while waiting on ctrl-c signal")?;
    info!("Shutting down...");

    server.stop().await;
    ledger.storage().flush().await?;
    info!("Ledger database flushed, bye");

    Ok(())
}

fn build_ledger_config(options: &LedgerOptions) -> Result<LedgerConfig> {
    let schedule = match options.plan_schedule_file.as_ref() {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Error while opening plan schedule file {}", path))?;
            serde_json::from_reader(file).context("Error while parsing plan schedule file")?
        }
        None => PlanSchedule::default(),
    };

    Ok(LedgerConfig {
        utc_offset_minutes: options.utc_offset_minutes,
        referral: ReferralConfig {
            bonus_bps: options.referral_bonus_bps,
        },
        withdrawal_expiry: options.withdrawal_expiry,
        schedule,
    })
}
