// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the Modbus data-point simulator

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use modbus_simulator::config::Config;
use modbus_simulator::daemon::Daemon;

/// Simulated Modbus TCP data-point bank
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (created with defaults when missing)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the Modbus server bind address
    #[arg(long)]
    modbus_address: Option<String>,

    /// Override the Modbus server port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Override the regeneration period in milliseconds
    #[arg(long)]
    tick_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    let mut config = Config::from_file(&args.config)?;
    config.apply_args(args.modbus_address, args.modbus_port, args.tick_interval_ms);

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    info!("Simulator running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    daemon.shutdown();
    daemon.join().await?;
    info!("Simulator stopped");

    Ok(())
}
