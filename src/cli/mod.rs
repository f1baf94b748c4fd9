//! Command-line interface
//!
//! One subcommand per operation: one-shot snapshot commands, manual
//! cancel/close actions, and the live `watch` dashboard.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

use crate::config;
use crate::data_paths::DataPaths;
use crate::logging::{init_logging, LogMode, LoggingConfig};

use commands::cancel::CancelArgs;
use commands::cancel_all::CancelAllArgs;
use commands::close::CloseArgs;
use commands::init::InitArgs;
use commands::watch::WatchArgs;

#[derive(Parser)]
#[command(name = "futdash")]
#[command(version)]
#[command(about = "Dashboard for open USDⓈ-M futures orders and positions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use the futures testnet environment
    #[arg(long, global = true)]
    pub testnet: bool,

    /// Data directory path (default: platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save API credentials to encrypted storage
    Init(InitArgs),

    /// Live dashboard of open orders and positions
    Watch(WatchArgs),

    /// List open orders once
    Orders,

    /// List held positions once
    Positions,

    /// Cancel a single order
    Cancel(CancelArgs),

    /// Cancel all open orders, optionally for one symbol
    CancelAll(CancelAllArgs),

    /// Market-close positions in a symbol
    Close(CloseArgs),

    /// Market-close every held position
    CloseAll,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let data_paths = match &self.data_dir {
            Some(dir) => DataPaths::new(dir),
            None => DataPaths::new(config::default_data_dir()?),
        };
        data_paths.ensure_directories()?;

        // the dashboard owns the terminal, logs go to file only
        let log_mode = match self.command {
            Commands::Watch(_) => LogMode::FileOnly,
            _ => LogMode::ConsoleAndFile,
        };
        let mut logging_config = LoggingConfig::new(log_mode, data_paths.clone());
        if self.verbose > 0 {
            logging_config = logging_config.verbose();
        }
        init_logging(logging_config)?;

        let testnet = self.testnet;
        match self.command {
            Commands::Init(args) => commands::init::execute(&data_paths, args).await,
            Commands::Watch(args) => commands::watch::execute(testnet, &data_paths, args).await,
            Commands::Orders => commands::orders::execute(testnet, &data_paths).await,
            Commands::Positions => commands::positions::execute(testnet, &data_paths).await,
            Commands::Cancel(args) => commands::cancel::execute(testnet, &data_paths, args).await,
            Commands::CancelAll(args) => {
                commands::cancel_all::execute(testnet, &data_paths, args).await
            }
            Commands::Close(args) => commands::close::execute(testnet, &data_paths, args).await,
            Commands::CloseAll => commands::close_all::execute(testnet, &data_paths).await,
        }
    }
}
