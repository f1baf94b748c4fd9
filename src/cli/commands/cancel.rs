use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::data_paths::DataPaths;
use crate::gateway::ExchangeGateway;

#[derive(Args)]
pub struct CancelArgs {
    /// Symbol, e.g. BTCUSDT
    pub symbol: String,

    /// Order ID
    pub order_id: u64,
}

pub async fn execute(testnet: bool, data_paths: &DataPaths, args: CancelArgs) -> Result<()> {
    let gateway = super::build_gateway(testnet, data_paths).await?;
    gateway.cancel_order(&args.symbol, args.order_id).await?;
    println!(
        "{}",
        format!("Cancel accepted for order {} on {}.", args.order_id, args.symbol).green()
    );
    Ok(())
}
