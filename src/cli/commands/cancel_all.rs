use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use crate::actions::ActionDispatcher;
use crate::data_paths::DataPaths;
use crate::gateway::ExchangeGateway;

#[derive(Args)]
pub struct CancelAllArgs {
    /// Restrict to one symbol; all symbols with open orders otherwise
    #[arg(long)]
    pub symbol: Option<String>,
}

pub async fn execute(testnet: bool, data_paths: &DataPaths, args: CancelAllArgs) -> Result<()> {
    let gateway = super::build_gateway(testnet, data_paths).await?;
    let mut orders = gateway.fetch_open_orders().await?;
    if let Some(symbol) = &args.symbol {
        orders.retain(|o| &o.symbol == symbol);
    }
    if orders.is_empty() {
        println!("No open orders to cancel.");
        return Ok(());
    }

    let (reports_tx, mut reports_rx) = mpsc::channel(32);
    let dispatcher = ActionDispatcher::new(gateway, reports_tx);
    let dispatched = dispatcher.cancel_displayed_orders(&orders);
    drop(dispatcher);

    let mut failures = 0usize;
    while let Some(report) = reports_rx.recv().await {
        match &report.outcome {
            Ok(()) => println!("{}", format!("{:?}: accepted", report.action).green()),
            Err(e) => {
                failures += 1;
                println!("{}", format!("{:?}: {}", report.action, e).red());
            }
        }
    }

    println!("{} cancel request(s), {} failed.", dispatched, failures);
    Ok(())
}
