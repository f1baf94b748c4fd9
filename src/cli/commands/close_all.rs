use anyhow::Result;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use crate::actions::ActionDispatcher;
use crate::data_paths::DataPaths;
use crate::gateway::ExchangeGateway;

pub async fn execute(testnet: bool, data_paths: &DataPaths) -> Result<()> {
    let gateway = super::build_gateway(testnet, data_paths).await?;
    let positions = super::positions::held_only(gateway.fetch_open_positions().await?);
    if positions.is_empty() {
        println!("No held positions to close.");
        return Ok(());
    }

    let (reports_tx, mut reports_rx) = mpsc::channel(32);
    let dispatcher = ActionDispatcher::new(gateway, reports_tx);
    let dispatched = dispatcher.close_displayed_positions(&positions);
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

    println!("{} close request(s), {} failed.", dispatched, failures);
    Ok(())
}
