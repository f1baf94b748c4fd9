use anyhow::{anyhow, Result};
use clap::Args;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use crate::actions::ActionDispatcher;
use crate::data_paths::DataPaths;
use crate::gateway::{ExchangeGateway, PositionSide};

#[derive(Args)]
pub struct CloseArgs {
    /// Symbol, e.g. BTCUSDT
    pub symbol: String,

    /// Hedge-mode direction (LONG, SHORT or BOTH); all directions when omitted
    #[arg(long, value_parser = parse_position_side)]
    pub position_side: Option<PositionSide>,
}

fn parse_position_side(raw: &str) -> Result<PositionSide> {
    match raw.to_ascii_uppercase().as_str() {
        "LONG" => Ok(PositionSide::Long),
        "SHORT" => Ok(PositionSide::Short),
        "BOTH" => Ok(PositionSide::Both),
        other => Err(anyhow!("unknown position side: {other}")),
    }
}

pub async fn execute(testnet: bool, data_paths: &DataPaths, args: CloseArgs) -> Result<()> {
    let gateway = super::build_gateway(testnet, data_paths).await?;
    let mut positions = super::positions::held_only(gateway.fetch_open_positions().await?);
    positions.retain(|p| p.symbol == args.symbol);
    if let Some(side) = args.position_side {
        positions.retain(|p| p.position_side == side);
    }
    if positions.is_empty() {
        println!("No held position matches {}.", args.symbol);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_side_parses_case_insensitively() {
        assert_eq!(parse_position_side("long").unwrap(), PositionSide::Long);
        assert_eq!(parse_position_side("SHORT").unwrap(), PositionSide::Short);
        assert_eq!(parse_position_side("Both").unwrap(), PositionSide::Both);
        assert!(parse_position_side("sideways").is_err());
    }
}
