use anyhow::Result;
use rust_decimal::Decimal;

use crate::data_paths::DataPaths;
use crate::display;
use crate::gateway::{ExchangeGateway, Position};

/// The position endpoint returns a placeholder row per configured symbol;
/// only rows with a real entry price and size are positions.
pub(super) fn held_only(positions: Vec<Position>) -> Vec<Position> {
    positions
        .into_iter()
        .filter(|p| !p.is_flat() && p.entry_price != Decimal::ZERO)
        .collect()
}

pub async fn execute(testnet: bool, data_paths: &DataPaths) -> Result<()> {
    let gateway = super::build_gateway(testnet, data_paths).await?;
    let positions = held_only(gateway.fetch_open_positions().await?);

    if positions.is_empty() {
        println!("No held positions.");
    } else {
        println!("{}", display::positions_table(&positions));
    }
    Ok(())
}
