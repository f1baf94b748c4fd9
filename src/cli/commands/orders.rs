use anyhow::Result;

use crate::data_paths::DataPaths;
use crate::display;
use crate::gateway::ExchangeGateway;

pub async fn execute(testnet: bool, data_paths: &DataPaths) -> Result<()> {
    let gateway = super::build_gateway(testnet, data_paths).await?;
    let mut orders = gateway.fetch_open_orders().await?;
    orders.sort_by_key(|o| o.order_id);

    if orders.is_empty() {
        println!("No open orders.");
    } else {
        println!("{}", display::orders_table(&orders));
    }
    Ok(())
}
