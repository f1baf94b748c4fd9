//! Command implementations, one module per subcommand

use std::sync::Arc;

use anyhow::Result;

use crate::config::Settings;
use crate::data_paths::DataPaths;
use crate::gateway::BinanceGateway;

pub mod cancel;
pub mod cancel_all;
pub mod close;
pub mod close_all;
pub mod init;
pub mod orders;
pub mod positions;
pub mod watch;

pub(crate) async fn build_gateway(
    testnet: bool,
    data_paths: &DataPaths,
) -> Result<Arc<BinanceGateway>> {
    let settings = Settings::load(testnet, data_paths).await?;
    Ok(Arc::new(BinanceGateway::new(&settings)))
}
