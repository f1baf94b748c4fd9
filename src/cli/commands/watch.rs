use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::data_paths::DataPaths;
use crate::display;
use crate::session::SessionController;
use crate::store::ReconciliationStore;

#[derive(Args)]
pub struct WatchArgs {
    /// Render rate cap in frames per second
    #[arg(long, default_value_t = 60)]
    pub fps: u64,
}

/// Tick period for a requested frame rate, clamped to at least one
/// millisecond so the interval timer is never given a zero period.
fn tick_period(fps: u64) -> Duration {
    Duration::from_millis((1_000 / fps.max(1)).max(1))
}

pub async fn execute(testnet: bool, data_paths: &DataPaths, args: WatchArgs) -> Result<()> {
    let gateway = super::build_gateway(testnet, data_paths).await?;
    let store = Arc::new(ReconciliationStore::new());
    let session = SessionController::new(gateway, store.clone());

    session.start().await?;
    info!(fps = args.fps, "dashboard started");

    let mut ticker = tokio::time::interval(tick_period(args.fps));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // first frame unconditionally, then only when the store changed
    let mut force_render = true;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let orders_dirty = store.consume_orders_dirty();
                let positions_dirty = store.consume_positions_dirty();
                if !(force_render || orders_dirty || positions_dirty) {
                    continue;
                }
                force_render = false;
                render(&store, testnet).await;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    session.stop().await;
    println!("Session stopped.");
    Ok(())
}

async fn render(store: &ReconciliationStore, testnet: bool) {
    let orders = store.read_orders().await;
    let positions = store.read_positions().await;

    // clear screen and home the cursor
    print!("\x1B[2J\x1B[1;1H");
    let env = if testnet { "testnet" } else { "mainnet" };
    println!("{} ({})", "futdash".bold(), env);

    println!("\n{}", "Open Orders".bold());
    if orders.is_empty() {
        println!("  none");
    } else {
        println!("{}", display::orders_table(&orders));
    }

    println!("\n{}", "Positions".bold());
    if positions.is_empty() {
        println!("  none");
    } else {
        println!("{}", display::positions_table(&positions));
    }

    println!("\n{}", "Ctrl-C to quit.".dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_period_is_never_zero() {
        assert_eq!(tick_period(60), Duration::from_millis(16));
        assert_eq!(tick_period(1), Duration::from_millis(1000));
        assert_eq!(tick_period(0), Duration::from_millis(1000));

        // rates above 1000 fps would truncate to zero without the clamp
        assert_eq!(tick_period(2000), Duration::from_millis(1));
        assert!(!tick_period(u64::MAX).is_zero());
    }
}
