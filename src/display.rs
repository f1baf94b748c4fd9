//! Table rendering for orders and positions

use chrono::{Local, TimeZone};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;
use rust_decimal::Decimal;

use crate::gateway::types::{Order, Position, Side};

/// Millisecond epoch to local wall-clock time.
fn format_millis(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        _ => millis.to_string(),
    }
}

fn side_cell(side: Side) -> Cell {
    match side {
        Side::Buy => Cell::new("BUY".green().to_string()),
        Side::Sell => Cell::new("SELL".red().to_string()),
    }
}

fn pnl_cell(pnl: Decimal) -> Cell {
    if pnl < Decimal::ZERO {
        Cell::new(pnl.to_string().red().to_string())
    } else {
        Cell::new(pnl.to_string().green().to_string())
    }
}

pub fn orders_table(orders: &[Order]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Created", "Symbol", "Type", "Pos", "Side", "Price", "Qty", "Filled", "Status", "RO",
            "Order ID",
        ]);

    for order in orders {
        table.add_row(vec![
            Cell::new(format_millis(order.time)),
            Cell::new(&order.symbol),
            Cell::new(&order.order_type),
            Cell::new(order.position_side.as_str()),
            side_cell(order.side),
            Cell::new(order.price.to_string()),
            Cell::new(order.orig_qty.to_string()),
            Cell::new(order.executed_qty.to_string()),
            Cell::new(order.status.as_str()),
            Cell::new(if order.reduce_only { "yes" } else { "no" }),
            Cell::new(order.order_id.to_string()),
        ]);
    }
    table
}

pub fn positions_table(positions: &[Position]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Symbol", "Pos", "Qty", "Notional", "Entry", "Margin", "Isolated Wallet", "uPnL",
        ]);

    for position in positions {
        table.add_row(vec![
            Cell::new(&position.symbol),
            Cell::new(position.position_side.as_str()),
            Cell::new(position.unsigned_qty().to_string()),
            Cell::new(position.notional().to_string()),
            Cell::new(position.entry_price.to_string()),
            Cell::new(position.margin_type.as_str()),
            Cell::new(position.isolated_wallet.to_string()),
            pnl_cell(position.un_realized_profit),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::{MarginType, OrderStatus, PositionSide};
    use rust_decimal_macros::dec;

    #[test]
    fn orders_table_shows_each_row() {
        let order = Order {
            order_id: 7,
            symbol: "BTCUSDT".into(),
            status: OrderStatus::PartiallyFilled,
            client_order_id: "c-7".into(),
            price: dec!(43000.10),
            avg_price: dec!(43000),
            orig_qty: dec!(0.5),
            executed_qty: dec!(0.1),
            time_in_force: "GTC".into(),
            order_type: "LIMIT".into(),
            reduce_only: true,
            close_position: false,
            side: Side::Sell,
            position_side: PositionSide::Long,
            stop_price: Decimal::ZERO,
            working_type: "CONTRACT_PRICE".into(),
            price_protect: false,
            orig_type: "LIMIT".into(),
            time: 1716552330000,
            update_time: 1716552331000,
        };

        let rendered = orders_table(&[order]).to_string();
        assert!(rendered.contains("BTCUSDT"));
        assert!(rendered.contains("43000.10"));
        assert!(rendered.contains("PARTIALLY_FILLED"));
        assert!(rendered.contains("yes"));
    }

    #[test]
    fn positions_table_shows_unsigned_qty_and_notional() {
        let position = Position {
            symbol: "ETHUSDT".into(),
            position_amt: dec!(-2.5),
            entry_price: dec!(2000),
            un_realized_profit: dec!(-12.3),
            margin_type: MarginType::Cross,
            isolated_wallet: Decimal::ZERO,
            position_side: PositionSide::Short,
        };

        let rendered = positions_table(&[position]).to_string();
        assert!(rendered.contains("ETHUSDT"));
        assert!(rendered.contains("2.5"));
        assert!(rendered.contains("5000"));
        assert!(rendered.contains("-12.3"));
    }
}
