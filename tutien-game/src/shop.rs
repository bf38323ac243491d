//! The market stall: template-driven stock with a periodic refresh, plain
//! buy at list price and sell at half value.

use log::debug;

use crate::data::MARKET_TEMPLATES;
use crate::player::Item;
use crate::state::GameState;

/// Years between stock refreshes.
pub const REFRESH_INTERVAL: u32 = 10;

fn scaled_cost(base: i64, realm_idx: usize) -> i64 {
    (base as f64 * (1.0 + realm_idx as f64 * 0.25)).round() as i64
}

/// Restock from the templates when the interval has elapsed (or the shop has
/// never been stocked). Prices scale with the player's realm.
pub fn refresh_shop(state: &mut GameState) {
    let due = state.shop_inventory.is_empty()
        || state.year.saturating_sub(state.shop_last_refreshed) >= REFRESH_INTERVAL;
    if !due {
        return;
    }
    debug!("restocking shop at year {}", state.year);

    let realm_idx = state.player.realm_index();
    let mut candidates: Vec<usize> = (0..MARKET_TEMPLATES.len()).collect();
    let count = (4 + state.roll_index(3)).min(candidates.len());
    let mut stock = Vec::with_capacity(count);
    for _ in 0..count {
        let template = &MARKET_TEMPLATES[candidates.remove(state.roll_index(candidates.len()))];
        let cost = scaled_cost(template.base_cost, realm_idx);
        let id = state.next_item_id(template.name);
        stock.push(Item::from_template(template, id, cost));
    }
    state.shop_inventory = stock;
    state.shop_last_refreshed = state.year;
}

/// Move a shop item into the inventory for its list price.
pub fn buy_item(state: &mut GameState, item_id: &str) -> bool {
    let Some(idx) = state.shop_inventory.iter().position(|i| i.id == item_id) else {
        return false;
    };
    let cost = state.shop_inventory[idx].cost.unwrap_or(0);
    if cost > state.player.linh_thach {
        state.push_log(format!(
            "Không đủ linh thạch để mua {} (cần {cost}).",
            state.shop_inventory[idx].name
        ));
        return false;
    }
    let item = state.shop_inventory.remove(idx);
    state.player.linh_thach -= cost;
    state.push_log(format!("Bạn mua {} với giá {cost} linh thạch.", item.name));
    state.player.inventory.push(item);
    true
}

/// Sell an inventory item for half its market value; the item is gone.
pub fn sell_item(state: &mut GameState, item_id: &str) -> bool {
    let Some(idx) = state.player.inventory.iter().position(|i| i.id == item_id) else {
        return false;
    };
    let item = state.player.inventory.remove(idx);
    let value = item.cost.unwrap_or(0) / 2;
    state.player.linh_thach += value;
    state.push_log(format!("Bạn bán {} thu về {value} linh thạch.", item.name));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testutil::sample_state;

    #[test]
    fn refresh_stocks_and_reprices() {
        let mut state = sample_state();
        refresh_shop(&mut state);
        assert!((4..=6).contains(&state.shop_inventory.len()));
        assert_eq!(state.shop_last_refreshed, state.year);
        assert!(state.shop_inventory.iter().all(|i| i.cost.is_some()));
    }

    #[test]
    fn refresh_waits_for_the_interval() {
        let mut state = sample_state();
        refresh_shop(&mut state);
        let stock: Vec<String> = state.shop_inventory.iter().map(|i| i.id.clone()).collect();
        state.year += REFRESH_INTERVAL - 1;
        refresh_shop(&mut state);
        let unchanged: Vec<String> = state.shop_inventory.iter().map(|i| i.id.clone()).collect();
        assert_eq!(stock, unchanged);
        state.year += 1;
        refresh_shop(&mut state);
        assert_eq!(state.shop_last_refreshed, state.year);
    }

    #[test]
    fn buy_moves_item_and_funds() {
        let mut state = sample_state();
        refresh_shop(&mut state);
        state.player.linh_thach = 100_000;
        let item = state.shop_inventory[0].clone();
        assert!(buy_item(&mut state, &item.id));
        assert_eq!(state.player.linh_thach, 100_000 - item.cost.unwrap());
        assert!(state.player.inventory.iter().any(|i| i.id == item.id));
        assert!(!state.shop_inventory.iter().any(|i| i.id == item.id));
    }

    #[test]
    fn buy_rejected_when_broke() {
        let mut state = sample_state();
        refresh_shop(&mut state);
        state.player.linh_thach = 0;
        let id = state.shop_inventory[0].id.clone();
        assert!(!buy_item(&mut state, &id));
        assert!(state.shop_inventory.iter().any(|i| i.id == id));
    }

    #[test]
    fn sell_returns_half_value() {
        let mut state = sample_state();
        refresh_shop(&mut state);
        state.player.linh_thach = 100_000;
        let id = state.shop_inventory[0].id.clone();
        let cost = state.shop_inventory[0].cost.unwrap();
        buy_item(&mut state, &id);
        let before = state.player.linh_thach;
        assert!(sell_item(&mut state, &id));
        assert_eq!(state.player.linh_thach, before + cost / 2);
        assert!(!state.player.inventory.iter().any(|i| i.id == id));
    }
}
