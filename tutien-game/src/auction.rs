//! The Giao Lưu Phường auction: sequential lots, a simple simulated
//! competitor, and a strict no-debt rule on player bids.

use serde::{Deserialize, Serialize};

use crate::data::{self, MARKET_TEMPLATES, OPPONENT_NAMES};
use crate::events::{AuctionAction, ChoiceEffects, EventChoice, YearlyEvent};
use crate::player::Item;
use crate::state::GameState;

/// Chance the simulated competitor answers a player bid.
pub const COMPETITOR_BID_CHANCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    #[default]
    Ongoing,
    Sold,
    Passed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionLot {
    pub item: Item,
    pub starting_bid: i64,
    pub current_bid: i64,
    #[serde(default)]
    pub highest_bidder_id: Option<String>,
    #[serde(default)]
    pub highest_bidder_name: Option<String>,
    #[serde(default)]
    pub status: LotStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionState {
    pub year: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub items: Vec<AuctionLot>,
    #[serde(default)]
    pub current_item_index: usize,
    /// Append-only auctioneer chatter shown alongside the lot list.
    #[serde(default)]
    pub log: Vec<String>,
}

fn default_active() -> bool {
    true
}

impl AuctionState {
    #[must_use]
    pub fn current_lot(&self) -> Option<&AuctionLot> {
        self.items.get(self.current_item_index)
    }
}

#[must_use]
pub fn invitation_event() -> YearlyEvent {
    YearlyEvent {
        description: format!(
            "Một thiếp mời nạm vàng được gửi đến: {} sắp tổ chức phiên đấu giá lớn, quy tụ \
             vô số kỳ trân dị bảo.",
            data::AUCTION_VENUE
        ),
        choices: vec![
            EventChoice {
                text: "Đến tham dự đấu giá.".to_string(),
                success_chance: None,
                effects: ChoiceEffects {
                    auction_action: Some(AuctionAction::Join),
                    ..ChoiceEffects::default()
                },
            },
            EventChoice {
                text: "Không hứng thú.".to_string(),
                success_chance: None,
                effects: ChoiceEffects {
                    auction_action: Some(AuctionAction::Decline),
                    ..ChoiceEffects::default()
                },
            },
        ],
    }
}

/// Lots are drawn from the market templates under a realm-scaled price
/// ceiling, so early-game auctions never show unreachable treasures.
fn generate_lots(state: &mut GameState) -> Vec<AuctionLot> {
    let ceiling = (state.player.realm_index() as i64 + 1) * 2_000;
    let mut candidates: Vec<usize> = MARKET_TEMPLATES
        .iter()
        .enumerate()
        .filter(|(_, t)| t.base_cost <= ceiling)
        .map(|(i, _)| i)
        .collect();

    let count = (3 + state.roll_index(3)).min(candidates.len());
    let mut lots = Vec::with_capacity(count);
    for _ in 0..count {
        let template = &MARKET_TEMPLATES[candidates.remove(state.roll_index(candidates.len()))];
        let id = state.next_item_id(template.name);
        let item = Item::from_template(template, id, template.base_cost);
        let starting_bid = (template.base_cost / 2).max(1);
        lots.push(AuctionLot {
            item,
            starting_bid,
            current_bid: starting_bid,
            highest_bidder_id: None,
            highest_bidder_name: None,
            status: LotStatus::Ongoing,
        });
    }
    lots
}

/// Dispatch target for `effects.auctionAction`.
pub fn handle_action(state: &mut GameState, action: AuctionAction) {
    match action {
        AuctionAction::Join => join(state),
        AuctionAction::Decline => {
            state.push_log("Bạn gấp thiếp mời lại, không màng đến phiên đấu giá.");
        }
        AuctionAction::Bid => bid(state),
        AuctionAction::Pass => pass(state),
        AuctionAction::Leave => leave(state),
    }
}

fn join(state: &mut GameState) {
    let items = generate_lots(state);
    if items.is_empty() {
        state.push_log("Phiên đấu giá lần này không có vật phẩm nào đáng chú ý.");
        return;
    }
    state.player.current_location = data::AUCTION_VENUE.to_string();
    let first = items[0].item.name.clone();
    let opening = items[0].starting_bid;
    let mut auction = AuctionState {
        year: state.year,
        is_active: true,
        items,
        current_item_index: 0,
        log: Vec::new(),
    };
    auction
        .log
        .push(format!("Vật phẩm đầu tiên: {first}. Giá khởi điểm {opening} linh thạch!"));
    state.auction = Some(auction);
    state.push_major(format!(
        "Bạn bước vào {} giữa tiếng gõ búa vang dội của phiên đấu giá.",
        data::AUCTION_VENUE
    ));
}

#[must_use]
fn player_bid_amount(current: i64) -> i64 {
    (current as f64 * 1.1).ceil() as i64
}

fn bid(state: &mut GameState) {
    let Some(auction) = state.auction.as_ref() else {
        return;
    };
    let Some(lot) = auction.current_lot() else {
        return;
    };
    let amount = player_bid_amount(lot.current_bid);
    if amount > state.player.linh_thach {
        let line = format!("Bạn không đủ linh thạch để trả giá {amount}.");
        if let Some(a) = state.auction.as_mut() {
            a.log.push(line);
        }
        return;
    }

    let player_name = state.player.name.clone();
    let idx = state.auction.as_ref().map_or(0, |a| a.current_item_index);
    if let Some(lot) = state.auction.as_mut().and_then(|a| a.items.get_mut(idx)) {
        lot.current_bid = amount;
        lot.highest_bidder_id = Some("player".to_string());
        lot.highest_bidder_name = Some(player_name.clone());
    }
    if let Some(a) = state.auction.as_mut() {
        a.log.push(format!("{player_name} trả giá {amount} linh thạch!"));
    }

    // The room answers with fixed probability, raising 5-20% up to the
    // lot's market value doubled.
    if state.roll_unit() < COMPETITOR_BID_CHANCE {
        let raise_roll = state.roll_unit();
        let competitor = OPPONENT_NAMES[state.roll_index(OPPONENT_NAMES.len())].to_string();
        if let Some(lot) = state.auction.as_mut().and_then(|a| a.items.get_mut(idx)) {
            let ceiling = lot.item.cost.unwrap_or(lot.starting_bid * 2) * 2;
            let raised = (lot.current_bid as f64 * (1.05 + raise_roll * 0.15)).ceil() as i64;
            if raised <= ceiling {
                lot.current_bid = raised;
                lot.highest_bidder_id = Some(format!("npc-{competitor}"));
                lot.highest_bidder_name = Some(competitor.clone());
                if let Some(a) = state.auction.as_mut() {
                    a.log
                        .push(format!("{competitor} lập tức nâng giá lên {raised} linh thạch!"));
                }
            }
        }
    }
}

/// Close the current lot and open the next, or end the auction after the
/// last one.
fn pass(state: &mut GameState) {
    let Some(auction) = state.auction.as_mut() else {
        return;
    };
    let idx = auction.current_item_index;
    let Some(lot) = auction.items.get_mut(idx) else {
        leave(state);
        return;
    };

    let player_won = lot.highest_bidder_id.as_deref() == Some("player");
    let mut lines: Vec<String> = Vec::new();
    let mut won_item: Option<(Item, i64)> = None;
    match &lot.highest_bidder_name {
        Some(winner) => {
            lot.status = LotStatus::Sold;
            lines.push(format!(
                "Gõ búa! {} thuộc về {winner} với giá {} linh thạch.",
                lot.item.name, lot.current_bid
            ));
            if player_won {
                won_item = Some((lot.item.clone(), lot.current_bid));
            }
        }
        None => {
            lot.status = LotStatus::Passed;
            lines.push(format!("Không ai trả giá, {} bị thu hồi.", lot.item.name));
        }
    }

    auction.current_item_index += 1;
    if let Some(next) = auction.items.get(auction.current_item_index) {
        lines.push(format!(
            "Vật phẩm tiếp theo: {}. Giá khởi điểm {} linh thạch!",
            next.item.name, next.starting_bid
        ));
        auction.log.extend(lines);
    } else {
        auction.log.extend(lines);
        auction.is_active = false;
    }

    if let Some((item, price)) = won_item {
        state.player.linh_thach -= price;
        state.push_major(format!(
            "Bạn thắng đấu giá {} với giá {price} linh thạch.",
            item.name
        ));
        state.player.inventory.push(item);
    }

    let finished = state.auction.as_ref().is_some_and(|a| !a.is_active);
    if finished {
        state.auction = None;
        state.push_log("Phiên đấu giá kết thúc, đám đông dần tản đi.");
    }
}

fn leave(state: &mut GameState) {
    if state.auction.take().is_some() {
        state.push_log("Bạn rời khỏi phiên đấu giá sớm.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testutil::sample_state;

    fn joined_state() -> GameState {
        let mut state = sample_state();
        state.player.linh_thach = 10_000;
        handle_action(&mut state, AuctionAction::Join);
        state
    }

    #[test]
    fn join_relocates_and_stocks_lots() {
        let state = joined_state();
        assert_eq!(state.player.current_location, data::AUCTION_VENUE);
        let auction = state.auction.as_ref().expect("auction open");
        assert!((3..=5).contains(&auction.items.len()));
        assert!(auction.items.iter().all(|l| l.status == LotStatus::Ongoing));
    }

    #[test]
    fn unaffordable_bid_changes_nothing_but_the_log() {
        let mut state = joined_state();
        state.player.linh_thach = 0;
        let bid_before = state.auction.as_ref().unwrap().items[0].current_bid;
        handle_action(&mut state, AuctionAction::Bid);
        let auction = state.auction.as_ref().unwrap();
        assert_eq!(auction.items[0].current_bid, bid_before);
        assert!(auction.items[0].highest_bidder_id.is_none());
        assert!(auction.log.last().unwrap().contains("không đủ"));
    }

    #[test]
    fn winning_a_lot_transfers_funds_and_item() {
        // The competitor's raises are capped at twice the lot's market
        // value, so repeated player bids always end up on top eventually.
        let mut state = sample_state().with_seed(3);
        state.player.linh_thach = 10_000;
        handle_action(&mut state, AuctionAction::Join);
        let funds_before = state.player.linh_thach;
        let inventory_before = state.player.inventory.len();

        for _ in 0..40 {
            handle_action(&mut state, AuctionAction::Bid);
            let holds = state
                .auction
                .as_ref()
                .and_then(AuctionState::current_lot)
                .is_some_and(|l| l.highest_bidder_id.as_deref() == Some("player"));
            if holds {
                break;
            }
        }
        let price = state
            .auction
            .as_ref()
            .and_then(AuctionState::current_lot)
            .map(|l| l.current_bid)
            .unwrap();
        handle_action(&mut state, AuctionAction::Pass);
        assert_eq!(state.player.linh_thach, funds_before - price);
        assert_eq!(state.player.inventory.len(), inventory_before + 1);
    }

    #[test]
    fn passing_every_lot_ends_the_auction() {
        let mut state = joined_state();
        let lots = state.auction.as_ref().unwrap().items.len();
        for _ in 0..lots {
            handle_action(&mut state, AuctionAction::Pass);
        }
        assert!(state.auction.is_none());
        assert!(state.event_log[0].text.contains("kết thúc"));
    }

    #[test]
    fn leave_abandons_without_transfers() {
        let mut state = joined_state();
        let funds = state.player.linh_thach;
        handle_action(&mut state, AuctionAction::Bid);
        handle_action(&mut state, AuctionAction::Leave);
        assert!(state.auction.is_none());
        assert_eq!(state.player.linh_thach, funds);
    }
}
