//! Обмен накопленной валюты у торговца.
//!
//! Guard-loop: пока валюты хватает — едем к торговцу и скупаем пачками,
//! как только упали ниже порога — закрываем окно и возвращаемся в свою
//! зону. Каждый тик делает один идемпотентный шаг.

use bevy::prelude::*;

use crate::fsm::{AgentCtx, AgentState};
use crate::logger;
use crate::routines::travel;
use crate::world::{DataId, ZoneId};

/// Зона обменника и сам торговец — фиксированные игровые данные
const EXCHANGE_ZONE: ZoneId = 962;
const EXCHANGE_VENDOR_DATA_ID: DataId = 1037055;
const EXCHANGE_VENDOR_POSITION: Vec3 = Vec3::new(74.17, 5.15, -37.44);
/// Ближе этого торговец считается "рядом" и до него не идём
const VENDOR_NEARBY_RANGE: f32 = 5.0;
/// Цена одной покупки — объём пачки считаем из остатка валюты
const VOUCHER_PRICE: u32 = 100;

pub fn run(ctx: &mut AgentCtx) -> Option<AgentState> {
    if ctx.services.navigation_busy() {
        return None;
    }

    let player = &ctx.world.player;

    if player.currency < ctx.config.currency_threshold {
        // Валюта потрачена: закрываем окно и едем обратно фармить
        if ctx.services.actions.exchange_open() {
            ctx.services.actions.close_exchange();
        }
        if !player.occupied {
            if player.zone == ctx.session.home_zone {
                return Some(AgentState::Ready);
            }
            let home = ctx.session.home_zone;
            match ctx.waypoints.primary_in_zone(home) {
                Some(waypoint) => travel::enqueue_teleport(ctx.sequencer, waypoint.id),
                None => logger::log_warning(&format!(
                    "No waypoint known for home zone {home}, cannot return"
                )),
            }
        }
        return None;
    }

    if player.zone != EXCHANGE_ZONE {
        match ctx.waypoints.primary_in_zone(EXCHANGE_ZONE) {
            Some(waypoint) => travel::enqueue_teleport(ctx.sequencer, waypoint.id),
            None => logger::log_warning("No waypoint known for the exchange zone"),
        }
        return None;
    }

    // Торговец должен быть в object table и рядом, иначе идём к его точке
    let vendor = ctx
        .world
        .objects
        .iter()
        .find(|o| o.data_id == EXCHANGE_VENDOR_DATA_ID)
        .filter(|v| v.position.distance(player.position) <= VENDOR_NEARBY_RANGE);
    let Some(vendor) = vendor else {
        logger::log_debug("Exchange vendor not nearby, walking to the stall");
        ctx.services
            .pathfinder
            .pathfind_and_move_to(EXCHANGE_VENDOR_POSITION, false);
        return None;
    };

    if player.target != Some(vendor.id) {
        ctx.services.actions.set_target(vendor.id);
    }
    if !player.occupied {
        ctx.services.actions.interact(vendor.id);
    }

    if ctx.services.actions.exchange_open() {
        if ctx.services.actions.confirm_prompt_open() {
            ctx.services.actions.confirm();
        } else {
            // Пачка из всего остатка; guard перепроверится на следующем тике
            ctx.services.actions.buy_vouchers(player.currency / VOUCHER_PRICE);
        }
    }
    None
}
