//! Маунт, взлёт и призыв боевого компаньона.

use crate::fsm::{AgentCtx, AgentState};
use crate::logger;
use crate::sequencer::TaskSequencer;

/// Сесть на маунта: команда + каст + подтверждение по кондишенам
pub fn enqueue_mount(sequencer: &mut TaskSequencer) {
    sequencer.enqueue_action("Mount roulette", |ctx| ctx.services.actions.mount_up());
    sequencer.enqueue_wait("Casting=true", |ctx| ctx.world.player.casting);
    sequencer.enqueue_wait("Mounting=true", |ctx| {
        ctx.world.player.mounting || ctx.world.player.mounted
    });
    sequencer.enqueue_wait("Mounted=true", |ctx| ctx.world.player.mounted);
}

/// Взлететь (прыжок переводит маунта в полёт)
pub fn enqueue_takeoff(sequencer: &mut TaskSequencer) {
    sequencer.enqueue_action("Jump", |ctx| ctx.services.actions.jump());
    sequencer.enqueue_wait("Jumping=true", |ctx| {
        ctx.world.player.jumping || ctx.world.player.in_flight
    });
    sequencer.enqueue_wait("InFlight=true", |ctx| ctx.world.player.in_flight);
}

/// SummoningMount: компаньон активен → Ready; иначе призываем из расходника.
///
/// Без расходников не зависаем — предупреждаем и фармим без компаньона.
pub fn summon_companion(ctx: &mut AgentCtx) -> Option<AgentState> {
    let player = &ctx.world.player;

    if player.companion_time_left > 0.0 {
        return Some(AgentState::Ready);
    }
    if player.companion_summon_items == 0 {
        logger::log_warning("No companion summon items left, continuing without companion");
        return Some(AgentState::Ready);
    }
    if player.occupied || player.casting {
        return None;
    }

    ctx.sequencer
        .enqueue_action("Summon companion", |c| c.services.actions.summon_companion());
    ctx.sequencer.enqueue_wait("CompanionActive=true", |c| {
        c.world.player.companion_time_left > 0.0
    });
    None
}
