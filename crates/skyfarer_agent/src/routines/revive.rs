//! Восстановление после смерти.

use crate::fsm::{AgentCtx, AgentState};

/// Dead: подтверждаем prompt возрождения и ждём полный цикл — переход между
/// зонами начался → закончился → персонаж жив. Пока цепочка не дотекла (или
/// не сработал таймаут), остаёмся в Dead; при флаше очереди попадём сюда
/// снова и повторим с начала.
pub fn run(ctx: &mut AgentCtx) -> Option<AgentState> {
    if ctx.world.player.alive {
        // Цепочка возрождения дотекла
        return Some(AgentState::Ready);
    }

    if ctx.services.actions.confirm_prompt_open() {
        ctx.services.actions.confirm();
    }
    ctx.sequencer
        .enqueue_wait("ZoneTransition=true", |c| c.world.player.zone_transition);
    ctx.sequencer
        .enqueue_wait("ZoneTransition=false", |c| !c.world.player.zone_transition);
    ctx.sequencer.enqueue_wait("Alive=true", |c| c.world.player.alive);
    None
}
