//! Телепорт к waypoint'у как скрипт секвенсера.

use crate::sequencer::TaskSequencer;
use crate::world::WaypointId;

/// Телепорт: команда + каст + переход между зонами.
///
/// Завершение каждого шага подтверждается snapshot'ом следующих тиков, не
/// возвращаемым значением команды.
pub fn enqueue_teleport(sequencer: &mut TaskSequencer, waypoint: WaypointId) {
    sequencer.enqueue_action(format!("Teleport to waypoint {waypoint}"), move |ctx| {
        ctx.services.actions.teleport(waypoint);
    });
    sequencer.enqueue_wait("Casting=true", |ctx| ctx.world.player.casting);
    sequencer.enqueue_wait("ZoneTransition=true", |ctx| ctx.world.player.zone_transition);
    sequencer.enqueue_wait("ZoneTransition=false", |ctx| !ctx.world.player.zone_transition);
}
