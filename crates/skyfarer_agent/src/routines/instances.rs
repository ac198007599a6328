//! Ротация параллельных копий зоны.
//!
//! Когда подходящих событий нет, перекатываемся в следующий инстанс через
//! ближайший waypoint. Каждый вызов `run` делает один идемпотентный шаг —
//! безопасно переоценивать каждый тик, пока precondition не выполнится.

use bevy::prelude::*;

use crate::fsm::AgentCtx;
use crate::logger;
use crate::routines::travel;
use crate::world::ObjectKind;

/// Дальше этого — быстрее телепортнуться к waypoint'у, чем лететь
const WAYPOINT_TELEPORT_RANGE: f32 = 50.0;
/// Интеракция срабатывает примерно с 8-10 юнитов
const WAYPOINT_INTERACT_RANGE: f32 = 10.0;
/// Ближе 8 упрёмся в постамент
const WAYPOINT_APPROACH_OFFSET: f32 = 8.0;
/// Стоим сильно выше объекта — "цель слишком низко", надо спуститься
const WAYPOINT_MAX_DROP: f32 = 2.0;

/// Счётчик подряд идущих смен инстанса без единого найденного события.
/// Сбрасывается при входе в MovingToEvent и после cooldown'а.
#[derive(Resource, Debug, Default)]
pub struct InstanceRotation {
    pub successive_changes: u32,
}

/// Один шаг ротации; true = смена инстанса запущена, агент идёт в Ready
pub fn run(ctx: &mut AgentCtx) -> bool {
    let count = ctx.services.instances.instance_count();
    logger::log_debug(&format!(
        "Successive instance changes: {}",
        ctx.rotation.successive_changes
    ));

    // Полный круг без событий — спавны зоны выбиты, пауза перед повтором
    if ctx.rotation.successive_changes >= count.saturating_sub(1) {
        logger::log_info("Cycled through all instances, cooling down before retry");
        ctx.sequencer
            .enqueue_delay("Rotation cooldown", ctx.config.rotation_cooldown_ticks);
        ctx.rotation.successive_changes = 0;
        return false;
    }

    if ctx.services.navigation_busy() {
        return false;
    }

    let player = &ctx.world.player;
    let Some(waypoint) = ctx.waypoints.nearest_in_zone(player.zone, player.position) else {
        logger::log_warning(&format!(
            "No waypoint known in zone {}, cannot rotate instances",
            player.zone
        ));
        return false;
    };

    if waypoint.position.distance(player.position) >= WAYPOINT_TELEPORT_RANGE {
        logger::log_debug(&format!("Teleporting to nearby waypoint {}", waypoint.id));
        travel::enqueue_teleport(ctx.sequencer, waypoint.id);
        return false;
    }

    // Таргетим объект waypoint'а в мире
    let Some(object) = ctx
        .world
        .objects
        .iter()
        .find(|o| o.kind == ObjectKind::Waypoint && o.data_id == waypoint.id)
    else {
        logger::log_debug("Waypoint object not in the object table yet");
        return false;
    };

    if player.target != Some(object.id) {
        ctx.services.actions.set_target(object.id);
        return false;
    }

    // Слишком далеко для интеракции или стоим сильно выше — подходим пешком
    let distance = player.position.distance(object.position);
    if distance > WAYPOINT_INTERACT_RANGE
        || player.position.y - object.position.y > WAYPOINT_MAX_DROP
    {
        let mut closer = object.position
            - (object.position - player.position).normalize_or_zero() * WAYPOINT_APPROACH_OFFSET;
        closer.y = closer.y.min(object.position.y + 1.0);
        ctx.services.pathfinder.pathfind_and_move_to(closer, false);
        return false;
    }

    if !player.occupied {
        ctx.services.actions.interact(object.id);
        return false;
    }

    if !ctx.services.instances.can_change_instance() {
        logger::log_debug("Cannot change instance at this time");
        return false;
    }

    // Следующий инстанс, 1-indexed wrap
    let next = ctx.services.instances.current_instance() % count + 1;
    logger::log_info(&format!("Changing to instance {next}/{count}"));
    ctx.sequencer
        .enqueue_action(format!("Change to instance {next}"), move |c| {
            c.services.instances.change_instance(next);
        });
    ctx.sequencer
        .enqueue_wait("ZoneTransition=true", |c| c.world.player.zone_transition);
    ctx.sequencer
        .enqueue_wait("ZoneTransition=false", |c| !c.world.player.zone_transition);

    ctx.rotation.successive_changes += 1;
    true
}
