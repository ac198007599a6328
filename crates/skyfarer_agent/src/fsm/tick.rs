//! Система переходов FSM (один вызов на FixedUpdate тик).

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::logger;
use crate::nav::{self, TravelPlan};
use crate::routines;
use crate::select;
use crate::sequencer::{TaskSequencer, TasksAborted};
use crate::services::ServiceHandles;
use crate::routines::instances::InstanceRotation;
use crate::world::{
    EventSnapshot, FieldEvent, Hostile, WaypointTable, WorldSnapshot, ZoneId,
};
use crate::{AgentConfig, DeterministicRng};

use super::{AgentCtx, AgentFsm, AgentSession, AgentState, EventTracking};

/// Мутабельное состояние агента (bundle, чтобы не раздувать сигнатуру системы)
#[derive(SystemParam)]
pub struct AgentStateParams<'w> {
    pub fsm: ResMut<'w, AgentFsm>,
    pub session: Res<'w, AgentSession>,
    pub rotation: ResMut<'w, InstanceRotation>,
    pub tracking: ResMut<'w, EventTracking>,
}

/// Read-only входы тика
#[derive(SystemParam)]
pub struct SnapshotParams<'w> {
    pub world: Res<'w, WorldSnapshot>,
    pub events: Res<'w, EventSnapshot>,
    pub waypoints: Res<'w, WaypointTable>,
    pub config: Res<'w, AgentConfig>,
}

/// Система: оценка состояния и переходы.
///
/// No-op пока секвенсер занят — единственная точка, где enforc'ится
/// инвариант single outstanding intent.
pub fn agent_fsm_tick(
    mut state: AgentStateParams,
    snapshots: SnapshotParams,
    services: Option<ResMut<ServiceHandles>>,
    mut sequencer: ResMut<TaskSequencer>,
    mut rng: ResMut<DeterministicRng>,
    mut aborted: EventReader<TasksAborted>,
) {
    let fsm = &mut *state.fsm;

    if fsm.state != fsm.previous {
        logger::log_info(&format!("State change: {:?} -> {:?}", fsm.previous, fsm.state));
        fsm.previous = fsm.state;
    }

    // Сброшенная по таймауту очередь — откат в Ready, перевыбор со
    // следующего тика (в тик восстановления ничего не решаем)
    let mut recovered = false;
    for abort in aborted.read() {
        logger::log_warning(&format!(
            "Recovering to Ready after aborted task '{}'",
            abort.label
        ));
        recovered = true;
    }
    if recovered {
        fsm.state = AgentState::Ready;
        return;
    }

    let Some(mut services) = services else {
        logger::log_debug("Services not attached yet, agent idle");
        return;
    };

    let player = &snapshots.world.player;
    if !player.available || sequencer.is_busy() {
        return;
    }

    if !state.session.active {
        // Выключенный агент паркуется в Ready, счётчики сессии сбрасываем
        fsm.state = AgentState::Ready;
        state.rotation.successive_changes = 0;
        state.tracking.clear();
        return;
    }

    // Смерть пре-эмптит любое состояние и любое начатое решение
    if !player.alive && fsm.state != AgentState::Dead {
        fsm.state = AgentState::Dead;
    }

    let mut ctx = AgentCtx {
        config: &snapshots.config,
        session: &state.session,
        world: &snapshots.world,
        events: &snapshots.events,
        waypoints: &snapshots.waypoints,
        services: &mut services,
        sequencer: &mut sequencer,
        rotation: &mut state.rotation,
        tracking: &mut state.tracking,
        rng: &mut rng.rng,
    };

    let next = match fsm.state {
        AgentState::Dead => routines::revive::run(&mut ctx),
        AgentState::Ready => handle_ready(&mut ctx),
        AgentState::SummoningMount => routines::mount::summon_companion(&mut ctx),
        AgentState::Mounting => handle_mounting(&mut ctx),
        AgentState::MovingToEvent => handle_moving(&mut ctx),
        AgentState::InteractingWithNpc => None,
        AgentState::InCombat => handle_combat(&mut ctx),
        AgentState::ChangingInstances => {
            if routines::instances::run(&mut ctx) {
                Some(AgentState::Ready)
            } else {
                None
            }
        }
        AgentState::ExchangingVouchers => routines::exchange::run(&mut ctx),
    };

    if let Some(next) = next {
        fsm.state = next;
    }
}

/// Ready — развилка: домой / компаньон / бой / обмен / ротация / к событию
fn handle_ready(ctx: &mut AgentCtx) -> Option<AgentState> {
    let player = &ctx.world.player;

    if player.zone != ctx.session.home_zone {
        let home = ctx.session.home_zone;
        teleport_to_zone(ctx, home);
        return None;
    }
    if player.companion_time_left <= 0.0 {
        return Some(AgentState::SummoningMount);
    }
    if ctx.events.active().is_some() {
        // Уже стоим внутри события — сразу в бой
        return Some(AgentState::InCombat);
    }
    if player.currency >= ctx.config.currency_threshold {
        return Some(AgentState::ExchangingVouchers);
    }
    if select::pick_event(&ctx.events.events, player, ctx.config).is_none() {
        if ctx.config.change_instances {
            return Some(AgentState::ChangingInstances);
        }
        return None;
    }
    Some(AgentState::MovingToEvent)
}

/// Mounting — маунт, потом взлёт; в воздухе продолжаем путь
fn handle_mounting(ctx: &mut AgentCtx) -> Option<AgentState> {
    let player = &ctx.world.player;

    if ctx.config.auto(ctx.config.auto_mount) && !player.occupied && !player.mounted {
        routines::mount::enqueue_mount(ctx.sequencer);
    } else if ctx.config.auto(ctx.config.auto_fly)
        && !player.occupied
        && player.mounted
        && !player.in_flight
    {
        routines::mount::enqueue_takeoff(ctx.sequencer);
    } else if player.in_flight {
        return Some(AgentState::MovingToEvent);
    }
    None
}

/// MovingToEvent — перевыбор кандидата каждый тик (события уходят из-под ног)
fn handle_moving(ctx: &mut AgentCtx) -> Option<AgentState> {
    // Событие нашли — серия безрезультатных ротаций прервана
    ctx.rotation.successive_changes = 0;

    let player = &ctx.world.player;
    let Some(next) = select::pick_event(&ctx.events.events, player, ctx.config) else {
        // Выбранное событие исчезло по дороге
        return Some(AgentState::Ready);
    };

    ctx.services.actions.set_map_flag(player.zone, next.position);

    if !player.in_flight {
        return Some(AgentState::Mounting);
    }

    if !ctx.services.navigation_busy() {
        if ctx.events.active().is_some() {
            return Some(AgentState::InCombat);
        }
        // Навигация свободна — выдаём СВЕЖИЙ маршрут, не переиспользуем старый
        move_to_event(ctx, next);
    }
    None
}

/// Выбор способа добраться и выдача travel-команды
fn move_to_event(ctx: &mut AgentCtx, event: &FieldEvent) {
    if !ctx.config.auto(ctx.config.path_to_event) {
        return;
    }
    let player = &ctx.world.player;
    if !ctx.services.pathfinder.is_ready() {
        logger::log_debug("Pathfinder not ready, retrying next tick");
        return;
    }
    if player.in_combat || player.occupied {
        return;
    }

    let point = nav::approach_point(event, ctx.rng, ctx.services.pathfinder.as_ref());
    match nav::plan_travel(player.position, point, player.zone, ctx.waypoints) {
        TravelPlan::Teleport(waypoint) => {
            routines::travel::enqueue_teleport(ctx.sequencer, waypoint);
        }
        TravelPlan::DirectFlight(destination) => {
            ctx.services.pathfinder.pathfind_and_move_to(destination, true);
        }
    }
}

/// InCombat — targeting и сближение; ротацию скиллов крутит внешний модуль
fn handle_combat(ctx: &mut AgentCtx) -> Option<AgentState> {
    let player = &ctx.world.player;
    let active = ctx.events.active();

    if active.is_none() && !player.in_combat && !player.casting {
        // Событие закончилось и бой стих
        ctx.tracking.clear();
        return Some(AgentState::Ready);
    }

    // Верхом не воюют
    if player.mounted {
        ctx.services.actions.dismount();
    }

    let standoff = if ctx.config.stay_in_melee_range {
        0.0
    } else {
        nav::MAX_STANDOFF
    };

    let current = player
        .target
        .and_then(|id| ctx.world.hostiles.iter().find(|h| h.id == id));

    // Дошли до цели — глушим pathfinder, дальше работает боевой модуль
    if ctx.services.pathfinder.is_running() {
        if let Some(target) = current {
            if player.position.distance(target.position) < nav::MELEE_RANGE
                || nav::in_melee_range(player.position, target.position, target.hitbox_radius, standoff)
            {
                ctx.services.pathfinder.stop();
                return None;
            }
        }
    }

    // Неожиданный бой вне события: отбиваемся от того, кто целится в нас
    let mut target = current;
    if target.is_none() && player.in_combat {
        target = select::pick_assailant(&ctx.world.hostiles, player);
    }

    if let Some(event) = active {
        let sync = ctx.config.auto(ctx.config.auto_sync);
        ctx.tracking
            .update(event.id, player, event, sync, ctx.services.actions.as_mut());
        if target.is_none() {
            target = select::pick_event_target(&ctx.world.hostiles, event, player, ctx.config);
        }
    }

    if let Some(target) = target {
        let needs_approach = player.target != Some(target.id)
            || !nav::in_melee_range(player.position, target.position, target.hitbox_radius, standoff);
        if ctx.config.auto(ctx.config.auto_move_to_targets) && needs_approach {
            engage(ctx, target, standoff);
        }
    }
    None
}

/// Взять цель и сблизиться пешком (в бою не летаем)
fn engage(ctx: &mut AgentCtx, target: &Hostile, standoff: f32) {
    let player = &ctx.world.player;
    if player.mounted {
        ctx.services.actions.dismount();
    }
    if ctx.config.auto(ctx.config.auto_target) && player.target != Some(target.id) {
        ctx.services.actions.set_target(target.id);
    }
    if ctx.config.auto(ctx.config.auto_move_to_targets)
        && !ctx.services.pathfinder.pathfind_in_progress()
        && !nav::in_melee_range(player.position, target.position, target.hitbox_radius, standoff)
    {
        ctx.services.pathfinder.pathfind_and_move_to(target.position, false);
    }
}

/// Телепорт к primary waypoint'у зоны (если он вообще известен)
fn teleport_to_zone(ctx: &mut AgentCtx, zone: ZoneId) {
    match ctx.waypoints.primary_in_zone(zone) {
        Some(waypoint) => routines::travel::enqueue_teleport(ctx.sequencer, waypoint.id),
        None => logger::log_warning(&format!(
            "No waypoint known for zone {zone}, cannot teleport"
        )),
    }
}
