//! Agent integration scenarios
//!
//! Гоняем реальный plugin headless против заскриптованных коллабораторов,
//! тик за тиком. Каждый тест: собрать мир → покрутить FixedUpdate →
//! проверить состояния/счётчики.

use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use skyfarer_agent::world::{
    EventId, EventSnapshot, FieldEvent, Hostile, ObjectId, ObjectKind, ObjectSnapshot, Waypoint,
    WaypointId, WaypointTable, WorldSnapshot,
};
use skyfarer_agent::{
    create_headless_app, nav, AgentConfig, AgentFsm, AgentSession, AgentState, EventSource,
    EventTracking, GameActions, InstanceGateway, InstanceRotation, Pathfinder, ServiceHandles,
    TaskSequencer, WorldSource,
};

const HOME_ZONE: u16 = 612;
const EXCHANGE_ZONE: u16 = 962;
const HOME_WAYPOINT: WaypointId = 11;
const EXCHANGE_WAYPOINT: WaypointId = 21;
const VENDOR_ID: ObjectId = 900;
const VENDOR_DATA_ID: u32 = 1037055;
const KILL_TICKS: u32 = 20;

// --- Заскриптованный мир ---

enum Pending {
    Teleport(WaypointId),
    Mount,
}

struct SimState {
    world: WorldSnapshot,
    events: EventSnapshot,
    waypoints: Vec<Waypoint>,

    pending: Option<Pending>,
    pending_zone: Option<WaypointId>,
    cast_ticks: u32,
    transition_ticks: u32,
    jump_pending: bool,
    nav_target: Option<Vec3>,
    nav_ticks_left: u32,
    kill_ticks: u32,

    instance: u32,
    instance_count: u32,
    confirm_needed: bool,
    exchange_open: bool,

    // Записи для assert'ов
    teleports: Vec<WaypointId>,
    changes: Vec<u32>,
    purchases: Vec<u32>,
    map_flags: u32,
    level_syncs: u32,
}

impl SimState {
    fn base() -> Self {
        let mut world = WorldSnapshot::default();
        world.player.zone = HOME_ZONE;
        world.player.level = 90;
        world.player.companion_time_left = 3600.0;

        Self {
            world,
            events: EventSnapshot::default(),
            waypoints: Vec::new(),
            pending: None,
            pending_zone: None,
            cast_ticks: 0,
            transition_ticks: 0,
            jump_pending: false,
            nav_target: None,
            nav_ticks_left: 0,
            kill_ticks: KILL_TICKS,
            instance: 1,
            instance_count: 1,
            confirm_needed: true,
            exchange_open: false,
            teleports: Vec::new(),
            changes: Vec::new(),
            purchases: Vec::new(),
            map_flags: 0,
            level_syncs: 0,
        }
    }

    /// Один тик мира: касты, переходы, прыжок, навигация, "бой"
    fn advance(&mut self) {
        let active_id = self.active_event_id();

        if self.cast_ticks > 0 {
            self.world.player.casting = true;
            self.cast_ticks -= 1;
            if self.cast_ticks == 0 {
                self.world.player.casting = false;
                match self.pending.take() {
                    Some(Pending::Teleport(waypoint)) => {
                        self.transition_ticks = 3;
                        self.pending_zone = Some(waypoint);
                    }
                    Some(Pending::Mount) => self.world.player.mounted = true,
                    None => {}
                }
            }
        }

        if self.transition_ticks > 0 {
            self.world.player.zone_transition = true;
            self.transition_ticks -= 1;
            if self.transition_ticks == 0 {
                self.world.player.zone_transition = false;
                self.world.player.occupied = false;
                if let Some(waypoint) = self.pending_zone.take() {
                    if let Some(w) = self.waypoints.iter().find(|w| w.id == waypoint) {
                        self.world.player.zone = w.zone;
                        self.world.player.position = w.position;
                        self.world.player.mounted = false;
                        self.world.player.in_flight = false;
                    }
                }
            }
        }

        if self.world.player.jumping {
            self.world.player.jumping = false;
            self.world.player.in_flight = true;
        }
        if self.jump_pending {
            self.world.player.jumping = true;
            self.jump_pending = false;
        }

        if self.nav_ticks_left > 0 {
            self.nav_ticks_left -= 1;
            if self.nav_ticks_left == 0 {
                if let Some(target) = self.nav_target.take() {
                    self.world.player.position = target;
                }
            }
        }

        // "Бой": цель у ног умирает через KILL_TICKS тиков
        if let (Some(event_id), Some(target)) = (active_id, self.world.player.target) {
            if let Some(hostile) = self.world.hostiles.iter().find(|h| h.id == target) {
                self.world.player.in_combat = true;
                if self.world.player.position.distance(hostile.position) < 25.0 {
                    self.kill_ticks -= 1;
                    if self.kill_ticks == 0 {
                        self.kill_ticks = KILL_TICKS;
                        self.world.hostiles.retain(|h| h.id != target);
                        self.world.player.target = None;
                    }
                }
            }
            if !self.world.hostiles.iter().any(|h| h.event_id == event_id) {
                // Все мобы события выбиты — событие завершено
                self.events.events.retain(|e| e.id != event_id);
                self.world.player.in_combat = false;
                self.world.player.currency += 100;
            }
        }

        self.events.active = self.active_event_id();
    }

    fn active_event_id(&self) -> Option<EventId> {
        self.events
            .events
            .iter()
            .find(|e| nav::horizontal_distance(self.world.player.position, e.position) < e.radius)
            .map(|e| e.id)
    }
}

type Shared = Arc<Mutex<SimState>>;

struct SimPathfinder(Shared);

impl Pathfinder for SimPathfinder {
    fn is_ready(&self) -> bool {
        true
    }
    fn is_running(&self) -> bool {
        self.0.lock().unwrap().nav_ticks_left > 0
    }
    fn pathfind_in_progress(&self) -> bool {
        false
    }
    fn pathfind_and_move_to(&mut self, point: Vec3, _fly: bool) {
        let mut sim = self.0.lock().unwrap();
        // Повторная команда к той же точке не сбрасывает прогресс пути
        if sim.nav_target != Some(point) {
            sim.nav_target = Some(point);
            sim.nav_ticks_left = 30;
        }
    }
    fn stop(&mut self) {
        let mut sim = self.0.lock().unwrap();
        sim.nav_target = None;
        sim.nav_ticks_left = 0;
    }
    fn nearest_point(&self, point: Vec3, _h: f32, _v: f32) -> Option<Vec3> {
        Some(point)
    }
}

struct SimGateway(Shared);

impl InstanceGateway for SimGateway {
    fn instance_count(&self) -> u32 {
        self.0.lock().unwrap().instance_count
    }
    fn current_instance(&self) -> u32 {
        self.0.lock().unwrap().instance
    }
    fn can_change_instance(&self) -> bool {
        true
    }
    fn change_instance(&mut self, target: u32) -> bool {
        let mut sim = self.0.lock().unwrap();
        sim.instance = target;
        sim.changes.push(target);
        sim.transition_ticks = 2;
        true
    }
}

struct SimActions(Shared);

impl GameActions for SimActions {
    fn teleport(&mut self, waypoint: WaypointId) {
        let mut sim = self.0.lock().unwrap();
        sim.teleports.push(waypoint);
        sim.pending = Some(Pending::Teleport(waypoint));
        sim.cast_ticks = 3;
    }
    fn mount_up(&mut self) {
        let mut sim = self.0.lock().unwrap();
        sim.pending = Some(Pending::Mount);
        sim.cast_ticks = 2;
    }
    fn dismount(&mut self) {
        let mut sim = self.0.lock().unwrap();
        sim.world.player.mounted = false;
        sim.world.player.in_flight = false;
    }
    fn jump(&mut self) {
        self.0.lock().unwrap().jump_pending = true;
    }
    fn summon_companion(&mut self) {
        let mut sim = self.0.lock().unwrap();
        sim.world.player.companion_summon_items -= 1;
        sim.world.player.companion_time_left = 1800.0;
    }
    fn set_target(&mut self, id: ObjectId) {
        self.0.lock().unwrap().world.player.target = Some(id);
    }
    fn interact(&mut self, id: ObjectId) {
        let mut sim = self.0.lock().unwrap();
        sim.world.player.occupied = true;
        if id == VENDOR_ID {
            sim.exchange_open = true;
        }
    }
    fn level_sync(&mut self) {
        let mut sim = self.0.lock().unwrap();
        sim.level_syncs += 1;
        sim.world.player.level_synced = true;
    }
    fn set_map_flag(&mut self, _zone: u16, _position: Vec3) {
        self.0.lock().unwrap().map_flags += 1;
    }
    fn exchange_open(&self) -> bool {
        self.0.lock().unwrap().exchange_open
    }
    fn confirm_prompt_open(&self) -> bool {
        let sim = self.0.lock().unwrap();
        sim.exchange_open && sim.confirm_needed
    }
    fn confirm(&mut self) {
        self.0.lock().unwrap().confirm_needed = false;
    }
    fn close_exchange(&mut self) {
        let mut sim = self.0.lock().unwrap();
        sim.exchange_open = false;
        sim.world.player.occupied = false;
    }
    fn buy_vouchers(&mut self, quantity: u32) {
        let mut sim = self.0.lock().unwrap();
        sim.purchases.push(quantity);
        let spent = quantity * 100;
        sim.world.player.currency = sim.world.player.currency.saturating_sub(spent);
    }
}

struct SimWorld(Shared);

impl WorldSource for SimWorld {
    fn snapshot(&self) -> WorldSnapshot {
        self.0.lock().unwrap().world.clone()
    }
}

struct SimEvents(Shared);

impl EventSource for SimEvents {
    fn snapshot(&self) -> EventSnapshot {
        self.0.lock().unwrap().events.clone()
    }
}

// --- Helpers ---

/// Собрать headless app с заскриптованным миром, сессия активна
fn setup(sim: SimState) -> (App, Shared) {
    let mut app = create_headless_app(7);
    app.insert_resource(WaypointTable::new(sim.waypoints.clone()));

    let shared: Shared = Arc::new(Mutex::new(sim));
    app.insert_resource(ServiceHandles {
        pathfinder: Box::new(SimPathfinder(Arc::clone(&shared))),
        instances: Box::new(SimGateway(Arc::clone(&shared))),
        actions: Box::new(SimActions(Arc::clone(&shared))),
        world: Box::new(SimWorld(Arc::clone(&shared))),
        events: Box::new(SimEvents(Arc::clone(&shared))),
    });
    app.world_mut()
        .resource_mut::<AgentSession>()
        .activate(HOME_ZONE);
    (app, shared)
}

/// Один тик: мир вперёд → FixedUpdate (детерминированно, без wall clock)
fn tick(app: &mut App, sim: &Shared) {
    sim.lock().unwrap().advance();
    app.world_mut().run_schedule(FixedUpdate);
}

fn state_of(app: &App) -> AgentState {
    app.world().resource::<AgentFsm>().state
}

// --- Scenarios ---

/// Смерть пре-эмптит любое состояние; после цепочки возрождения — Ready
#[test]
fn test_death_preempts_any_state() {
    let (mut app, shared) = setup(SimState::base());

    app.world_mut().resource_mut::<AgentFsm>().state = AgentState::MovingToEvent;
    shared.lock().unwrap().world.player.alive = false;

    tick(&mut app, &shared);
    assert_eq!(state_of(&app), AgentState::Dead);
    // Очередь возрождения встала в ожидание зонного перехода
    assert!(app.world().resource::<TaskSequencer>().is_busy());

    // Скриптуем возрождение: переход начался → закончился → персонаж жив
    shared.lock().unwrap().world.player.zone_transition = true;
    tick(&mut app, &shared);
    tick(&mut app, &shared);
    {
        let mut sim = shared.lock().unwrap();
        sim.world.player.zone_transition = false;
        sim.world.player.alive = true;
    }
    for _ in 0..10 {
        tick(&mut app, &shared);
        if state_of(&app) == AgentState::Ready {
            break;
        }
    }

    assert_eq!(state_of(&app), AgentState::Ready);
    assert_eq!(app.world().resource::<TaskSequencer>().len(), 0);
}

/// Зависший предикат: после таймаута очередь пуста и агент снова в Ready
#[test]
fn test_timeout_recovers_to_ready() {
    let (mut app, shared) = setup(SimState::base());
    {
        let mut config = app.world_mut().resource_mut::<AgentConfig>();
        config.task_timeout_ticks = 5;
        // Не даём Ready уйти в ротацию после восстановления
        config.change_instances = false;
    }
    app.world_mut().resource_mut::<AgentFsm>().state = AgentState::Mounting;
    app.world_mut()
        .resource_mut::<TaskSequencer>()
        .enqueue_wait("never satisfied", |_| false);

    for _ in 0..10 {
        tick(&mut app, &shared);
    }

    assert_eq!(app.world().resource::<TaskSequencer>().len(), 0);
    assert_eq!(state_of(&app), AgentState::Ready);
}

/// После (count - 1) ротаций подряд — cooldown и сброс счётчика, не
/// четвёртая попытка
#[test]
fn test_rotation_bound_enters_cooldown() {
    let mut sim = SimState::base();
    sim.instance_count = 4;
    sim.waypoints = vec![Waypoint {
        id: HOME_WAYPOINT,
        zone: HOME_ZONE,
        position: Vec3::ZERO,
    }];
    sim.world.objects = vec![ObjectSnapshot {
        id: 101,
        data_id: HOME_WAYPOINT,
        kind: ObjectKind::Waypoint,
        position: Vec3::ZERO,
    }];
    let (mut app, shared) = setup(sim);

    for _ in 0..300 {
        tick(&mut app, &shared);
    }

    let sim = shared.lock().unwrap();
    // 1 → 2 → 3 → 4, четвёртой смены нет
    assert_eq!(sim.changes, vec![2, 3, 4]);
    assert_eq!(
        app.world().resource::<InstanceRotation>().successive_changes,
        0
    );
    // Стоим в cooldown'е
    assert_eq!(state_of(&app), AgentState::ChangingInstances);
    assert!(app.world().resource::<TaskSequencer>().is_busy());
}

/// Полный цикл: Ready → MovingToEvent → Mounting → полёт → InCombat →
/// событие закончилось → Ready (tracking сброшен, level sync выдан)
#[test]
fn test_event_cycle_reaches_combat_and_returns() {
    let mut sim = SimState::base();
    sim.waypoints = vec![Waypoint {
        id: HOME_WAYPOINT,
        zone: HOME_ZONE,
        position: Vec3::new(-500.0, 0.0, 0.0),
    }];
    sim.events.events = vec![FieldEvent {
        id: 9,
        position: Vec3::new(200.0, 0.0, 0.0),
        radius: 80.0,
        max_level: 60,
        ..Default::default()
    }];
    sim.world.hostiles = vec![Hostile {
        id: 501,
        event_id: 9,
        position: Vec3::new(190.0, 0.0, 10.0),
        ..Default::default()
    }];
    let (mut app, shared) = setup(sim);

    let mut visited = Vec::new();
    for _ in 0..400 {
        tick(&mut app, &shared);
        let state = state_of(&app);
        if visited.last() != Some(&state) {
            visited.push(state);
        }
        let done = shared.lock().unwrap().events.events.is_empty();
        if done && state == AgentState::Ready {
            break;
        }
    }

    assert!(visited.contains(&AgentState::MovingToEvent), "{visited:?}");
    assert!(visited.contains(&AgentState::Mounting), "{visited:?}");
    assert!(visited.contains(&AgentState::InCombat), "{visited:?}");
    assert_eq!(state_of(&app), AgentState::Ready);

    let sim = shared.lock().unwrap();
    assert!(sim.events.events.is_empty(), "event not completed");
    assert_eq!(sim.level_syncs, 1);
    assert!(sim.map_flags > 0);
    // Tracking сброшен после боя
    assert_eq!(app.world().resource::<EventTracking>().current(), 0);
}

/// Валюта выше порога: поездка к обменнику, закупка пачкой, возврат домой
#[test]
fn test_exchange_roundtrip() {
    let vendor_position = Vec3::new(74.17, 5.15, -37.44);
    let mut sim = SimState::base();
    sim.world.player.currency = 1500;
    sim.waypoints = vec![
        Waypoint { id: HOME_WAYPOINT, zone: HOME_ZONE, position: Vec3::ZERO },
        Waypoint { id: EXCHANGE_WAYPOINT, zone: EXCHANGE_ZONE, position: vendor_position },
    ];
    sim.world.objects = vec![ObjectSnapshot {
        id: VENDOR_ID,
        data_id: VENDOR_DATA_ID,
        kind: ObjectKind::Vendor,
        position: vendor_position,
    }];
    let (mut app, shared) = setup(sim);

    for _ in 0..200 {
        tick(&mut app, &shared);
        let back_home = {
            let sim = shared.lock().unwrap();
            !sim.purchases.is_empty() && sim.world.player.zone == HOME_ZONE
        };
        if back_home && state_of(&app) == AgentState::Ready {
            break;
        }
    }

    let sim = shared.lock().unwrap();
    // 1500 / 100 = 15 одной пачкой
    assert_eq!(sim.purchases, vec![15]);
    assert_eq!(sim.world.player.currency, 0);
    assert!(sim.teleports.contains(&EXCHANGE_WAYPOINT));
    assert!(sim.teleports.contains(&HOME_WAYPOINT));
    assert_eq!(sim.world.player.zone, HOME_ZONE);
    assert_eq!(state_of(&app), AgentState::Ready);
}

/// Без подключённых сервисов агент просто ждёт — ни паники, ни переходов
#[test]
fn test_missing_services_is_noop() {
    let mut app = create_headless_app(5);
    app.world_mut()
        .resource_mut::<AgentSession>()
        .activate(HOME_ZONE);

    for _ in 0..5 {
        app.world_mut().run_schedule(FixedUpdate);
    }
    assert_eq!(state_of(&app), AgentState::Ready);
}

/// Выключенный агент паркуется в Ready из любого состояния
#[test]
fn test_inactive_agent_parks_in_ready() {
    let (mut app, shared) = setup(SimState::base());
    app.world_mut().resource_mut::<AgentSession>().deactivate();
    app.world_mut().resource_mut::<AgentFsm>().state = AgentState::InCombat;

    tick(&mut app, &shared);
    assert_eq!(state_of(&app), AgentState::Ready);
}
