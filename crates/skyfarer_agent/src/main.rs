//! Headless прогон SKYFARER.
//!
//! Запускает агента против заскриптованного мира: одно событие, два моба,
//! обменник и два инстанса. Полезно для отладки цикла решений без игры.

use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use skyfarer_agent::world::{
    EventId, EventSnapshot, FieldEvent, Hostile, ObjectId, ObjectKind, ObjectSnapshot, Waypoint,
    WaypointId, WaypointTable, WorldSnapshot,
};
use skyfarer_agent::{
    create_headless_app, nav, AgentFsm, AgentSession, EventSource, GameActions, InstanceGateway,
    Pathfinder, ServiceHandles, WorldSource,
};

const HOME_ZONE: u16 = 612;
const EXCHANGE_ZONE: u16 = 962;
const HOME_WAYPOINT: WaypointId = 11;
const FAR_WAYPOINT: WaypointId = 12;
const EXCHANGE_WAYPOINT: WaypointId = 21;
const VENDOR_ID: ObjectId = 900;
const KILL_TICKS: u32 = 40;

/// Отложенный эффект каста
enum Pending {
    Teleport(WaypointId),
    Mount,
}

/// Заскриптованный мир: минимум механики, чтобы агент прошёл полный цикл
struct SimState {
    world: WorldSnapshot,
    events: EventSnapshot,
    waypoints: WaypointTable,

    pending: Option<Pending>,
    pending_zone: Option<WaypointId>,
    cast_ticks: u32,
    transition_ticks: u32,
    jump_pending: bool,
    nav_target: Option<Vec3>,
    nav_ticks_left: u32,
    kill_ticks: u32,
    confirm_needed: bool,
    exchange_open: bool,

    instance: u32,
    instance_count: u32,
}

impl SimState {
    fn scripted() -> Self {
        let waypoints = WaypointTable::new(vec![
            Waypoint { id: HOME_WAYPOINT, zone: HOME_ZONE, position: Vec3::ZERO },
            Waypoint { id: FAR_WAYPOINT, zone: HOME_ZONE, position: Vec3::new(500.0, 0.0, 250.0) },
            Waypoint { id: EXCHANGE_WAYPOINT, zone: EXCHANGE_ZONE, position: Vec3::new(74.0, 5.0, -70.0) },
        ]);

        let mut world = WorldSnapshot::default();
        world.player.zone = HOME_ZONE;
        world.player.level = 90;
        world.player.companion_summon_items = 5;
        world.objects = vec![
            ObjectSnapshot { id: 101, data_id: HOME_WAYPOINT, kind: ObjectKind::Waypoint, position: Vec3::ZERO },
            ObjectSnapshot { id: 102, data_id: FAR_WAYPOINT, kind: ObjectKind::Waypoint, position: Vec3::new(500.0, 0.0, 250.0) },
            ObjectSnapshot { id: VENDOR_ID, data_id: 1037055, kind: ObjectKind::Vendor, position: Vec3::new(74.17, 5.15, -37.44) },
        ];
        world.hostiles = vec![
            Hostile { id: 501, event_id: 1, position: Vec3::new(590.0, 0.0, 290.0), ..Default::default() },
            Hostile { id: 502, event_id: 1, position: Vec3::new(610.0, 0.0, 310.0), ..Default::default() },
        ];

        let events = EventSnapshot {
            events: vec![FieldEvent {
                id: 1,
                position: Vec3::new(600.0, 0.0, 300.0),
                radius: 80.0,
                max_level: 60,
                ..Default::default()
            }],
            active: None,
        };

        Self {
            world,
            events,
            waypoints,
            pending: None,
            pending_zone: None,
            cast_ticks: 0,
            transition_ticks: 0,
            jump_pending: false,
            nav_target: None,
            nav_ticks_left: 0,
            kill_ticks: KILL_TICKS,
            confirm_needed: true,
            exchange_open: false,
            instance: 1,
            instance_count: 2,
        }
    }

    /// Один тик мира: касты, переходы, полёт, навигация, бой
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
                    Some(Pending::Mount) => {
                        self.world.player.mounted = true;
                    }
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
                    if let Some(w) = self.waypoints.get(waypoint) {
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

        // Бой: цель умирает через KILL_TICKS тиков "ротации"
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
            // Все мобы события выбиты — событие завершено, награда выдана
            if !self.world.hostiles.iter().any(|h| h.event_id == event_id) {
                self.events.events.retain(|e| e.id != event_id);
                self.world.player.in_combat = false;
                self.world.player.currency += 1500;
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
        sim.transition_ticks = 2;
        true
    }
}

struct SimActions(Shared);

impl GameActions for SimActions {
    fn teleport(&mut self, waypoint: WaypointId) {
        let mut sim = self.0.lock().unwrap();
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
        self.0.lock().unwrap().world.player.level_synced = true;
    }
    fn set_map_flag(&mut self, _zone: u16, _position: Vec3) {}
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

fn main() {
    let seed = 42;
    println!("Starting SKYFARER headless run (seed: {seed})");

    let mut app = create_headless_app(seed);
    let sim: Shared = Arc::new(Mutex::new(SimState::scripted()));

    let waypoints = sim.lock().unwrap().waypoints.clone();
    app.insert_resource(waypoints);
    app.insert_resource(ServiceHandles {
        pathfinder: Box::new(SimPathfinder(Arc::clone(&sim))),
        instances: Box::new(SimGateway(Arc::clone(&sim))),
        actions: Box::new(SimActions(Arc::clone(&sim))),
        world: Box::new(SimWorld(Arc::clone(&sim))),
        events: Box::new(SimEvents(Arc::clone(&sim))),
    });
    app.world_mut()
        .resource_mut::<AgentSession>()
        .activate(HOME_ZONE);

    for tick in 0..1200 {
        sim.lock().unwrap().advance();
        app.world_mut().run_schedule(FixedUpdate);

        if tick % 100 == 0 {
            let state = app.world().resource::<AgentFsm>().state;
            let sim = sim.lock().unwrap();
            println!(
                "Tick {tick}: state = {state:?}, currency = {}, instance = {}",
                sim.world.player.currency, sim.instance
            );
        }
    }

    let sim = sim.lock().unwrap();
    println!(
        "Run complete: {} hostile(s) left, {} event(s) left, currency = {}",
        sim.world.hostiles.len(),
        sim.events.events.len(),
        sim.world.player.currency
    );
}
