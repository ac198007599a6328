//! Per-tick snapshots мира.
//!
//! Core не владеет игровым состоянием — коллабораторы отдают snapshot раз в
//! тик (`refresh_snapshots`), и до конца тика он считается immutable. Все
//! решения FSM/селекторов принимаются только по этим данным.

use bevy::prelude::*;

pub type EventId = u16;
pub type ZoneId = u16;
pub type ObjectId = u64;
pub type DataId = u32;
pub type WaypointId = u32;

/// Фаза жизни полевого события
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// Объявлено, но ещё не началось (участвовать нельзя)
    Preparation,
    Running,
    Ending,
}

/// Категория события. Агент фармит только боевые.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Battle,
    Collect,
    Escort,
}

/// Полевое событие — snapshot одной записи из event source
///
/// Immutable для core: только фильтруем и ранжируем.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEvent {
    pub id: EventId,
    pub position: Vec3,
    pub radius: f32,
    /// Сколько секунд событие уже живёт
    pub duration: u16,
    /// Прогресс выполнения, %
    pub progress: u8,
    /// Остаток времени, сек
    pub time_remaining: u16,
    pub has_bonus: bool,
    pub phase: EventPhase,
    pub category: EventCategory,
    /// Верхний уровень события (для level sync)
    pub max_level: u8,
}

impl Default for FieldEvent {
    fn default() -> Self {
        Self {
            id: 0,
            position: Vec3::ZERO,
            radius: 50.0,
            duration: 0,
            progress: 0,
            time_remaining: 900,
            has_bonus: false,
            phase: EventPhase::Running,
            category: EventCategory::Battle,
            max_level: 0,
        }
    }
}

/// Вид NPC с точки зрения targeting'а
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcKind {
    Enemy,
    Pet,
    Other,
}

/// Враждебный объект — snapshot одной строки object table
#[derive(Debug, Clone, PartialEq)]
pub struct Hostile {
    pub id: ObjectId,
    /// Архетип моба (для приоритетных видов)
    pub data_id: DataId,
    pub position: Vec3,
    pub hitbox_radius: f32,
    pub alive: bool,
    pub targetable: bool,
    pub hostile: bool,
    pub kind: NpcKind,
    /// Целится в нашего игрока
    pub targeting_player: bool,
    /// Уже в бою с другим игроком (nameplate tag)
    pub tagged_by_other: bool,
    /// Событие, к которому моб привязан (0 = вне событий)
    pub event_id: EventId,
}

impl Default for Hostile {
    fn default() -> Self {
        Self {
            id: 0,
            data_id: 0,
            position: Vec3::ZERO,
            hitbox_radius: 1.0,
            alive: true,
            targetable: true,
            hostile: true,
            kind: NpcKind::Enemy,
            targeting_player: false,
            tagged_by_other: false,
            event_id: 0,
        }
    }
}

/// Вид интерактивного объекта мира
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Waypoint,
    Vendor,
    Other,
}

/// Интерактивный (не враждебный) объект мира: waypoint, торговец
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub data_id: DataId,
    pub kind: ObjectKind,
    pub position: Vec3,
}

/// Состояние управляемого персонажа на этот тик
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub position: Vec3,
    pub zone: ZoneId,
    pub level: u8,
    /// false = персонаж недоступен (загрузка, logout) — тик пропускаем
    pub available: bool,
    pub alive: bool,
    pub level_synced: bool,
    pub mounted: bool,
    pub mounting: bool,
    pub in_flight: bool,
    pub jumping: bool,
    pub casting: bool,
    pub in_combat: bool,
    /// Занят интеракцией/катсценой — никаких команд
    pub occupied: bool,
    /// Между зонами (zone transition в процессе)
    pub zone_transition: bool,
    /// Накопленная валюта событий
    pub currency: u32,
    /// Остаток времени активного компаньона, сек (0 = нужно призвать)
    pub companion_time_left: f32,
    /// Расходники для призыва компаньона
    pub companion_summon_items: u32,
    /// Активные статусы/баффы
    pub statuses: Vec<u32>,
    /// Текущая цель
    pub target: Option<ObjectId>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            zone: 0,
            level: 1,
            available: true,
            alive: true,
            level_synced: false,
            mounted: false,
            mounting: false,
            in_flight: false,
            jumping: false,
            casting: false,
            in_combat: false,
            occupied: false,
            zone_transition: false,
            currency: 0,
            companion_time_left: 0.0,
            companion_summon_items: 0,
            statuses: Vec::new(),
            target: None,
        }
    }
}

/// Snapshot мира на текущий тик (resource, перезаписывается каждый тик)
#[derive(Resource, Debug, Clone, Default)]
pub struct WorldSnapshot {
    pub player: PlayerSnapshot,
    pub hostiles: Vec<Hostile>,
    pub objects: Vec<ObjectSnapshot>,
}

/// Snapshot событий на текущий тик
#[derive(Resource, Debug, Clone, Default)]
pub struct EventSnapshot {
    pub events: Vec<FieldEvent>,
    /// Событие, внутри которого игрок находится сейчас
    pub active: Option<EventId>,
}

impl EventSnapshot {
    pub fn get(&self, id: EventId) -> Option<&FieldEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn active(&self) -> Option<&FieldEvent> {
        self.active.and_then(|id| self.get(id))
    }
}

/// Точка быстрого перемещения (fast-travel node)
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub id: WaypointId,
    pub zone: ZoneId,
    pub position: Vec3,
}

/// Таблица waypoint'ов зоны — plain immutable mapping, заполняется хостом
///
/// Первый waypoint зоны в таблице считается её "primary" (точка прибытия
/// при телепорте в зону).
#[derive(Resource, Debug, Clone, Default)]
pub struct WaypointTable {
    waypoints: Vec<Waypoint>,
}

impl WaypointTable {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    pub fn get(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }

    pub fn primary_in_zone(&self, zone: ZoneId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.zone == zone)
    }

    pub fn nearest_in_zone(&self, zone: ZoneId, position: Vec3) -> Option<&Waypoint> {
        self.waypoints
            .iter()
            .filter(|w| w.zone == zone)
            .min_by(|a, b| {
                a.position
                    .distance(position)
                    .total_cmp(&b.position.distance(position))
            })
    }
}
