//! Navigation policy: куда лететь и как добираться.
//!
//! Сами пути строит внешний pathfinder; здесь только выбор точки назначения
//! внутри события и решение "телепорт через waypoint vs прямой полёт".

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::services::Pathfinder;
use crate::world::{FieldEvent, WaypointId, WaypointTable, ZoneId};

/// Фиксированная надбавка к телепорту: каст + загрузка + посадка на маунта
pub const TELEPORT_TIME_PENALTY: f32 = 100.0;

/// Дистанция до края hitbox'а, с которой цель считается в melee
pub const MELEE_RANGE: f32 = 2.0;

/// Standoff по умолчанию (0 в режиме stay_in_melee_range)
pub const MAX_STANDOFF: f32 = 15.0;

/// Допуски поиска ближайшей проходимой точки navmesh'а
const NEAREST_POINT_TOLERANCE: f32 = 5.0;

/// Как добираться до точки назначения
#[derive(Debug, Clone, PartialEq)]
pub enum TravelPlan {
    /// Телепорт к waypoint'у — оттуда pathfinder доведёт
    Teleport(WaypointId),
    /// Прямой полёт к точке
    DirectFlight(Vec3),
}

/// Дистанция в горизонтальной плоскости (события "плоские", высоту не считаем)
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

/// Точка подлёта внутри события: случайный угол на половине радиуса от
/// центра, прижатая к ближайшей проходимой точке navmesh'а.
///
/// Половина радиуса — чтобы не приземлиться на границе, где мобы уже не
/// засчитываются событию. Если navmesh точки не знает, летим в центр.
pub fn approach_point(
    event: &FieldEvent,
    rng: &mut ChaCha8Rng,
    pathfinder: &dyn Pathfinder,
) -> Vec3 {
    let angle = rng.gen::<f32>() * std::f32::consts::TAU;
    let raw = Vec3::new(
        event.position.x + event.radius / 2.0 * angle.cos(),
        event.position.y,
        event.position.z + event.radius / 2.0 * angle.sin(),
    );
    pathfinder
        .nearest_point(raw, NEAREST_POINT_TOLERANCE, NEAREST_POINT_TOLERANCE)
        .unwrap_or(event.position)
}

/// Телепорт vs прямой полёт: сравниваем прямую дистанцию с дистанцией от
/// ближайшего к цели waypoint'а плюс фиксированный штраф за телепорт.
pub fn plan_travel(
    player_position: Vec3,
    destination: Vec3,
    zone: ZoneId,
    waypoints: &WaypointTable,
) -> TravelPlan {
    let direct = player_position.distance(destination);
    if let Some(waypoint) = waypoints.nearest_in_zone(zone, destination) {
        let assisted = waypoint.position.distance(destination) + TELEPORT_TIME_PENALTY;
        if assisted < direct {
            return TravelPlan::Teleport(waypoint.id);
        }
    }
    // Waypoint'ов в зоне нет или они не срезают путь — летим напрямую
    TravelPlan::DirectFlight(destination)
}

/// Отрицательная, если игрок внутри hitbox'а
pub fn distance_to_hitbox_edge(player: Vec3, target: Vec3, hitbox_radius: f32) -> f32 {
    player.distance(target) - hitbox_radius
}

/// Цель в зоне досягаемости с учётом standoff'а
pub fn in_melee_range(player: Vec3, target: Vec3, hitbox_radius: f32, standoff: f32) -> bool {
    distance_to_hitbox_edge(player, target, hitbox_radius + standoff) < MELEE_RANGE
}
