//! Выбор цели внутри активного события (и fallback вне его).
//!
//! Внутри события берём только мобов, привязанных к нему и стоящих в его
//! 2D-радиусе (высота не считается — события "плоские"). Вне события, но в
//! принудительном бою, берём ближайшего моба, который целится в игрока.

use crate::config::AgentConfig;
use crate::nav;
use crate::world::{DataId, FieldEvent, Hostile, NpcKind, PlayerSnapshot};

/// Архетипы, которые выносим первыми (мешают прогрессу события)
pub const PRIORITY_TARGET_ARCHETYPES: [DataId; 2] = [7586, 7587];

fn combat_ready(hostile: &Hostile) -> bool {
    hostile.alive && hostile.targetable && hostile.hostile && hostile.kind == NpcKind::Enemy
}

fn priority_rank(hostile: &Hostile, config: &AgentConfig) -> bool {
    config.prioritize_special_targets && PRIORITY_TARGET_ARCHETYPES.contains(&hostile.data_id)
}

/// Моб занят другим игроком и к нам претензий не имеет — дёргать его
/// бессмысленно (ping-pong поведение на trash-событиях)
fn contested(hostile: &Hostile) -> bool {
    hostile.tagged_by_other && !hostile.targeting_player
}

/// Лучшая цель внутри активного события
pub fn pick_event_target<'a>(
    hostiles: &'a [Hostile],
    event: &FieldEvent,
    player: &PlayerSnapshot,
    config: &AgentConfig,
) -> Option<&'a Hostile> {
    let floor_distance =
        |h: &Hostile| player.position.distance(h.position).floor() as i64;

    hostiles
        .iter()
        .filter(|h| {
            combat_ready(h)
                && h.event_id == event.id
                && nav::horizontal_distance(h.position, event.position) < event.radius
        })
        .min_by(|a, b| {
            priority_rank(b, config)
                .cmp(&priority_rank(a, config))
                .then_with(|| b.targeting_player.cmp(&a.targeting_player))
                .then_with(|| contested(a).cmp(&contested(b)))
                .then_with(|| floor_distance(a).cmp(&floor_distance(b)))
        })
}

/// Fallback вне события: ближайший моб, целящийся в игрока
/// (неожиданный бой по дороге — event membership игнорируем)
pub fn pick_assailant<'a>(
    hostiles: &'a [Hostile],
    player: &PlayerSnapshot,
) -> Option<&'a Hostile> {
    hostiles
        .iter()
        .filter(|h| combat_ready(h) && h.targeting_player)
        .min_by(|a, b| {
            a.position
                .distance(player.position)
                .total_cmp(&b.position.distance(player.position))
        })
}
