//! Выбор следующего полевого события.
//!
//! Фильтр отсекает неподходящие события (категория, фаза, длительность,
//! прогресс, остаток времени, blacklist), ранжирование упорядочивает
//! остальные: бонус → уже начатые → ближайшие. Первый после сортировки и
//! есть выбранный кандидат; пустой результат = "подходящих событий нет".

use crate::config::AgentConfig;
use crate::world::{EventCategory, EventPhase, FieldEvent, PlayerSnapshot};

/// Баффы, при которых бонусные события приоритетны в режиме
/// `bonus_only_with_buff`
pub const BONUS_BUFF_STATUSES: [u32; 2] = [1288, 1289];

/// Событие проходит фильтр отбора
pub fn qualifies(event: &FieldEvent, config: &AgentConfig) -> bool {
    event.category == EventCategory::Battle
        && event.phase != EventPhase::Preparation
        && event.duration <= config.max_duration
        && event.progress <= config.max_progress
        && event.time_remaining > config.min_time_remaining
        && !config.blacklist.contains(&event.id)
}

fn bonus_rank(event: &FieldEvent, player: &PlayerSnapshot, config: &AgentConfig) -> bool {
    config.prioritize_bonus_events
        && event.has_bonus
        && (!config.bonus_only_with_buff
            || player.statuses.iter().any(|s| BONUS_BUFF_STATUSES.contains(s)))
}

fn started_rank(event: &FieldEvent, config: &AgentConfig) -> bool {
    config.prioritize_started_events && event.progress > 0
}

/// Лучший кандидат среди текущих событий (или None)
pub fn pick_event<'a>(
    events: &'a [FieldEvent],
    player: &PlayerSnapshot,
    config: &AgentConfig,
) -> Option<&'a FieldEvent> {
    events
        .iter()
        .filter(|e| qualifies(e, config))
        .min_by(|a, b| {
            // Ключи сравниваются по порядку, descending для bool-приоритетов
            bonus_rank(b, player, config)
                .cmp(&bonus_rank(a, player, config))
                .then_with(|| started_rank(b, config).cmp(&started_rank(a, config)))
                .then_with(|| {
                    a.position
                        .distance(player.position)
                        .total_cmp(&b.position.distance(player.position))
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::prelude::*;

    fn event(id: u16) -> FieldEvent {
        FieldEvent { id, ..Default::default() }
    }

    #[test]
    fn test_filter_excludes_out_of_bounds() {
        let config = AgentConfig::default();

        let over_progress = FieldEvent { progress: 91, ..event(1) };
        let out_of_time = FieldEvent { time_remaining: 120, ..event(2) };
        let too_old = FieldEvent { duration: 901, ..event(3) };
        let not_started = FieldEvent { phase: EventPhase::Preparation, ..event(4) };
        let wrong_kind = FieldEvent { category: EventCategory::Collect, ..event(5) };

        assert!(!qualifies(&over_progress, &config));
        assert!(!qualifies(&out_of_time, &config));
        assert!(!qualifies(&too_old, &config));
        assert!(!qualifies(&not_started, &config));
        assert!(!qualifies(&wrong_kind, &config));
        assert!(qualifies(&event(6), &config));
    }

    #[test]
    fn test_filter_respects_blacklist() {
        let mut config = AgentConfig::default();
        config.blacklist.insert(7);

        assert!(!qualifies(&event(7), &config));
        assert!(qualifies(&event(8), &config));
    }

    #[test]
    fn test_bonus_beats_closer_candidate() {
        let config = AgentConfig::default();
        let player = PlayerSnapshot::default();

        let bonus_far = FieldEvent {
            has_bonus: true,
            position: Vec3::new(500.0, 0.0, 0.0),
            ..event(1)
        };
        let plain_near = FieldEvent {
            position: Vec3::new(10.0, 0.0, 0.0),
            ..event(2)
        };

        let binding = [plain_near.clone(), bonus_far];
        let picked = pick_event(&binding, &player, &config).unwrap();
        assert_eq!(picked.id, 1);

        // Без приоритета бонуса побеждает дистанция
        let mut no_bonus = AgentConfig::default();
        no_bonus.prioritize_bonus_events = false;
        let bonus_far = FieldEvent {
            has_bonus: true,
            position: Vec3::new(500.0, 0.0, 0.0),
            ..event(1)
        };
        let binding = [plain_near, bonus_far];
        let picked = pick_event(&binding, &player, &no_bonus).unwrap();
        assert_eq!(picked.id, 2);
    }

    #[test]
    fn test_bonus_gated_by_buff() {
        let mut config = AgentConfig::default();
        config.bonus_only_with_buff = true;

        let bonus_far = FieldEvent {
            has_bonus: true,
            position: Vec3::new(500.0, 0.0, 0.0),
            ..event(1)
        };
        let plain_near = FieldEvent {
            position: Vec3::new(10.0, 0.0, 0.0),
            ..event(2)
        };

        // Без баффа бонус не учитывается — выигрывает ближнее событие
        let player = PlayerSnapshot::default();
        let binding = [bonus_far.clone(), plain_near.clone()];
        let picked = pick_event(&binding, &player, &config).unwrap();
        assert_eq!(picked.id, 2);

        // С баффом — бонусное
        let buffed = PlayerSnapshot {
            statuses: vec![BONUS_BUFF_STATUSES[0]],
            ..Default::default()
        };
        let binding = [bonus_far, plain_near];
        let picked = pick_event(&binding, &buffed, &config).unwrap();
        assert_eq!(picked.id, 1);
    }

    #[test]
    fn test_started_breaks_distance_tie() {
        let mut config = AgentConfig::default();
        config.prioritize_started_events = true;
        let player = PlayerSnapshot::default();

        let fresh_near = FieldEvent {
            position: Vec3::new(10.0, 0.0, 0.0),
            ..event(1)
        };
        let started_far = FieldEvent {
            progress: 40,
            position: Vec3::new(300.0, 0.0, 0.0),
            ..event(2)
        };

        let binding = [fresh_near, started_far];
        let picked = pick_event(&binding, &player, &config).unwrap();
        assert_eq!(picked.id, 2);
    }

    #[test]
    fn test_no_candidates() {
        let config = AgentConfig::default();
        let player = PlayerSnapshot::default();
        assert!(pick_event(&[], &player, &config).is_none());

        let all_filtered = [FieldEvent { progress: 100, ..event(1) }];
        assert!(pick_event(&all_filtered, &player, &config).is_none());
    }
}
