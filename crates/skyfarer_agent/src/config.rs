//! Конфигурация агента.
//!
//! Хост загружает/персистит настройки сам и кладёт сюда уже провалидированный
//! snapshot — core читает его как injected read-only resource и никогда не
//! пишет на диск.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::world::EventId;

/// Параметры поведения агента (flat toggles + numeric bounds)
///
/// `full_auto` перекрывает все auto_* флаги (как и в ручном режиме каждый
/// шаг можно выключить отдельно).
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// События, которые игнорируем всегда (user blacklist)
    pub blacklist: HashSet<EventId>,

    /// Полный автомат: mount, flight, sync, targeting, движение к мобам
    pub full_auto: bool,
    pub auto_mount: bool,
    pub auto_fly: bool,
    pub auto_sync: bool,
    pub auto_target: bool,
    pub auto_move_to_targets: bool,
    pub path_to_event: bool,

    /// Стоять вплотную к цели (0 вместо стандартного standoff 15)
    pub stay_in_melee_range: bool,
    /// Приоритет особых архетипов мобов внутри события
    pub prioritize_special_targets: bool,
    /// Приоритет событий с бонусной наградой
    pub prioritize_bonus_events: bool,
    /// Бонус учитываем только при активном баффе на игроке
    pub bonus_only_with_buff: bool,
    /// Приоритет уже начатых событий (progress > 0, до cap'а)
    pub prioritize_started_events: bool,
    /// Ротация инстансов когда подходящих событий нет
    pub change_instances: bool,

    /// Максимальная длительность события, сек
    pub max_duration: u16,
    /// Минимальный остаток времени события, сек
    pub min_time_remaining: u16,
    /// Максимальный прогресс события, %
    pub max_progress: u8,

    /// Порог валюты для похода к обменнику
    pub currency_threshold: u32,

    /// Сбрасывать очередь задач по таймауту (primary stuck-state recovery)
    pub abort_on_timeout: bool,
    /// Таймаут одной in-flight задачи, тиков (1800 = 30 сек при 60Hz)
    pub task_timeout_ticks: u32,
    /// Пауза после полного круга по инстансам, тиков (600 = 10 сек при 60Hz)
    pub rotation_cooldown_ticks: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            blacklist: HashSet::new(),

            full_auto: true,
            auto_mount: true,
            auto_fly: true,
            auto_sync: true,
            auto_target: true,
            auto_move_to_targets: true,
            path_to_event: true,

            stay_in_melee_range: false,
            prioritize_special_targets: true,
            prioritize_bonus_events: true,
            bonus_only_with_buff: false,
            prioritize_started_events: false,
            change_instances: true,

            max_duration: 900,
            min_time_remaining: 120,
            max_progress: 90,

            currency_threshold: 1400,

            abort_on_timeout: true,
            task_timeout_ticks: 1800,
            rotation_cooldown_ticks: 600,
        }
    }
}

impl AgentConfig {
    /// Эффективное значение auto_* флага с учётом full_auto
    pub fn auto(&self, flag: bool) -> bool {
        self.full_auto || flag
    }
}
