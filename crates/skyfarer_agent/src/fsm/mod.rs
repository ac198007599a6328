//! Agent FSM — оркестратор решений.
//!
//! Каждый FixedUpdate тик: секвенсер дренируется первым (см. chain в
//! `AgentPlugin`), FSM оценивает переходы только при пустой очереди. Так в
//! мире одновременно живёт максимум один многошаговый сценарий.
//!
//! Порядок приоритетов внутри тика:
//! 1. Смерть (пре-эмптит любое состояние)
//! 2. Текущее состояние → обработчик → опциональный переход

use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::AgentConfig;
use crate::logger;
use crate::routines::instances::InstanceRotation;
use crate::sequencer::TaskSequencer;
use crate::services::{GameActions, ServiceHandles};
use crate::world::{
    EventId, EventSnapshot, FieldEvent, PlayerSnapshot, WaypointTable, WorldSnapshot, ZoneId,
};

mod tick;

pub use tick::agent_fsm_tick;


/// Состояния агента. Ровно одно активно; меняет только FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Точка принятия решений — куда дальше
    Ready,
    /// Садимся на маунта / взлетаем
    Mounting,
    /// Летим к выбранному событию
    MovingToEvent,
    /// Зарезервировано под эскорт-события
    InteractingWithNpc,
    /// Внутри события: targeting + сближение
    InCombat,
    /// Ротация параллельных копий зоны
    ChangingInstances,
    /// Поход к обменнику валюты
    ExchangingVouchers,
    /// Персонаж мёртв, ждём возрождения
    Dead,
    /// Призыв боевого компаньона
    SummoningMount,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::Ready
    }
}

/// Текущее + предыдущее состояние.
///
/// `previous` нужен только для логирования переходов и детекта death edge —
/// ветвиться по нему нельзя.
#[derive(Resource, Debug, Default)]
pub struct AgentFsm {
    pub state: AgentState,
    pub previous: AgentState,
}

/// Сессия агента: включён ли и какую зону фармим
#[derive(Resource, Debug, Default)]
pub struct AgentSession {
    pub active: bool,
    /// Зона, в которую возвращаемся после смерти/обмена
    pub home_zone: ZoneId,
}

impl AgentSession {
    pub fn activate(&mut self, home_zone: ZoneId) {
        self.active = true;
        self.home_zone = home_zone;
        logger::log_info(&format!("Agent activated, farming zone {home_zone}"));
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        logger::log_info("Agent deactivated");
    }
}

/// Событие, которым агент сейчас занят.
///
/// Сайд-эффект (level sync) живёт в явном сеттере, который сравнивает
/// старое/новое значение — не в присваивании поля.
#[derive(Resource, Debug, Default)]
pub struct EventTracking {
    current: EventId,
}

impl EventTracking {
    pub fn current(&self) -> EventId {
        self.current
    }

    /// Сменить отслеживаемое событие; на входе в новое событие синкаем
    /// уровень вниз, если игрок его перерос
    pub fn update(
        &mut self,
        id: EventId,
        player: &PlayerSnapshot,
        event: &FieldEvent,
        sync_enabled: bool,
        actions: &mut dyn GameActions,
    ) {
        if self.current == id {
            return;
        }
        if id != 0 && sync_enabled && !player.level_synced && player.level > event.max_level {
            logger::log_info(&format!(
                "Level sync for event {id}: player {} > cap {}",
                player.level, event.max_level
            ));
            actions.level_sync();
        }
        self.current = id;
    }

    /// Бой/событие закончились — сброс без сайд-эффектов
    pub fn clear(&mut self) {
        self.current = 0;
    }
}

/// Всё, что видят обработчики состояний в текущем тике
pub struct AgentCtx<'a> {
    pub config: &'a AgentConfig,
    pub session: &'a AgentSession,
    pub world: &'a WorldSnapshot,
    pub events: &'a EventSnapshot,
    pub waypoints: &'a WaypointTable,
    pub services: &'a mut ServiceHandles,
    pub sequencer: &'a mut TaskSequencer,
    pub rotation: &'a mut InstanceRotation,
    pub tracking: &'a mut EventTracking,
    pub rng: &'a mut ChaCha8Rng,
}
