//! SKYFARER Agent Core
//!
//! Автономный фармер полевых событий: летает по зоне, выбирает события,
//! дерётся, крутит инстансы и сдаёт валюту — сам, часами.
//!
//! HYBRID ARCHITECTURE:
//! - ECS = strategic layer (FSM, селекторы, секвенсер задач)
//! - Хост = tactical layer (pathfinding, игровые действия, источники snapshot'ов)
//!
//! Core однопоточный и кооперативный: один FixedUpdate тик = один проход
//! snapshot → секвенсер → FSM, строго в этом порядке.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod config;
pub mod fsm;
pub mod logger;
pub mod nav;
pub mod routines;
pub mod select;
pub mod sequencer;
pub mod services;
pub mod world;

// Re-export основных типов для удобства
pub use config::AgentConfig;
pub use fsm::{AgentFsm, AgentSession, AgentState, EventTracking};
pub use routines::instances::InstanceRotation;
pub use sequencer::{TaskSequencer, TasksAborted};
pub use services::{
    EventSource, GameActions, InstanceGateway, Pathfinder, ServiceHandles, WorldSource,
};
pub use world::{
    EventSnapshot, FieldEvent, Hostile, ObjectSnapshot, PlayerSnapshot, Waypoint, WaypointTable,
    WorldSnapshot,
};

/// Главный plugin агента.
///
/// Порядок систем в FixedUpdate (chain, последовательно):
/// 1. refresh_snapshots — immutable snapshot'ы мира на этот тик
/// 2. drive_sequencer — максимум один шаг очереди задач
/// 3. agent_fsm_tick — переходы (только при пустой очереди)
///
/// `ServiceHandles` вставляет хост; без него агент просто ждёт.
pub struct AgentPlugin;

impl Plugin for AgentPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .init_resource::<DeterministicRng>()
            .init_resource::<AgentConfig>()
            .init_resource::<AgentSession>()
            .init_resource::<AgentFsm>()
            .init_resource::<TaskSequencer>()
            .init_resource::<world::WorldSnapshot>()
            .init_resource::<world::EventSnapshot>()
            .init_resource::<world::WaypointTable>()
            .init_resource::<InstanceRotation>()
            .init_resource::<EventTracking>()
            .add_event::<TasksAborted>()
            .add_systems(
                FixedUpdate,
                (
                    services::refresh_snapshots,
                    sequencer::drive_sequencer,
                    fsm::agent_fsm_tick,
                )
                    .chain(), // Последовательное выполнение — single outstanding intent
            );
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Создаёт minimal Bevy App для headless работы агента.
///
/// RNG вставляем ДО plugin'а — init_resource в plugin'е сохранит seed.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    logger::init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .add_plugins(AgentPlugin);

    app
}
