//! Внешние коллабораторы (tactical layer).
//!
//! Core — чисто strategic layer: он решает, ЧТО делать, а физическое
//! исполнение (pathfinding, смена инстанса, игровые действия) делегируется
//! хостовым сервисам через trait objects. Хост кладёт `ServiceHandles`
//! resource до запуска; отсутствующий resource трактуем как "ещё не готов" —
//! тик пропускается и повторяется позже, это не ошибка.

use bevy::prelude::*;

use crate::logger;
use crate::world::{
    EventSnapshot, ObjectId, WaypointId, WorldSnapshot, ZoneId,
};

/// Внешний pathfinding сервис (асинхронный: команды не блокируют)
pub trait Pathfinder: Send + Sync {
    /// Navmesh построен и сервис готов принимать команды
    fn is_ready(&self) -> bool;
    /// Персонаж сейчас движется по построенному пути
    fn is_running(&self) -> bool;
    /// Запрос пути ещё считается
    fn pathfind_in_progress(&self) -> bool;
    /// Построить путь и двигаться к точке (fly = лететь, не идти)
    fn pathfind_and_move_to(&mut self, point: Vec3, fly: bool);
    /// Остановить текущее движение
    fn stop(&mut self);
    /// Ближайшая проходимая точка navmesh'а в пределах допусков
    fn nearest_point(&self, point: Vec3, horizontal: f32, vertical: f32) -> Option<Vec3>;
}

/// Шлюз ротации параллельных копий зоны
pub trait InstanceGateway: Send + Sync {
    fn instance_count(&self) -> u32;
    /// Текущий инстанс, 1-indexed
    fn current_instance(&self) -> u32;
    /// Смена доступна прямо сейчас (стоим у waypoint'а, не в бою)
    fn can_change_instance(&self) -> bool;
    fn change_instance(&mut self, target: u32) -> bool;
}

/// Игровые действия персонажа.
///
/// Каждый вызов — одна идемпотентная команда внешнему клиенту; завершение
/// отслеживается предикатами по snapshot'у, не возвращаемым значением.
pub trait GameActions: Send + Sync {
    fn teleport(&mut self, waypoint: WaypointId);
    fn mount_up(&mut self);
    fn dismount(&mut self);
    fn jump(&mut self);
    fn summon_companion(&mut self);
    fn set_target(&mut self, id: ObjectId);
    fn interact(&mut self, id: ObjectId);
    /// Синхронизировать уровень персонажа вниз до уровня события
    fn level_sync(&mut self);
    /// Пометить точку на карте (удобство для наблюдающего за ботом)
    fn set_map_flag(&mut self, zone: ZoneId, position: Vec3);

    // Обменник валюты
    fn exchange_open(&self) -> bool;
    fn confirm_prompt_open(&self) -> bool;
    fn confirm(&mut self);
    fn close_exchange(&mut self);
    fn buy_vouchers(&mut self, quantity: u32);
}

/// Источник состояния мира (персонаж, мобы, объекты)
pub trait WorldSource: Send + Sync {
    fn snapshot(&self) -> WorldSnapshot;
}

/// Источник полевых событий
pub trait EventSource: Send + Sync {
    fn snapshot(&self) -> EventSnapshot;
}

/// Все хостовые сервисы одним resource'ом
#[derive(Resource)]
pub struct ServiceHandles {
    pub pathfinder: Box<dyn Pathfinder>,
    pub instances: Box<dyn InstanceGateway>,
    pub actions: Box<dyn GameActions>,
    pub world: Box<dyn WorldSource>,
    pub events: Box<dyn EventSource>,
}

impl ServiceHandles {
    /// Движение уже выполняется или путь строится — новые travel-команды
    /// не выдаём (single outstanding intent на уровне pathfinder'а)
    pub fn navigation_busy(&self) -> bool {
        self.pathfinder.pathfind_in_progress() || self.pathfinder.is_running()
    }
}

/// Система: обновление snapshot'ов из источников (раз в тик, до решений)
pub fn refresh_snapshots(
    services: Option<Res<ServiceHandles>>,
    mut world: ResMut<WorldSnapshot>,
    mut events: ResMut<EventSnapshot>,
) {
    let Some(services) = services else {
        // Коллабораторы ещё не подключены — не ошибка, ждём следующий тик
        logger::log_debug("Services not attached yet, skipping snapshot refresh");
        return;
    };

    *world = services.world.snapshot();
    *events = services.events.snapshot();
}

#[cfg(test)]
pub(crate) mod null {
    //! No-op сервисы для unit-тестов (sequencer, fsm)

    use super::*;

    pub struct NullPathfinder;

    impl Pathfinder for NullPathfinder {
        fn is_ready(&self) -> bool {
            true
        }
        fn is_running(&self) -> bool {
            false
        }
        fn pathfind_in_progress(&self) -> bool {
            false
        }
        fn pathfind_and_move_to(&mut self, _point: Vec3, _fly: bool) {}
        fn stop(&mut self) {}
        fn nearest_point(&self, point: Vec3, _h: f32, _v: f32) -> Option<Vec3> {
            Some(point)
        }
    }

    pub struct NullGateway;

    impl InstanceGateway for NullGateway {
        fn instance_count(&self) -> u32 {
            1
        }
        fn current_instance(&self) -> u32 {
            1
        }
        fn can_change_instance(&self) -> bool {
            false
        }
        fn change_instance(&mut self, _target: u32) -> bool {
            false
        }
    }

    pub struct NullActions;

    impl GameActions for NullActions {
        fn teleport(&mut self, _waypoint: WaypointId) {}
        fn mount_up(&mut self) {}
        fn dismount(&mut self) {}
        fn jump(&mut self) {}
        fn summon_companion(&mut self) {}
        fn set_target(&mut self, _id: ObjectId) {}
        fn interact(&mut self, _id: ObjectId) {}
        fn level_sync(&mut self) {}
        fn set_map_flag(&mut self, _zone: ZoneId, _position: Vec3) {}
        fn exchange_open(&self) -> bool {
            false
        }
        fn confirm_prompt_open(&self) -> bool {
            false
        }
        fn confirm(&mut self) {}
        fn close_exchange(&mut self) {}
        fn buy_vouchers(&mut self, _quantity: u32) {}
    }

    pub struct NullWorld;

    impl WorldSource for NullWorld {
        fn snapshot(&self) -> WorldSnapshot {
            WorldSnapshot::default()
        }
    }

    pub struct NullEvents;

    impl EventSource for NullEvents {
        fn snapshot(&self) -> EventSnapshot {
            EventSnapshot::default()
        }
    }

    pub fn null_handles() -> ServiceHandles {
        ServiceHandles {
            pathfinder: Box::new(NullPathfinder),
            instances: Box::new(NullGateway),
            actions: Box::new(NullActions),
            world: Box::new(NullWorld),
            events: Box::new(NullEvents),
        }
    }
}
