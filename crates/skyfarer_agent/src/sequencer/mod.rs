//! Task sequencer — упорядоченная очередь отложенных действий.
//!
//! Действия с реальной латентностью (каст телепорта, смена зоны) выражаются
//! декларативным скриптом: action + completion predicate, который поллится
//! каждый тик. Никаких блокирующих ожиданий — "ждать" значит вернуть false
//! из предиката и попробовать на следующем тике.
//!
//! Инвариант single outstanding intent: пока очередь непуста, FSM не
//! оценивает переходы (см. `agent_fsm_tick`), поэтому в мире одновременно
//! живёт максимум один многошаговый сценарий. In-flight может быть максимум
//! один элемент — голова очереди.
//!
//! Таймаут — единственный механизм отмены: если предикат головы не стал
//! true за `timeout_ticks`, вся очередь сбрасывается и агент откатывается
//! в Ready (primary recovery для застрявших игровых состояний).

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::config::AgentConfig;
use crate::logger;
use crate::services::ServiceHandles;
use crate::world::WorldSnapshot;

/// Контекст, который видят action и predicate задачи
pub struct TaskCtx<'a> {
    /// Snapshot мира текущего тика (immutable)
    pub world: &'a WorldSnapshot,
    /// Хостовые сервисы (единственный канал side effect'ов)
    pub services: &'a mut ServiceHandles,
}

pub type TaskAction = Box<dyn FnMut(&mut TaskCtx) + Send + Sync>;
pub type TaskPredicate = Box<dyn FnMut(&TaskCtx) -> bool + Send + Sync>;

/// Одна задача: опциональный action + опциональный предикат завершения.
///
/// Без предиката задача завершается сразу после action'а. Без action'а —
/// чистое ожидание предиката.
pub struct TaskItem {
    label: String,
    action: Option<TaskAction>,
    predicate: Option<TaskPredicate>,
}

/// Политика прерывания по таймауту (из конфига, применяется каждый тик)
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    pub abort_on_timeout: bool,
    pub timeout_ticks: u32,
}

/// Результат одного тика секвенсера
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerOutcome {
    /// Очередь пуста
    Idle,
    /// Выполнен шаг или предикат ещё не готов
    Working,
    /// Таймаут: очередь сброшена, FSM должен откатиться в Ready
    Aborted { label: String },
}

/// Событие: очередь сброшена по таймауту
#[derive(Event, Debug, Clone)]
pub struct TasksAborted {
    pub label: String,
}

#[derive(Resource, Default)]
pub struct TaskSequencer {
    queue: VecDeque<TaskItem>,
    in_flight: bool,
    ticks_in_flight: u32,
}

impl TaskSequencer {
    /// Очередь непуста — агент занят многошаговым сценарием
    pub fn is_busy(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Добавить задачу в конец очереди (никогда не исполняет сразу)
    pub fn enqueue(&mut self, item: TaskItem) {
        self.queue.push_back(item);
    }

    /// Action без предиката: завершается сразу после выполнения
    pub fn enqueue_action(
        &mut self,
        label: impl Into<String>,
        action: impl FnMut(&mut TaskCtx) + Send + Sync + 'static,
    ) {
        self.enqueue(TaskItem {
            label: label.into(),
            action: Some(Box::new(action)),
            predicate: None,
        });
    }

    /// Action + предикат завершения
    pub fn enqueue_step(
        &mut self,
        label: impl Into<String>,
        action: impl FnMut(&mut TaskCtx) + Send + Sync + 'static,
        predicate: impl FnMut(&TaskCtx) -> bool + Send + Sync + 'static,
    ) {
        self.enqueue(TaskItem {
            label: label.into(),
            action: Some(Box::new(action)),
            predicate: Some(Box::new(predicate)),
        });
    }

    /// Чистое ожидание: поллим предикат до true
    pub fn enqueue_wait(
        &mut self,
        label: impl Into<String>,
        predicate: impl FnMut(&TaskCtx) -> bool + Send + Sync + 'static,
    ) {
        self.enqueue(TaskItem {
            label: label.into(),
            action: None,
            predicate: Some(Box::new(predicate)),
        });
    }

    /// Фиксированная пауза в тиках (cooldown ротации и т.п.)
    pub fn enqueue_delay(&mut self, label: impl Into<String>, ticks: u32) {
        let mut remaining = ticks;
        self.enqueue_wait(label, move |_| {
            if remaining == 0 {
                true
            } else {
                remaining -= 1;
                false
            }
        });
    }

    /// Сбросить очередь целиком
    pub fn flush(&mut self) {
        self.queue.clear();
        self.in_flight = false;
        self.ticks_in_flight = 0;
    }

    /// Один unit of work: запустить голову ИЛИ поллить её предикат
    pub fn tick(&mut self, ctx: &mut TaskCtx, policy: &TimeoutPolicy) -> SequencerOutcome {
        if self.queue.is_empty() {
            return SequencerOutcome::Idle;
        }

        if !self.in_flight {
            self.in_flight = true;
            self.ticks_in_flight = 0;

            let head = self.queue.front_mut().expect("checked non-empty");
            logger::log_debug(&format!("Task start: {}", head.label));
            if let Some(action) = head.action.as_mut() {
                action(ctx);
                if head.predicate.is_none() {
                    self.complete_head();
                }
                return SequencerOutcome::Working;
            }
            // Чистое ожидание — поллим предикат в этот же тик
        }

        self.ticks_in_flight += 1;
        let satisfied = {
            let head = self.queue.front_mut().expect("checked non-empty");
            match head.predicate.as_mut() {
                Some(predicate) => predicate(ctx),
                None => true,
            }
        };

        if satisfied {
            self.complete_head();
            return SequencerOutcome::Working;
        }

        if policy.abort_on_timeout && self.ticks_in_flight >= policy.timeout_ticks {
            let label = self.queue.front().expect("checked non-empty").label.clone();
            logger::log_warning(&format!(
                "Task '{}' timed out after {} ticks, flushing {} queued task(s)",
                label,
                self.ticks_in_flight,
                self.queue.len()
            ));
            self.flush();
            return SequencerOutcome::Aborted { label };
        }

        SequencerOutcome::Working
    }

    fn complete_head(&mut self) {
        if let Some(item) = self.queue.pop_front() {
            logger::log_debug(&format!("Task done: {}", item.label));
        }
        self.in_flight = false;
        self.ticks_in_flight = 0;
    }
}

/// Система: дренаж секвенсера (строго ДО оценки FSM, см. chain в plugin'е)
pub fn drive_sequencer(
    mut sequencer: ResMut<TaskSequencer>,
    services: Option<ResMut<ServiceHandles>>,
    world: Res<WorldSnapshot>,
    config: Res<AgentConfig>,
    mut aborted: EventWriter<TasksAborted>,
) {
    let Some(mut services) = services else {
        return;
    };
    if !world.player.available {
        return;
    }

    let policy = TimeoutPolicy {
        abort_on_timeout: config.abort_on_timeout,
        timeout_ticks: config.task_timeout_ticks,
    };
    let mut ctx = TaskCtx {
        world: &world,
        services: &mut services,
    };
    if let SequencerOutcome::Aborted { label } = sequencer.tick(&mut ctx, &policy) {
        aborted.write(TasksAborted { label });
    }
}
