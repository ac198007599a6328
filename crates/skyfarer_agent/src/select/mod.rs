//! Селекторы кандидатов: события и цели.
//!
//! Чистые функции над snapshot'ами текущего тика — без side effect'ов,
//! тестируются без App.

pub mod events;
pub mod targets;

pub use events::pick_event;
pub use targets::{pick_assailant, pick_event_target};
