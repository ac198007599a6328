//! Ограниченные сценарии поверх секвенсера.
//!
//! Каждый сценарий — короткий декларативный скрипт: набор enqueue'нутых
//! шагов с предикатами завершения, либо один идемпотентный шаг за тик
//! (ротация, обмен). Застрявший шаг снимает таймаут секвенсера.

pub mod exchange;
pub mod instances;
pub mod mount;
pub mod revive;
pub mod travel;
