//! Grid Skirmish - turn-based tactical grid combat engine

pub mod battle;
pub mod core;
