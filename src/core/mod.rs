pub mod config;
pub mod error;
pub mod types;

pub use config::{AiTuning, BattleConfig, CombatConfig};
pub use error::{BattleError, InvalidActionError, InvariantViolation, PathNotFound, Result};
pub use types::{Round, Side, UnitId};
