//! Battle system constants - all tunable defaults in one place
//!
//! Runtime values live in `BattleConfig`; these are its defaults.

// Movement
pub const CARDINAL_MOVEMENT_COST: f32 = 1.0;
pub const DIAGONAL_MOVEMENT_COST: f32 = 1.5;

// Damage pipeline
pub const CRIT_MULTIPLIER: f32 = 1.5;
pub const AOO_DAMAGE_MULTIPLIER: f32 = 0.75;
pub const MIN_BASE_DAMAGE: i32 = 1;
pub const HAZARD_DAMAGE: i32 = 2;

// Status ledger
pub const MAX_STATUSES_PER_UNIT: usize = 16;
pub const MAX_STATUS_STACKS: u32 = 5;

// Reactions
pub const AOO_REACTION_BUDGET: u32 = 1;

// Round limit before a stalled battle is called
pub const MAX_ROUNDS: u32 = 100;

// Line of sight samples per tile of Chebyshev length
pub const LOS_SAMPLES_PER_TILE: i32 = 4;

// AI tuning defaults
pub const LOW_HP_THRESHOLD: f32 = 0.5;
pub const BERSERK_HP_THRESHOLD: f32 = 0.4;
pub const SUPPORT_HEAL_THRESHOLD: f32 = 0.6;
pub const ISOLATION_RADIUS: u32 = 2;
pub const DEFENDER_THREAT_RANGE: u32 = 2;
pub const CASTER_MIN_RANGE: u32 = 2;
pub const COMMANDER_BUFF_ROUNDS: u32 = 2;
pub const THREAT_OFFENSE_WEIGHT: f32 = 1.0;
pub const THREAT_WOUNDED_WEIGHT: f32 = 4.0;
pub const THREAT_DEBUFF_WEIGHT: f32 = 1.0;
pub const THREAT_DISTANCE_WEIGHT: f32 = 0.25;
pub const HAZARD_AVOIDANCE_PENALTY: f32 = 3.0;
