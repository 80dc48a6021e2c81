//! glory-combat - Heroes Glory combat rules engine
//!
//! Dice, attack resolution and turn sequencing for turn-based tabletop
//! encounters. Persistence and presentation belong to the caller: the engine
//! takes an in-memory roster and hands back results.

pub mod combat;
pub mod config;

pub use combat::{CombatError, Combatant, Encounter, EncounterSummary, Side};
pub use config::EngineConfig;
