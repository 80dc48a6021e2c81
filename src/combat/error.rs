//! Combat engine errors

use thiserror::Error;

use super::turns::TurnState;

/// Errors raised by the combat engine.
///
/// All of these are caller errors and none are transient. Every check runs
/// before the first die is drawn, so a failed call leaves the dice and the
/// combatants untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    #[error("invalid die: d{0} (a die needs at least 2 sides)")]
    InvalidDie(u32),

    #[error("invalid dice notation: {0}")]
    InvalidNotation(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid roster: {0}")]
    EmptyRoster(String),

    #[error("invalid state: cannot {operation} while combat is {state}")]
    InvalidState {
        operation: &'static str,
        state: TurnState,
    },
}

/// Result alias for combat operations
pub type Result<T> = std::result::Result<T, CombatError>;
