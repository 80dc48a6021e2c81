//! Combat rules engine
//!
//! Implements tabletop-style combat with:
//! - Dice rolling (d20 checks, "2d6+3" notation)
//! - Attack resolution with to-hit, criticals and damage
//! - Flee attempts and skill checks
//! - Initiative order, turns and rounds
//! - Victory, defeat and draw detection

mod combatant;
mod damage;
mod dice;
mod encounter;
mod error;
mod events;
mod resolver;
mod turns;

pub use combatant::{ability_modifier, Ability, AbilityScores, Combatant, Side};
pub use damage::{total_damage, AttackKind, DamagePolicy, StandardDamage, MIN_DAMAGE};
pub use dice::{parse_dice, Dice, DiceRoll, FaceSource, RngFaces, RollResult, ScriptedFaces, D20};
pub use encounter::{Encounter, EncounterOutcome, EncounterSummary};
pub use error::{CombatError, Result};
pub use events::{CombatEvent, CombatListener, CombatLog, FnListener, Listeners, TracingListener};
pub use resolver::{AttackResult, CombatResolver, Skill, SkillCheck, DEFAULT_FLEE_DC};
pub use turns::{CombatOutcome, InitiativeRoll, TurnManager, TurnState};
