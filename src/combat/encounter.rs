//! Encounter facade
//!
//! Ties one turn manager to one resolver (and so to one set of dice) and
//! reports the end of combat to listeners exactly once.

use serde::Serialize;
use tracing::{debug, info};

use super::combatant::{Combatant, Side};
use super::damage::AttackKind;
use super::dice::Dice;
use super::error::{CombatError, Result};
use super::events::CombatListener;
use super::resolver::{AttackResult, CombatResolver, SkillCheck, Skill};
use super::turns::{CombatOutcome, TurnManager, TurnState};
use crate::config::EngineConfig;

/// What the caller persists once an encounter is over
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncounterSummary {
    pub outcome: EncounterOutcome,
    pub victory: bool,
    pub rounds: u32,
    /// Living players, with their remaining hit points
    pub survivors: Vec<Combatant>,
}

/// Final result of an encounter, including a successful escape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterOutcome {
    PlayerVictory,
    PlayerDefeat,
    Draw,
    Fled,
    Aborted,
}

impl From<CombatOutcome> for EncounterOutcome {
    fn from(outcome: CombatOutcome) -> Self {
        match outcome {
            CombatOutcome::PlayerVictory => EncounterOutcome::PlayerVictory,
            CombatOutcome::PlayerDefeat => EncounterOutcome::PlayerDefeat,
            CombatOutcome::Draw => EncounterOutcome::Draw,
            CombatOutcome::Aborted => EncounterOutcome::Aborted,
        }
    }
}

/// One combat encounter
#[derive(Debug)]
pub struct Encounter {
    turns: TurnManager,
    resolver: CombatResolver,
    fled: Option<Side>,
    end_reported: bool,
}

impl Encounter {
    /// Build an encounter from engine configuration
    pub fn new(config: &EngineConfig) -> Self {
        let dice = match config.seed {
            Some(seed) => Dice::seeded(seed),
            None => Dice::from_entropy(),
        };
        let mut resolver = CombatResolver::with_policy(dice, config.damage);
        resolver.set_flee_dc(config.flee_dc);
        Self::with_resolver(resolver)
    }

    pub fn with_resolver(resolver: CombatResolver) -> Self {
        Self {
            turns: TurnManager::new(),
            resolver,
            fled: None,
            end_reported: false,
        }
    }

    /// Weapon-die damage over the given dice
    pub fn with_dice(dice: Dice) -> Self {
        Self::with_resolver(CombatResolver::new(dice))
    }

    pub fn add_listener(&mut self, listener: impl CombatListener + 'static) {
        self.resolver.add_listener(listener);
    }

    pub fn resolver_mut(&mut self) -> &mut CombatResolver {
        &mut self.resolver
    }

    pub fn turns(&self) -> &TurnManager {
        &self.turns
    }

    /// Initialize the roster and roll initiative
    pub fn start(&mut self, roster: Vec<Combatant>) -> Result<()> {
        self.turns.initialize_combat(roster)?;
        self.turns.roll_initiative(self.resolver.dice_mut())?;
        self.fled = None;
        self.end_reported = false;
        Ok(())
    }

    pub fn current_combatant(&self) -> Result<Option<&Combatant>> {
        self.turns.current_combatant()
    }

    pub fn end_turn(&mut self) -> Result<()> {
        self.turns.next_turn()
    }

    pub fn round(&self) -> u32 {
        self.turns.round()
    }

    pub fn combatant(&self, id: &str) -> Option<&Combatant> {
        self.turns.combatant(id)
    }

    /// Resolve an attack between two roster members
    pub fn attack(
        &mut self,
        attacker_id: &str,
        target_id: &str,
        kind: AttackKind,
    ) -> Result<AttackResult> {
        let resolver = &mut self.resolver;
        let result = self
            .turns
            .with_pair(attacker_id, target_id, |attacker, target| {
                resolver.perform_attack(attacker, target, kind)
            })?;
        self.check_end();
        Ok(result)
    }

    /// Try to escape with every living member of a side.
    ///
    /// A successful escape ends the encounter.
    pub fn attempt_flee(&mut self, side: Side) -> Result<bool> {
        self.require_in_progress("flee")?;
        let fled = self.resolver.attempt_flee(self.turns.living(side))?;
        if fled {
            info!(%side, "side fled the encounter");
            self.fled = Some(side);
            self.turns.end();
            self.report_end(false);
        }
        Ok(fled)
    }

    /// Heal a living combatant; returns hit points restored
    pub fn heal(&mut self, id: &str, amount: i32) -> Result<i32> {
        self.require_in_progress("heal")?;
        let combatant = self.turns.combatant_mut(id)?;
        if !combatant.is_alive() {
            return Err(CombatError::InvalidTarget(format!("{} is already defeated", id)));
        }
        let healed = combatant.heal(amount);
        debug!(combatant = %id, healed, hp = combatant.hp(), "healed");
        Ok(healed)
    }

    pub fn skill_check(
        &mut self,
        id: &str,
        skill: Skill,
        difficulty_class: i32,
    ) -> Result<SkillCheck> {
        let combatant = self
            .turns
            .combatant(id)
            .ok_or_else(|| CombatError::InvalidTarget(format!("unknown combatant {}", id)))?;
        Ok(self.resolver.skill_check(combatant, skill, difficulty_class))
    }

    /// Take a combatant out of the fight, notifying listeners if it was standing
    pub fn remove_combatant(&mut self, id: &str) -> Result<()> {
        if self.turns.remove_combatant(id)? {
            if let Some(combatant) = self.turns.combatant(id) {
                self.resolver.listeners_mut().combatant_defeated(combatant);
            }
            self.check_end();
        }
        Ok(())
    }

    /// Let the current combatant attack the weakest living opponent with its
    /// best attack kind, then pass the turn. Returns `None` once combat is over.
    pub fn take_auto_turn(&mut self) -> Result<Option<AttackResult>> {
        if self.is_over() {
            return Ok(None);
        }
        let Some(current) = self.turns.current_combatant()? else {
            return Ok(None);
        };
        let attacker_id = current.id.clone();
        let kind = AttackKind::preferred_for(current);
        let target_id = self
            .turns
            .living(current.side.opponent())
            .min_by_key(|c| c.hp())
            .map(|c| c.id.clone());

        let result = match target_id {
            Some(target_id) => Some(self.attack(&attacker_id, &target_id, kind)?),
            None => None,
        };
        self.turns.next_turn()?;
        Ok(result)
    }

    /// Whether combat has ended, by defeat, escape or the caller
    pub fn is_over(&mut self) -> bool {
        self.check_end();
        self.turns.state() == TurnState::Ended
    }

    /// Finalize the encounter, ending it early if it is still running
    pub fn finish(&mut self) -> EncounterSummary {
        self.check_end();
        self.turns.end();

        let outcome = match self.fled {
            Some(_) => EncounterOutcome::Fled,
            None => self
                .turns
                .outcome()
                .map(EncounterOutcome::from)
                .unwrap_or(EncounterOutcome::Aborted),
        };
        let victory = outcome == EncounterOutcome::PlayerVictory;
        self.report_end(victory);

        let summary = EncounterSummary {
            outcome,
            victory,
            rounds: self.turns.round(),
            survivors: self.turns.living(Side::Player).cloned().collect(),
        };
        info!(
            outcome = ?summary.outcome,
            rounds = summary.rounds,
            survivors = summary.survivors.len(),
            "encounter finished"
        );
        summary
    }

    /// Hand the roster back for persistence
    pub fn into_combatants(self) -> Vec<Combatant> {
        self.turns.into_combatants()
    }

    fn check_end(&mut self) {
        if !self.end_reported && self.turns.is_combat_over() {
            let victory = self.turns.is_player_victory().unwrap_or(false);
            self.report_end(victory);
        }
    }

    fn report_end(&mut self, victory: bool) {
        if !self.end_reported {
            self.end_reported = true;
            self.resolver.listeners_mut().combat_end(victory);
        }
    }

    fn require_in_progress(&self, operation: &'static str) -> Result<()> {
        match self.turns.state() {
            TurnState::InProgress => Ok(()),
            state => Err(CombatError::InvalidState { operation, state }),
        }
    }
}
