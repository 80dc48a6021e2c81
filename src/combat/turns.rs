//! Turn and round tracking
//!
//! The turn manager owns an encounter's roster:
//! - Initiative is rolled once, d20 + dexterity modifier
//! - Ties go to the higher dexterity modifier, then to the earlier roster slot
//! - Defeated combatants stay in the order but are skipped
//! - A round ends when the turn wraps past the last living combatant

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use super::combatant::{Combatant, Side};
use super::dice::{Dice, RollResult};
use super::error::{CombatError, Result};

/// Lifecycle of an encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    NotStarted,
    InitiativeRolled,
    InProgress,
    Ended,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnState::NotStarted => "not started",
            TurnState::InitiativeRolled => "rolling initiative",
            TurnState::InProgress => "in progress",
            TurnState::Ended => "ended",
        };
        write!(f, "{}", s)
    }
}

/// How an encounter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    /// Every enemy defeated, at least one player standing
    PlayerVictory,
    /// Every player defeated, at least one enemy standing
    PlayerDefeat,
    /// Both sides defeated in the same resolution step
    Draw,
    /// Ended by the caller while both sides still stood
    Aborted,
}

impl CombatOutcome {
    pub fn is_victory(&self) -> bool {
        matches!(self, CombatOutcome::PlayerVictory)
    }
}

/// One combatant's initiative roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiativeRoll {
    pub combatant_id: String,
    pub roll: RollResult,
    pub dexterity_modifier: i32,
}

/// Initiative order and turn/round progression for one encounter
#[derive(Debug, Clone)]
pub struct TurnManager {
    /// Registration order
    roster: Vec<Combatant>,
    /// Initiative order as roster slots; never reordered once rolled
    order: Vec<usize>,
    /// Parallel to `order`
    rolls: Vec<InitiativeRoll>,
    /// Position in `order` of the combatant whose turn it is
    cursor: usize,
    round: u32,
    state: TurnState,
}

impl Default for TurnManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnManager {
    pub fn new() -> Self {
        Self {
            roster: Vec::new(),
            order: Vec::new(),
            rolls: Vec::new(),
            cursor: 0,
            round: 1,
            state: TurnState::NotStarted,
        }
    }

    /// Store the roster for a new encounter.
    ///
    /// Needs unique ids and at least one living combatant on each side.
    pub fn initialize_combat(&mut self, combatants: Vec<Combatant>) -> Result<()> {
        if combatants.is_empty() {
            return Err(CombatError::EmptyRoster("no combatants".to_string()));
        }

        let mut seen = HashSet::new();
        for combatant in &combatants {
            if !seen.insert(combatant.id.as_str()) {
                return Err(CombatError::EmptyRoster(format!(
                    "duplicate combatant id {}",
                    combatant.id
                )));
            }
        }

        let mut roster = combatants;
        for combatant in &mut roster {
            combatant.normalize();
        }
        for side in [Side::Player, Side::Enemy] {
            if !roster.iter().any(|c| c.side == side && c.is_alive()) {
                return Err(CombatError::EmptyRoster(format!("no living {} combatant", side)));
            }
        }

        info!(combatants = roster.len(), "combat initialized");
        *self = Self {
            roster,
            ..Self::new()
        };
        Ok(())
    }

    /// Roll initiative once for every living combatant and start the first round
    pub fn roll_initiative(&mut self, dice: &mut Dice) -> Result<()> {
        if self.state != TurnState::NotStarted || self.roster.is_empty() {
            return Err(self.invalid_state("roll initiative"));
        }

        let mut entries: Vec<(usize, InitiativeRoll)> = self
            .roster
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_alive())
            .map(|(slot, c)| {
                let dexterity_modifier = c.dexterity_modifier();
                let roll = dice.roll_d20(dexterity_modifier, 0);
                (
                    slot,
                    InitiativeRoll {
                        combatant_id: c.id.clone(),
                        roll,
                        dexterity_modifier,
                    },
                )
            })
            .collect();

        entries.sort_by(|(slot_a, a), (slot_b, b)| {
            b.roll
                .total()
                .cmp(&a.roll.total())
                .then(b.dexterity_modifier.cmp(&a.dexterity_modifier))
                .then(slot_a.cmp(slot_b))
        });

        let (order, rolls): (Vec<usize>, Vec<InitiativeRoll>) = entries.into_iter().unzip();
        self.order = order;
        self.rolls = rolls;
        self.state = TurnState::InitiativeRolled;

        info!(
            order = ?self
                .rolls
                .iter()
                .map(|r| (r.combatant_id.as_str(), r.roll.total()))
                .collect::<Vec<_>>(),
            "initiative rolled"
        );

        self.cursor = 0;
        self.round = 1;
        self.state = TurnState::InProgress;
        Ok(())
    }

    /// The combatant whose turn it is; `None` once combat has ended
    pub fn current_combatant(&self) -> Result<Option<&Combatant>> {
        match self.state {
            TurnState::NotStarted | TurnState::InitiativeRolled => {
                Err(self.invalid_state("get the current combatant"))
            }
            TurnState::Ended => Ok(None),
            TurnState::InProgress => Ok(self
                .order
                .get(self.cursor)
                .map(|&slot| &self.roster[slot])
                .filter(|c| c.is_alive())),
        }
    }

    /// Advance to the next living combatant; a no-op once combat has ended
    pub fn next_turn(&mut self) -> Result<()> {
        match self.state {
            TurnState::NotStarted | TurnState::InitiativeRolled => {
                Err(self.invalid_state("advance the turn"))
            }
            TurnState::Ended => Ok(()),
            TurnState::InProgress => {
                self.advance();
                Ok(())
            }
        }
    }

    fn advance(&mut self) {
        let len = self.order.len();
        let mut wrapped = false;

        for step in 1..=len {
            let pos = self.cursor + step;
            if pos >= len {
                wrapped = true;
            }
            let pos = pos % len;
            if self.roster[self.order[pos]].is_alive() {
                self.cursor = pos;
                if wrapped {
                    self.round += 1;
                    debug!(round = self.round, "new round");
                }
                debug!(
                    combatant = %self.roster[self.order[pos]].id,
                    round = self.round,
                    "next turn"
                );
                return;
            }
        }

        info!("no living combatants remain");
        self.state = TurnState::Ended;
    }

    /// Skip the current combatant if it was defeated during its own turn
    fn skip_defeated_current(&mut self) {
        if self.state != TurnState::InProgress {
            return;
        }
        let current_down = self
            .order
            .get(self.cursor)
            .is_some_and(|&slot| !self.roster[slot].is_alive());
        if current_down {
            self.advance();
        }
    }

    /// Force a combatant out of the fight.
    ///
    /// Hit points drop to zero and it is skipped from now on; the initiative
    /// order itself is untouched. Returns whether it was still alive.
    pub fn remove_combatant(&mut self, id: &str) -> Result<bool> {
        if self.state == TurnState::Ended {
            return Err(self.invalid_state("remove a combatant"));
        }
        let slot = self.slot(id)?;
        let was_alive = self.roster[slot].is_alive();
        self.roster[slot].defeat();
        if was_alive {
            info!(combatant = %id, "combatant removed");
            self.skip_defeated_current();
        }
        Ok(was_alive)
    }

    /// Run `f` on an attacker/target pair from the roster.
    ///
    /// If the current combatant goes down inside `f` the turn passes on.
    pub fn with_pair<T>(
        &mut self,
        attacker_id: &str,
        target_id: &str,
        f: impl FnOnce(&Combatant, &mut Combatant) -> Result<T>,
    ) -> Result<T> {
        if self.state != TurnState::InProgress {
            return Err(self.invalid_state("resolve an action"));
        }
        let attacker = self.slot(attacker_id)?;
        let target = self.slot(target_id)?;
        if attacker == target {
            return Err(CombatError::InvalidTarget(format!(
                "{} cannot target itself",
                attacker_id
            )));
        }

        let (a, t) = if attacker < target {
            let (left, right) = self.roster.split_at_mut(target);
            (&left[attacker], &mut right[0])
        } else {
            let (left, right) = self.roster.split_at_mut(attacker);
            (&right[0], &mut left[target])
        };
        let result = f(a, t)?;

        self.skip_defeated_current();
        Ok(result)
    }

    /// Mutable access to one combatant for non-lethal changes such as healing.
    ///
    /// Hit points can only go down through [`TurnManager::with_pair`] and
    /// [`TurnManager::remove_combatant`].
    pub(crate) fn combatant_mut(&mut self, id: &str) -> Result<&mut Combatant> {
        let slot = self.slot(id)?;
        Ok(&mut self.roster[slot])
    }

    /// True once one side has no living members; latches the state to ended
    pub fn is_combat_over(&mut self) -> bool {
        let over = self.sides_decided();
        if over && self.state != TurnState::Ended {
            info!(round = self.round, "combat over");
            self.state = TurnState::Ended;
        }
        over
    }

    fn sides_decided(&self) -> bool {
        !self.roster.is_empty()
            && (self.living(Side::Player).next().is_none()
                || self.living(Side::Enemy).next().is_none())
    }

    /// Only defined once combat is over
    pub fn is_player_victory(&self) -> Result<bool> {
        if !self.sides_decided() {
            return Err(self.invalid_state("decide victory"));
        }
        Ok(self.outcome().is_some_and(|outcome| outcome.is_victory()))
    }

    /// Current outcome, if any
    pub fn outcome(&self) -> Option<CombatOutcome> {
        if self.sides_decided() {
            let players = self.living(Side::Player).next().is_some();
            let enemies = self.living(Side::Enemy).next().is_some();
            Some(match (players, enemies) {
                (true, false) => CombatOutcome::PlayerVictory,
                (false, true) => CombatOutcome::PlayerDefeat,
                _ => CombatOutcome::Draw,
            })
        } else if self.state == TurnState::Ended {
            Some(CombatOutcome::Aborted)
        } else {
            None
        }
    }

    /// End the encounter now
    pub fn end(&mut self) {
        if self.state != TurnState::Ended {
            info!(round = self.round, "combat ended by caller");
            self.state = TurnState::Ended;
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Roster in registration order
    pub fn combatants(&self) -> &[Combatant] {
        &self.roster
    }

    pub fn combatant(&self, id: &str) -> Option<&Combatant> {
        self.roster.iter().find(|c| c.id == id)
    }

    /// Everyone who rolled initiative, in turn order, defeated or not
    pub fn initiative_order(&self) -> impl Iterator<Item = &Combatant> + '_ {
        self.order.iter().map(|&slot| &self.roster[slot])
    }

    pub fn initiative_rolls(&self) -> &[InitiativeRoll] {
        &self.rolls
    }

    pub fn living(&self, side: Side) -> impl Iterator<Item = &Combatant> + '_ {
        self.roster
            .iter()
            .filter(move |c| c.side == side && c.is_alive())
    }

    /// Give the roster back to the caller for persistence
    pub fn into_combatants(self) -> Vec<Combatant> {
        self.roster
    }

    fn slot(&self, id: &str) -> Result<usize> {
        self.roster
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CombatError::InvalidTarget(format!("unknown combatant {}", id)))
    }

    fn invalid_state(&self, operation: &'static str) -> CombatError {
        CombatError::InvalidState {
            operation,
            state: self.state,
        }
    }
}
