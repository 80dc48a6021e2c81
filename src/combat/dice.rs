//! Dice rolling system
//!
//! Rolls single dice, d20 checks against a difficulty class, and dice
//! notation like "2d6+3", "1d20", "4d6-2".
//!
//! Every roll draws from a [`Dice`] value owned by the caller. Nothing here
//! touches a process-wide generator, so an encounter seeded with
//! [`Dice::seeded`] replays identically.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::error::{CombatError, Result};

/// Sides on the die used for attacks, initiative and skill checks
pub const D20: u32 = 20;

/// Most dice a single notation may roll
pub const MAX_DICE: u32 = 100;

/// Most sides a die in a notation may have
pub const MAX_SIDES: u32 = 1000;

/// Source of raw die faces.
///
/// Implementations must return a value in `1..=sides`; `sides` is always at
/// least 2 when called through [`Dice`].
pub trait FaceSource: Send {
    fn face(&mut self, sides: u32) -> u32;
}

/// Uniform faces drawn from any `rand` generator
#[derive(Debug, Clone)]
pub struct RngFaces<R>(pub R);

impl<R: Rng + Send> FaceSource for RngFaces<R> {
    fn face(&mut self, sides: u32) -> u32 {
        self.0.random_range(1..=sides)
    }
}

/// Replays a fixed list of faces.
///
/// Faces are clamped into `1..=sides`. Once the script runs out the last
/// face repeats; an empty script always yields 1.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFaces {
    faces: VecDeque<u32>,
    last: Option<u32>,
}

impl ScriptedFaces {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            last: None,
        }
    }

    /// Faces not yet consumed
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl FaceSource for ScriptedFaces {
    fn face(&mut self, sides: u32) -> u32 {
        let face = match self.faces.pop_front() {
            Some(face) => {
                self.last = Some(face);
                face
            }
            None => self.last.unwrap_or(1),
        };
        face.clamp(1, sides)
    }
}

/// Dice generator owned by one encounter
pub struct Dice {
    source: Box<dyn FaceSource>,
}

impl fmt::Debug for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dice").finish_non_exhaustive()
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Dice {
    /// Dice seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::from_source(RngFaces(StdRng::from_os_rng()))
    }

    /// Deterministic dice for replays and tests
    pub fn seeded(seed: u64) -> Self {
        Self::from_source(RngFaces(StdRng::seed_from_u64(seed)))
    }

    /// Dice that replay the given natural faces in order
    pub fn scripted(faces: impl IntoIterator<Item = u32>) -> Self {
        Self::from_source(ScriptedFaces::new(faces))
    }

    pub fn from_source(source: impl FaceSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    fn draw(&mut self, sides: u32) -> u32 {
        self.source.face(sides).clamp(1, sides)
    }

    /// Roll one die with a modifier and no target
    pub fn roll_dice(&mut self, sides: u32, modifier: i32) -> Result<RollResult> {
        if sides < 2 {
            return Err(CombatError::InvalidDie(sides));
        }
        let natural = self.draw(sides);
        Ok(RollResult::open(natural, sides, modifier))
    }

    /// Roll a d20 check against a difficulty class
    pub fn roll_d20(&mut self, modifier: i32, difficulty_class: i32) -> RollResult {
        let natural = self.draw(D20);
        RollResult::d20_check(natural, modifier, difficulty_class)
    }

    /// Roll `count` dice and sum them; the natural value is the sum of faces
    pub fn roll_multiple(&mut self, count: u32, sides: u32, modifier: i32) -> Result<RollResult> {
        DiceRoll::new(count, sides, modifier).validate()?;
        if count == 1 {
            return self.roll_dice(sides, modifier);
        }

        let natural = (0..count).fold(0u32, |sum, _| sum.saturating_add(self.draw(sides)));
        Ok(RollResult {
            natural,
            sides,
            modifier,
            total: to_i32(natural).saturating_add(modifier),
            target: None,
            critical: false,
            critical_fail: false,
            success: false,
        })
    }

    /// Roll a parsed dice notation
    pub fn roll_notation(&mut self, roll: &DiceRoll) -> Result<RollResult> {
        self.roll_multiple(roll.count, roll.sides, roll.modifier)
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Outcome of a single roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RollResult {
    natural: u32,
    sides: u32,
    modifier: i32,
    total: i32,
    target: Option<i32>,
    critical: bool,
    critical_fail: bool,
    success: bool,
}

impl RollResult {
    fn open(natural: u32, sides: u32, modifier: i32) -> Self {
        let is_d20 = sides == D20;
        Self {
            natural,
            sides,
            modifier,
            total: to_i32(natural).saturating_add(modifier),
            target: None,
            critical: is_d20 && natural == D20,
            critical_fail: is_d20 && natural == 1,
            success: false,
        }
    }

    /// Classify a d20 check from its natural face.
    ///
    /// A natural 20 succeeds and a natural 1 fails no matter what the
    /// modified total says.
    pub fn d20_check(natural: u32, modifier: i32, difficulty_class: i32) -> Self {
        let natural = natural.clamp(1, D20);
        let critical = natural == D20;
        let critical_fail = natural == 1;
        let total = to_i32(natural).saturating_add(modifier);

        let success = if critical {
            true
        } else if critical_fail {
            false
        } else {
            total >= difficulty_class
        };

        Self {
            natural,
            sides: D20,
            modifier,
            total,
            target: Some(difficulty_class),
            critical,
            critical_fail,
            success,
        }
    }

    /// The unmodified die face (sum of faces for multi-dice rolls)
    pub fn natural(&self) -> u32 {
        self.natural
    }

    pub fn sides(&self) -> u32 {
        self.sides
    }

    pub fn modifier(&self) -> i32 {
        self.modifier
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    /// Difficulty class checked against, if any
    pub fn target(&self) -> Option<i32> {
        self.target
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn is_critical_fail(&self) -> bool {
        self.critical_fail
    }

    /// Always false when there was no target
    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// A parsed dice roll in `NdS+M` notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Modifier to add/subtract
    pub modifier: i32,
}

impl DiceRoll {
    pub const fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Check the counts a roll can be made with
    pub fn validate(&self) -> Result<()> {
        if self.sides < 2 || self.sides > MAX_SIDES {
            return Err(CombatError::InvalidDie(self.sides));
        }
        if self.count == 0 {
            return Err(CombatError::InvalidNotation(
                "dice count must be at least 1".to_string(),
            ));
        }
        if self.count > MAX_DICE {
            return Err(CombatError::InvalidNotation(format!(
                "at most {} dice per roll, got {}",
                MAX_DICE, self.count
            )));
        }
        Ok(())
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i32 {
        saturate(i64::from(self.count) + i64::from(self.modifier))
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i32 {
        saturate(i64::from(self.count) * i64::from(self.sides) + i64::from(self.modifier))
    }

    /// Get the expected average (rounded down)
    pub fn average(&self) -> i32 {
        let faces = i64::from(self.count) * (1 + i64::from(self.sides));
        let sum = faces + 2 * i64::from(self.modifier);
        saturate(sum.div_euclid(2))
    }
}

impl FromStr for DiceRoll {
    type Err = CombatError;

    fn from_str(s: &str) -> Result<Self> {
        parse_dice(s)
    }
}

impl TryFrom<String> for DiceRoll {
    type Error = CombatError;

    fn try_from(s: String) -> Result<Self> {
        parse_dice(&s)
    }
}

impl From<DiceRoll> for String {
    fn from(roll: DiceRoll) -> Self {
        roll.to_string()
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice(notation: &str) -> Result<DiceRoll> {
    let invalid = |msg: String| CombatError::InvalidNotation(msg);
    let notation = notation.trim().to_lowercase();

    let d_pos = notation
        .find('d')
        .ok_or_else(|| invalid(format!("missing 'd' in {notation:?}")))?;

    // "d6" means "1d6"
    let count_str = &notation[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| invalid(format!("bad dice count {count_str:?}")))?
    };
    let rest = &notation[d_pos + 1..];
    let (sides_str, modifier) = match rest.find(['+', '-']) {
        Some(pos) if pos > 0 => {
            let mod_str = rest[pos..].trim_start_matches('+');
            let modifier: i32 = mod_str
                .parse()
                .map_err(|_| invalid(format!("bad modifier {mod_str:?}")))?;
            (&rest[..pos], modifier)
        }
        _ => (rest, 0),
    };

    let sides: u32 = sides_str
        .parse()
        .map_err(|_| invalid(format!("bad die sides {sides_str:?}")))?;

    let roll = DiceRoll {
        count,
        sides,
        modifier,
    };
    roll.validate()?;
    Ok(roll)
}
