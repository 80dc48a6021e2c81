//! Attack kinds and damage policy
//!
//! The attack kind picks the ability behind both the attack roll and the
//! damage modifier:
//! - Melee: strength
//! - Ranged, Finesse: dexterity
//! - Spell: the better of intelligence and wisdom
//!
//! Base damage comes from a swappable [`DamagePolicy`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::combatant::{Ability, Combatant};
use super::dice::{Dice, DiceRoll};
use super::error::Result;

/// How an attack is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    #[default]
    Melee,
    Ranged,
    Finesse,
    Spell,
}

impl AttackKind {
    pub fn all() -> &'static [AttackKind] {
        &[
            AttackKind::Melee,
            AttackKind::Ranged,
            AttackKind::Finesse,
            AttackKind::Spell,
        ]
    }

    /// Ability modifier this kind draws on for the given attacker
    pub fn ability_modifier(&self, attacker: &Combatant) -> i32 {
        match self {
            AttackKind::Melee => attacker.modifier(Ability::Strength),
            AttackKind::Ranged | AttackKind::Finesse => attacker.modifier(Ability::Dexterity),
            AttackKind::Spell => attacker
                .modifier(Ability::Intelligence)
                .max(attacker.modifier(Ability::Wisdom)),
        }
    }

    /// Weapon die used by [`StandardDamage::WeaponDie`]
    pub fn weapon_die(&self) -> DiceRoll {
        match self {
            AttackKind::Melee | AttackKind::Finesse => DiceRoll::new(1, 6, 0),
            AttackKind::Ranged => DiceRoll::new(1, 4, 0),
            AttackKind::Spell => DiceRoll::new(1, 8, 0),
        }
    }

    /// The kind a combatant is best at, preferring melee on ties
    pub fn preferred_for(combatant: &Combatant) -> AttackKind {
        AttackKind::all()
            .iter()
            .copied()
            .fold(AttackKind::Melee, |best, kind| {
                if kind.ability_modifier(combatant) > best.ability_modifier(combatant) {
                    kind
                } else {
                    best
                }
            })
    }
}

impl FromStr for AttackKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "melee" => Ok(AttackKind::Melee),
            "ranged" => Ok(AttackKind::Ranged),
            "finesse" => Ok(AttackKind::Finesse),
            "spell" | "magic" => Ok(AttackKind::Spell),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttackKind::Melee => "melee",
            AttackKind::Ranged => "ranged",
            AttackKind::Finesse => "finesse",
            AttackKind::Spell => "spell",
        };
        write!(f, "{}", s)
    }
}

/// Base damage before modifiers, criticals and the minimum-damage floor.
///
/// The resolver calls `validate` before the attack roll. Once it passes,
/// `base_damage` for the same attacker and kind must not fail.
pub trait DamagePolicy: Send {
    fn validate(&self, _attacker: &Combatant, _kind: AttackKind) -> Result<()> {
        Ok(())
    }

    fn base_damage(&self, attacker: &Combatant, kind: AttackKind, dice: &mut Dice)
        -> Result<i32>;
}

/// Built-in damage policies, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardDamage {
    /// Roll the attack kind's weapon die
    #[default]
    WeaponDie,
    /// Same base damage for every hit
    Fixed(i32),
    /// Roll the same notation for every kind
    Dice(DiceRoll),
}

impl DamagePolicy for StandardDamage {
    fn validate(&self, _attacker: &Combatant, kind: AttackKind) -> Result<()> {
        match self {
            StandardDamage::WeaponDie => kind.weapon_die().validate(),
            StandardDamage::Fixed(_) => Ok(()),
            StandardDamage::Dice(roll) => roll.validate(),
        }
    }

    fn base_damage(
        &self,
        _attacker: &Combatant,
        kind: AttackKind,
        dice: &mut Dice,
    ) -> Result<i32> {
        match self {
            StandardDamage::WeaponDie => Ok(dice.roll_notation(&kind.weapon_die())?.total()),
            StandardDamage::Fixed(amount) => Ok(*amount),
            StandardDamage::Dice(roll) => Ok(dice.roll_notation(roll)?.total()),
        }
    }
}

/// Every hit deals at least this much
pub const MIN_DAMAGE: i32 = 1;

/// Final damage from the parts of a hit
pub fn total_damage(base: i32, ability_modifier: i32, damage_bonus: i32, critical: bool) -> i32 {
    let damage = base
        .saturating_add(ability_modifier)
        .saturating_add(damage_bonus);
    let damage = if critical {
        damage.saturating_mul(2)
    } else {
        damage
    };
    damage.max(MIN_DAMAGE)
}
