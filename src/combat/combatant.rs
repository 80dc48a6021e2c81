//! Combatants and ability scores

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which side of the encounter a combatant fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player => write!(f, "PLAYER"),
            Side::Enemy => write!(f, "ENEMY"),
        }
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "player" | "hero" => Ok(Side::Player),
            "enemy" | "monster" => Ok(Side::Enemy),
            _ => Err(()),
        }
    }
}

/// The six abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

/// Ability modifier for a score: floor((score - 10) / 2)
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// Six ability scores; missing scores default to 10 when deserialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl AbilityScores {
    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.score(ability))
    }
}

/// A participant in one encounter.
///
/// Hit points stay within `0..=max_hp`; zero means defeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub name: String,
    pub side: Side,
    hp: i32,
    max_hp: i32,
    pub armor_class: i32,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub damage_bonus: i32,
}

impl Combatant {
    /// Create a combatant at full health with average abilities
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        side: Side,
        max_hp: i32,
        armor_class: i32,
    ) -> Self {
        let max_hp = max_hp.max(0);
        Self {
            id: id.into(),
            name: name.into(),
            side,
            hp: max_hp,
            max_hp,
            armor_class,
            abilities: AbilityScores::default(),
            attack_bonus: 0,
            damage_bonus: 0,
        }
    }

    pub fn with_abilities(mut self, abilities: AbilityScores) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_bonuses(mut self, attack_bonus: i32, damage_bonus: i32) -> Self {
        self.attack_bonus = attack_bonus;
        self.damage_bonus = damage_bonus;
        self
    }

    /// Start below full health (persisted wounds); clamped into `0..=max_hp`
    pub fn with_hp(mut self, hp: i32) -> Self {
        self.hp = hp.clamp(0, self.max_hp);
        self
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    pub fn dexterity_modifier(&self) -> i32 {
        self.modifier(Ability::Dexterity)
    }

    /// Apply damage, returning the hit points actually lost
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let lost = amount.clamp(0, self.hp);
        self.hp -= lost;
        lost
    }

    /// Heal (cannot exceed max_hp, cannot revive)
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.is_alive() {
            return 0;
        }
        let actual = amount.clamp(0, self.max_hp - self.hp);
        self.hp += actual;
        actual
    }

    /// Force hit points to zero
    pub(crate) fn defeat(&mut self) {
        self.hp = 0;
    }

    /// Re-establish `0 <= hp <= max_hp` after deserializing untrusted records
    pub fn normalize(&mut self) {
        self.max_hp = self.max_hp.max(0);
        self.hp = self.hp.clamp(0, self.max_hp);
    }
}
