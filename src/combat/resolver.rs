//! Attack, flee and skill check resolution

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::combatant::{Ability, Combatant};
use super::damage::{total_damage, AttackKind, DamagePolicy, StandardDamage};
use super::dice::{Dice, RollResult};
use super::error::{CombatError, Result};
use super::events::{CombatListener, Listeners};

/// Difficulty class for fleeing an encounter
pub const DEFAULT_FLEE_DC: i32 = 10;

/// Result of one attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackResult {
    pub attacker_id: String,
    pub target_id: String,
    pub kind: AttackKind,
    /// The d20 attack roll against the target's armor class
    pub roll: RollResult,
    pub hit: bool,
    pub critical: bool,
    /// Damage dealt (0 on a miss)
    pub damage: i32,
    /// Target hit points after the attack
    pub target_hp: i32,
}

impl AttackResult {
    pub fn defeated_target(&self) -> bool {
        self.hit && self.target_hp == 0
    }
}

/// Skills usable for checks in and around combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Stealth,
    Acrobatics,
    Athletics,
    Arcana,
    Investigation,
    Perception,
    Insight,
    Persuasion,
    Deception,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Stealth | Skill::Acrobatics => Ability::Dexterity,
            Skill::Athletics => Ability::Strength,
            Skill::Arcana | Skill::Investigation => Ability::Intelligence,
            Skill::Perception | Skill::Insight => Ability::Wisdom,
            Skill::Persuasion | Skill::Deception => Ability::Charisma,
        }
    }
}

impl FromStr for Skill {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stealth" => Ok(Skill::Stealth),
            "acrobatics" => Ok(Skill::Acrobatics),
            "athletics" => Ok(Skill::Athletics),
            "arcana" => Ok(Skill::Arcana),
            "investigation" => Ok(Skill::Investigation),
            "perception" => Ok(Skill::Perception),
            "insight" => Ok(Skill::Insight),
            "persuasion" => Ok(Skill::Persuasion),
            "deception" => Ok(Skill::Deception),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Result of a skill check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCheck {
    pub combatant_id: String,
    pub skill: Skill,
    pub roll: RollResult,
}

impl SkillCheck {
    pub fn is_success(&self) -> bool {
        self.roll.is_success()
    }
}

/// Resolves attacks, flee attempts and skill checks for one encounter.
///
/// Owns the encounter's dice and its listeners.
pub struct CombatResolver {
    dice: Dice,
    damage: Box<dyn DamagePolicy>,
    listeners: Listeners,
    flee_dc: i32,
}

impl fmt::Debug for CombatResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombatResolver")
            .field("dice", &self.dice)
            .field("listeners", &self.listeners)
            .field("flee_dc", &self.flee_dc)
            .finish_non_exhaustive()
    }
}

impl Default for CombatResolver {
    fn default() -> Self {
        Self::new(Dice::default())
    }
}

impl CombatResolver {
    /// Create a resolver with weapon-die damage
    pub fn new(dice: Dice) -> Self {
        Self::with_policy(dice, StandardDamage::WeaponDie)
    }

    pub fn with_policy(dice: Dice, damage: impl DamagePolicy + 'static) -> Self {
        Self {
            dice,
            damage: Box::new(damage),
            listeners: Listeners::default(),
            flee_dc: DEFAULT_FLEE_DC,
        }
    }

    pub fn set_flee_dc(&mut self, flee_dc: i32) {
        self.flee_dc = flee_dc;
    }

    pub fn flee_dc(&self) -> i32 {
        self.flee_dc
    }

    /// Swap the damage policy
    pub fn set_damage_policy(&mut self, damage: impl DamagePolicy + 'static) {
        self.damage = Box::new(damage);
    }

    pub fn add_listener(&mut self, listener: impl CombatListener + 'static) {
        self.listeners.add(listener);
    }

    pub fn dice_mut(&mut self) -> &mut Dice {
        &mut self.dice
    }

    pub(crate) fn listeners_mut(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    /// Resolve one attack, applying damage to the target.
    ///
    /// Nothing is mutated when the attack is rejected.
    pub fn perform_attack(
        &mut self,
        attacker: &Combatant,
        target: &mut Combatant,
        kind: AttackKind,
    ) -> Result<AttackResult> {
        if attacker.id == target.id {
            return Err(CombatError::InvalidTarget(format!(
                "{} cannot attack itself",
                attacker.id
            )));
        }
        if !attacker.is_alive() {
            return Err(CombatError::InvalidTarget(format!(
                "attacker {} is already defeated",
                attacker.id
            )));
        }
        if !target.is_alive() {
            return Err(CombatError::InvalidTarget(format!(
                "target {} is already defeated",
                target.id
            )));
        }

        self.damage.validate(attacker, kind)?;

        let ability_modifier = kind.ability_modifier(attacker);
        let attack_modifier = ability_modifier.saturating_add(attacker.attack_bonus);
        let roll = self.dice.roll_d20(attack_modifier, target.armor_class);

        debug!(
            attacker = %attacker.id,
            target = %target.id,
            %kind,
            natural = roll.natural(),
            total = roll.total(),
            armor_class = target.armor_class,
            "attack roll"
        );

        if !roll.is_success() {
            self.listeners.attack_miss(attacker, target);
            return Ok(AttackResult {
                attacker_id: attacker.id.clone(),
                target_id: target.id.clone(),
                kind,
                roll,
                hit: false,
                critical: false,
                damage: 0,
                target_hp: target.hp(),
            });
        }

        let critical = roll.is_critical();
        let base = self.damage.base_damage(attacker, kind, &mut self.dice)?;
        let damage = total_damage(base, ability_modifier, attacker.damage_bonus, critical);
        target.take_damage(damage);

        self.listeners.attack_hit(attacker, target, damage, critical);
        if !target.is_alive() {
            self.listeners.combatant_defeated(target);
        }

        Ok(AttackResult {
            attacker_id: attacker.id.clone(),
            target_id: target.id.clone(),
            kind,
            roll,
            hit: true,
            critical,
            damage,
            target_hp: target.hp(),
        })
    }

    /// Try to flee with a group.
    ///
    /// Rolls one d20 with the best dexterity modifier among the living
    /// members against the flee difficulty class. Hit points are untouched.
    pub fn attempt_flee<'a, I>(&mut self, group: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a Combatant>,
    {
        let best_dex = group
            .into_iter()
            .filter(|c| c.is_alive())
            .map(Combatant::dexterity_modifier)
            .max()
            .ok_or_else(|| CombatError::InvalidTarget("no living combatants to flee".to_string()))?;

        let roll = self.dice.roll_d20(best_dex, self.flee_dc);
        debug!(
            natural = roll.natural(),
            total = roll.total(),
            dc = self.flee_dc,
            success = roll.is_success(),
            "flee attempt"
        );
        Ok(roll.is_success())
    }

    /// Roll a skill check against a difficulty class
    pub fn skill_check(
        &mut self,
        combatant: &Combatant,
        skill: Skill,
        difficulty_class: i32,
    ) -> SkillCheck {
        let modifier = combatant.modifier(skill.ability());
        let roll = self.dice.roll_d20(modifier, difficulty_class);
        debug!(
            combatant = %combatant.id,
            %skill,
            total = roll.total(),
            dc = difficulty_class,
            "skill check"
        );
        SkillCheck {
            combatant_id: combatant.id.clone(),
            skill,
            roll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::{AbilityScores, Side};
    use crate::combat::dice::DiceRoll;
    use crate::combat::events::{CombatEvent, CombatLog};

    fn warrior() -> Combatant {
        Combatant::new("warrior", "Warrior", Side::Player, 30, 16).with_abilities(AbilityScores {
            strength: 16,
            ..AbilityScores::default()
        })
    }

    fn bandit() -> Combatant {
        Combatant::new("bandit", "Bandit", Side::Enemy, 25, 14)
    }

    fn resolver(faces: impl IntoIterator<Item = u32>) -> (CombatResolver, CombatLog) {
        let mut resolver = CombatResolver::new(Dice::scripted(faces));
        let log = CombatLog::new();
        resolver.add_listener(log.listener());
        (resolver, log)
    }

    #[test]
    fn test_critical_hit_doubles_damage() {
        // d20 = 20, d6 = 4: (4 + 3) * 2
        let (mut resolver, log) = resolver([20, 4]);
        let attacker = warrior();
        let mut target = bandit();

        let result = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap();
        assert!(result.hit);
        assert!(result.critical);
        assert_eq!(result.damage, 14);
        assert_eq!(result.target_hp, 11);
        assert_eq!(target.hp(), 11);
        assert_eq!(
            log.events(),
            vec![CombatEvent::AttackHit {
                attacker: "warrior".into(),
                target: "bandit".into(),
                damage: 14,
                critical: true
            }]
        );
    }

    #[test]
    fn test_natural_one_misses_despite_bonus() {
        let (mut resolver, log) = resolver([1]);
        let attacker = warrior().with_bonuses(30, 0);
        let mut target = bandit();

        let result = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap();
        assert!(!result.hit);
        assert_eq!(result.damage, 0);
        assert_eq!(target.hp(), 25);
        assert_eq!(log.len(), 1);
        assert!(matches!(log.events()[0], CombatEvent::AttackMiss { .. }));
    }

    #[test]
    fn test_natural_twenty_hits_impossible_armor() {
        let (mut resolver, _log) = resolver([20, 1]);
        let attacker = warrior().with_bonuses(-10, 0);
        let mut target = bandit();
        target.armor_class = 40;

        let result = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap();
        assert!(result.hit);
        assert!(result.critical);
    }

    #[test]
    fn test_plain_hit_and_miss_against_armor() {
        // 11 + 3 = 14 meets AC 14; 10 + 3 = 13 misses
        let (mut resolver, _log) = resolver([11, 2, 10]);
        let attacker = warrior();
        let mut target = bandit();

        let hit = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap();
        assert!(hit.hit);
        assert!(!hit.critical);
        assert_eq!(hit.damage, 5);

        let miss = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap();
        assert!(!miss.hit);
        assert_eq!(miss.roll.total(), 13);
    }

    #[test]
    fn test_defeat_clamps_and_fires_once() {
        let mut resolver =
            CombatResolver::with_policy(Dice::scripted([15]), StandardDamage::Fixed(100));
        let log = CombatLog::new();
        resolver.add_listener(log.listener());

        let attacker = warrior();
        let mut target = bandit();
        let result = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap();
        assert_eq!(result.target_hp, 0);
        assert!(result.defeated_target());
        assert_eq!(target.hp(), 0);
        assert_eq!(log.defeats_of("bandit"), 1);

        let err = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap_err();
        assert!(matches!(err, CombatError::InvalidTarget(_)));
        assert_eq!(log.defeats_of("bandit"), 1);
    }

    #[test]
    fn test_rejected_attack_consumes_no_dice() {
        let mut resolver = CombatResolver::new(Dice::scripted([20, 6, 20, 6]));
        let attacker = warrior();
        let mut dead = bandit().with_hp(0);
        assert!(resolver.perform_attack(&attacker, &mut dead, AttackKind::Melee).is_err());

        let mut corpse_attacker = warrior().with_hp(0);
        corpse_attacker.id = "ghost".into();
        let mut target = bandit();
        assert!(resolver
            .perform_attack(&corpse_attacker, &mut target, AttackKind::Melee)
            .is_err());
        assert_eq!(target.hp(), 25);

        let mut same = warrior();
        assert!(resolver.perform_attack(&attacker, &mut same, AttackKind::Melee).is_err());

        let result = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap();
        assert!(result.critical);
    }

    #[test]
    fn test_bad_damage_policy_consumes_no_dice() {
        let (mut resolver, log) = resolver([20, 5, 5]);
        resolver.set_damage_policy(StandardDamage::Dice(DiceRoll::new(0, 6, 0)));
        let attacker = warrior();
        let mut target = bandit();

        assert!(matches!(
            resolver.perform_attack(&attacker, &mut target, AttackKind::Melee),
            Err(CombatError::InvalidNotation(_))
        ));
        assert_eq!(target.hp(), 25);
        assert!(log.is_empty());

        resolver.set_damage_policy(StandardDamage::Fixed(1));
        let result = resolver.perform_attack(&attacker, &mut target, AttackKind::Melee).unwrap();
        assert_eq!(result.roll.natural(), 20);
        assert!(result.critical);
        // (1 + 3) * 2
        assert_eq!(result.damage, 8);
    }

    #[test]
    fn test_damage_never_raises_hp() {
        let mut resolver = CombatResolver::new(Dice::seeded(11));
        let weakling = Combatant::new("w", "Weakling", Side::Player, 5, 10)
            .with_abilities(AbilityScores {
                strength: 1,
                ..AbilityScores::default()
            })
            .with_bonuses(10, -20);

        let mut target = bandit();
        target.armor_class = 0;
        while target.is_alive() {
            let before = target.hp();
            let result = resolver
                .perform_attack(&weakling, &mut target, AttackKind::Melee)
                .unwrap();
            assert!(target.hp() <= before);
            assert!(target.hp() >= 0);
            if result.hit {
                assert!(result.damage >= 1);
            }
        }
    }

    #[test]
    fn test_spell_uses_best_mental_ability() {
        let (mut resolver, _log) = resolver([10, 8]);
        let cleric =
            Combatant::new("c", "Cleric", Side::Player, 14, 13).with_abilities(AbilityScores {
                intelligence: 8,
                wisdom: 18,
                ..AbilityScores::default()
            });
        let mut target = bandit();

        let result = resolver.perform_attack(&cleric, &mut target, AttackKind::Spell).unwrap();
        assert_eq!(result.roll.modifier(), 4);
        assert!(result.hit);
        assert_eq!(result.damage, 12);
    }

    #[test]
    fn test_flee_uses_best_dexterity() {
        let mut resolver = CombatResolver::new(Dice::scripted([7]));
        let slow = warrior();
        let quick =
            Combatant::new("rogue", "Rogue", Side::Player, 18, 14).with_abilities(AbilityScores {
                dexterity: 16,
                ..AbilityScores::default()
            });
        // 7 + 3 = 10 meets DC 10
        assert_eq!(resolver.attempt_flee([&slow, &quick]), Ok(true));

        let mut resolver = CombatResolver::new(Dice::scripted([7]));
        assert_eq!(resolver.attempt_flee([&slow]), Ok(false));
    }

    #[test]
    fn test_flee_ignores_defeated_members() {
        let mut resolver = CombatResolver::new(Dice::scripted([7]));
        let slow = warrior();
        let fallen = Combatant::new("rogue", "Rogue", Side::Player, 18, 14)
            .with_abilities(AbilityScores {
                dexterity: 20,
                ..AbilityScores::default()
            })
            .with_hp(0);
        assert_eq!(resolver.attempt_flee([&slow, &fallen]), Ok(false));
    }

    #[test]
    fn test_flee_empty_group_is_invalid() {
        let mut resolver = CombatResolver::new(Dice::seeded(1));
        let empty: Vec<Combatant> = Vec::new();
        assert!(matches!(resolver.attempt_flee(&empty), Err(CombatError::InvalidTarget(_))));

        let fallen = warrior().with_hp(0);
        assert!(matches!(resolver.attempt_flee([&fallen]), Err(CombatError::InvalidTarget(_))));
    }

    #[test]
    fn test_skill_check() {
        let mut resolver = CombatResolver::new(Dice::scripted([12, 1]));
        let bard = Combatant::new("b", "Bard", Side::Player, 12, 12).with_abilities(AbilityScores {
            charisma: 17,
            ..AbilityScores::default()
        });

        let check = resolver.skill_check(&bard, Skill::Persuasion, 15);
        assert_eq!(check.roll.total(), 15);
        assert!(check.is_success());

        let check = resolver.skill_check(&bard, Skill::Deception, -5);
        assert!(!check.is_success());
        assert_eq!("ARCANA".parse::<Skill>(), Ok(Skill::Arcana));
        assert_eq!(Skill::Insight.ability(), Ability::Wisdom);
    }
}
