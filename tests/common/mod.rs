//! Common test utilities - rosters and scripted encounters

#![allow(dead_code)]

use glory_combat::combat::{AbilityScores, CombatLog, Dice, Encounter};
use glory_combat::{Combatant, Side};

/// Warrior: HP 30, AC 16, STR 16
pub fn warrior() -> Combatant {
    Combatant::new("warrior", "Warrior", Side::Player, 30, 16).with_abilities(AbilityScores {
        strength: 16,
        ..AbilityScores::default()
    })
}

/// Bandit: HP 25, AC 14
pub fn bandit() -> Combatant {
    Combatant::new("bandit", "Bandit", Side::Enemy, 25, 14)
}

pub fn duel() -> Vec<Combatant> {
    vec![warrior(), bandit()]
}

/// A mixed roster of `players` heroes and `enemies` monsters
pub fn skirmish(players: usize, enemies: usize) -> Vec<Combatant> {
    let heroes = (0..players).map(|i| {
        Combatant::new(format!("hero-{i}"), format!("Hero {i}"), Side::Player, 12 + i as i32, 13)
            .with_abilities(AbilityScores {
                strength: 12 + i as i32,
                dexterity: 10 + (i as i32 % 3) * 2,
                ..AbilityScores::default()
            })
    });
    let monsters = (0..enemies).map(|i| {
        Combatant::new(format!("orc-{i}"), format!("Orc {i}"), Side::Enemy, 10, 12).with_abilities(
            AbilityScores {
                strength: 14,
                dexterity: 9 + (i as i32 % 4),
                ..AbilityScores::default()
            },
        )
    });
    heroes.chain(monsters).collect()
}

/// An encounter with a recording listener attached
pub fn logged(dice: Dice) -> (Encounter, CombatLog) {
    let mut encounter = Encounter::with_dice(dice);
    let log = CombatLog::new();
    encounter.add_listener(log.listener());
    (encounter, log)
}
