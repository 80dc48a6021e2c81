//! Combat event listeners
//!
//! Listeners are invoked synchronously, on the caller's thread, in the order
//! they were registered. They must not block: they run inside the attack.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use super::combatant::Combatant;

/// Receives combat outcomes as they happen. Every method defaults to a no-op.
pub trait CombatListener: Send {
    fn on_attack_hit(
        &mut self,
        _attacker: &Combatant,
        _target: &Combatant,
        _damage: i32,
        _critical: bool,
    ) {
    }

    fn on_attack_miss(&mut self, _attacker: &Combatant, _target: &Combatant) {}

    fn on_combatant_defeated(&mut self, _combatant: &Combatant) {}

    fn on_combat_end(&mut self, _victory: bool) {}
}

/// Owned snapshot of a listener callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    AttackHit {
        attacker: String,
        target: String,
        damage: i32,
        critical: bool,
    },
    AttackMiss {
        attacker: String,
        target: String,
    },
    CombatantDefeated {
        combatant: String,
    },
    CombatEnd {
        victory: bool,
    },
}

/// Adapts a closure over [`CombatEvent`] into a listener
pub struct FnListener<F>(pub F);

impl<F> CombatListener for FnListener<F>
where
    F: FnMut(&CombatEvent) + Send,
{
    fn on_attack_hit(
        &mut self,
        attacker: &Combatant,
        target: &Combatant,
        damage: i32,
        critical: bool,
    ) {
        (self.0)(&CombatEvent::AttackHit {
            attacker: attacker.id.clone(),
            target: target.id.clone(),
            damage,
            critical,
        });
    }

    fn on_attack_miss(&mut self, attacker: &Combatant, target: &Combatant) {
        (self.0)(&CombatEvent::AttackMiss {
            attacker: attacker.id.clone(),
            target: target.id.clone(),
        });
    }

    fn on_combatant_defeated(&mut self, combatant: &Combatant) {
        (self.0)(&CombatEvent::CombatantDefeated {
            combatant: combatant.id.clone(),
        });
    }

    fn on_combat_end(&mut self, victory: bool) {
        (self.0)(&CombatEvent::CombatEnd { victory });
    }
}

/// Records every event; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct CombatLog {
    events: Arc<Mutex<Vec<CombatEvent>>>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that appends to this log
    pub fn listener(&self) -> FnListener<impl FnMut(&CombatEvent) + Send + 'static> {
        let events = Arc::clone(&self.events);
        FnListener(move |event: &CombatEvent| events.lock().push(event.clone()))
    }

    pub fn events(&self) -> Vec<CombatEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// How many defeat events name this combatant
    pub fn defeats_of(&self, id: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| {
                matches!(e, CombatEvent::CombatantDefeated { combatant } if combatant == id)
            })
            .count()
    }
}

/// Writes the combat log through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl CombatListener for TracingListener {
    fn on_attack_hit(
        &mut self,
        attacker: &Combatant,
        target: &Combatant,
        damage: i32,
        critical: bool,
    ) {
        info!(
            attacker = %attacker.name,
            target = %target.name,
            damage,
            critical,
            target_hp = target.hp(),
            "{} hits {} for {} damage{}",
            attacker.name,
            target.name,
            damage,
            if critical { " (critical)" } else { "" }
        );
    }

    fn on_attack_miss(&mut self, attacker: &Combatant, target: &Combatant) {
        info!(
            attacker = %attacker.name,
            target = %target.name,
            "{} misses {}",
            attacker.name,
            target.name
        );
    }

    fn on_combatant_defeated(&mut self, combatant: &Combatant) {
        info!(
            combatant = %combatant.name,
            side = %combatant.side,
            "{} is defeated",
            combatant.name
        );
    }

    fn on_combat_end(&mut self, victory: bool) {
        info!(victory, "combat over");
    }
}

/// Registered listeners, notified in registration order
#[derive(Default)]
pub struct Listeners {
    listeners: Vec<Box<dyn CombatListener>>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}

impl Listeners {
    pub fn add(&mut self, listener: impl CombatListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn attack_hit(
        &mut self,
        attacker: &Combatant,
        target: &Combatant,
        damage: i32,
        critical: bool,
    ) {
        for listener in &mut self.listeners {
            listener.on_attack_hit(attacker, target, damage, critical);
        }
    }

    pub fn attack_miss(&mut self, attacker: &Combatant, target: &Combatant) {
        for listener in &mut self.listeners {
            listener.on_attack_miss(attacker, target);
        }
    }

    pub fn combatant_defeated(&mut self, combatant: &Combatant) {
        for listener in &mut self.listeners {
            listener.on_combatant_defeated(combatant);
        }
    }

    pub fn combat_end(&mut self, victory: bool) {
        for listener in &mut self.listeners {
            listener.on_combat_end(victory);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::Side;

    #[test]
    fn test_listeners_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::default();
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            listeners.add(FnListener(move |_: &CombatEvent| order.lock().push(tag)));
        }

        listeners.combat_end(true);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_combat_log_records_events() {
        let log = CombatLog::new();
        let mut listeners = Listeners::default();
        listeners.add(log.listener());
        listeners.add(TracingListener);
        assert_eq!(listeners.len(), 2);

        let hero = Combatant::new("hero", "Hero", Side::Player, 10, 12);
        let rat = Combatant::new("rat", "Rat", Side::Enemy, 2, 8);

        listeners.attack_miss(&hero, &rat);
        listeners.attack_hit(&hero, &rat, 3, false);
        listeners.combatant_defeated(&rat);
        listeners.combat_end(true);

        assert_eq!(
            log.events(),
            vec![
                CombatEvent::AttackMiss {
                    attacker: "hero".into(),
                    target: "rat".into()
                },
                CombatEvent::AttackHit {
                    attacker: "hero".into(),
                    target: "rat".into(),
                    damage: 3,
                    critical: false
                },
                CombatEvent::CombatantDefeated {
                    combatant: "rat".into()
                },
                CombatEvent::CombatEnd { victory: true },
            ]
        );
        assert_eq!(log.defeats_of("rat"), 1);
        assert_eq!(log.defeats_of("hero"), 0);
    }

    #[test]
    fn test_default_methods_are_noops() {
        struct EndOnly(bool);
        impl CombatListener for EndOnly {
            fn on_combat_end(&mut self, victory: bool) {
                self.0 = victory;
            }
        }

        let hero = Combatant::new("hero", "Hero", Side::Player, 10, 12);
        let mut listener = EndOnly(false);
        listener.on_combatant_defeated(&hero);
        listener.on_combat_end(true);
        assert!(listener.0);
    }
}
