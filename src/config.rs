//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `GLORY_`-prefixed environment variables.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::combat::{StandardDamage, DEFAULT_FLEE_DC};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "GLORY_";

/// Rules engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dice seed; `None` seeds from the operating system
    pub seed: Option<u64>,
    /// Difficulty class for fleeing
    pub flee_dc: i32,
    /// Base damage policy
    pub damage: StandardDamage,
    /// Rounds before an automatic encounter is called off
    pub max_rounds: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            flee_dc: DEFAULT_FLEE_DC,
            damage: StandardDamage::WeaponDie,
            max_rounds: 100,
        }
    }
}

impl EngineConfig {
    /// The layered provider stack, for callers that merge their own layers
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::DiceRoll;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: EngineConfig = Figment::from(Serialized::defaults(EngineConfig::default()))
            .extract()
            .unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.flee_dc, 10);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
seed = 42
flee_dc = 14
damage = {{ dice = "2d4+1" }}
"#
        )
        .unwrap();

        let config: EngineConfig = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(file.path()))
            .extract()
            .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.flee_dc, 14);
        assert_eq!(config.damage, StandardDamage::Dice(DiceRoll::new(2, 4, 1)));
        assert_eq!(config.max_rounds, 100);
    }

    #[test]
    fn test_bad_damage_notation_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"damage = {{ dice = "2d1" }}"#).unwrap();

        let result: Result<EngineConfig, _> =
            Figment::from(Serialized::defaults(EngineConfig::default()))
                .merge(Toml::file(file.path()))
                .extract();
        assert!(result.is_err());
    }
}
