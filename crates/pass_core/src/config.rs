//! Pass configuration
//!
//! Client-side feature availability plus safety bounds. Loaded from JSON or
//! YAML, optionally through the `PASS_CONFIG_PATH` environment variable.
//!
//! ```yaml
//! features:
//!   card_packs: true
//!   powerups: false
//!   elite_points: true
//! repeatable_cycle_limit: 50
//! ```

use crate::error::{PassError, Result};
use crate::reward::{ChestItem, RewardKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{env, fs};

pub const PASS_CONFIG_PATH_ENV: &str = "PASS_CONFIG_PATH";

const MAX_REPEATABLE_CYCLE_LIMIT: u32 = 10_000;

fn default_true() -> bool {
    true
}

fn default_repeatable_cycle_limit() -> u32 {
    100
}

/// Which feature-gated reward kinds this client can currently grant.
///
/// Owned by whoever composes the ledger with its host and handed to the
/// parser explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGate {
    #[serde(default = "default_true")]
    pub card_packs: bool,
    #[serde(default = "default_true")]
    pub powerups: bool,
    #[serde(default = "default_true")]
    pub elite_points: bool,
}

impl Default for FeatureGate {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl FeatureGate {
    pub fn all_enabled() -> Self {
        Self { card_packs: true, powerups: true, elite_points: true }
    }

    pub fn all_disabled() -> Self {
        Self { card_packs: false, powerups: false, elite_points: false }
    }

    /// Whether a standalone reward of this kind may be granted
    pub fn admits(&self, kind: &RewardKind) -> bool {
        match kind {
            RewardKind::CardPack => self.card_packs,
            RewardKind::Powerup => self.powerups,
            RewardKind::ElitePoint => self.elite_points,
            _ => true,
        }
    }

    /// A chest is all-or-nothing: one unavailable sub-item drops the chest
    pub fn admits_chest(&self, items: &[ChestItem]) -> bool {
        items.iter().all(|item| self.admits(&item.kind))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassConfig {
    #[serde(default)]
    pub features: FeatureGate,

    /// Upper bound on repeat cycles, whatever the server advertises
    #[serde(default = "default_repeatable_cycle_limit")]
    pub repeatable_cycle_limit: u32,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self { features: FeatureGate::default(), repeatable_cycle_limit: default_repeatable_cycle_limit() }
    }
}

impl PassConfig {
    /// Load from a `.yaml`/`.yml` or JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: PassConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PassConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// `Ok(None)` when `PASS_CONFIG_PATH` is unset or blank
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(path) = env::var(PASS_CONFIG_PATH_ENV) else {
            return Ok(None);
        };

        let path = path.trim();
        if path.is_empty() {
            return Ok(None);
        }

        tracing::info!(path, "loading pass config from {PASS_CONFIG_PATH_ENV}");
        Self::load(path).map(Some)
    }

    pub fn validate(&self) -> Result<()> {
        if self.repeatable_cycle_limit == 0 || self.repeatable_cycle_limit > MAX_REPEATABLE_CYCLE_LIMIT {
            return Err(PassError::Config(format!(
                "repeatable_cycle_limit must be 1-{}, got {}",
                MAX_REPEATABLE_CYCLE_LIMIT, self.repeatable_cycle_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_gate_admits() {
        let gate = FeatureGate { card_packs: false, powerups: true, elite_points: true };
        assert!(!gate.admits(&RewardKind::CardPack));
        assert!(gate.admits(&RewardKind::Powerup));
        assert!(gate.admits(&RewardKind::BankBase));
        assert!(gate.admits(&RewardKind::Other("frame".into())));

        let chest = vec![
            ChestItem { kind: RewardKind::Currency, amount: 100 },
            ChestItem { kind: RewardKind::CardPack, amount: 1 },
        ];
        assert!(!gate.admits_chest(&chest));
        assert!(FeatureGate::all_enabled().admits_chest(&chest));
        assert!(FeatureGate::all_disabled().admits_chest(&[]));
    }

    #[test]
    fn test_yaml_defaults() {
        let config = PassConfig::from_yaml("features:\n  powerups: false\n").unwrap();
        assert!(config.features.card_packs);
        assert!(!config.features.powerups);
        assert_eq!(config.repeatable_cycle_limit, 100);
    }

    #[test]
    fn test_validation_rejects_zero_limit() {
        let err = PassConfig::from_json(r#"{"repeatable_cycle_limit": 0}"#).unwrap_err();
        assert!(matches!(err, PassError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "repeatable_cycle_limit: 7").unwrap();
        let config = PassConfig::load(file.path()).unwrap();
        assert_eq!(config.repeatable_cycle_limit, 7);
        assert_eq!(config.features, FeatureGate::all_enabled());

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, r#"{{"features": {{"elite_points": false}}}}"#).unwrap();
        let config = PassConfig::load(json.path()).unwrap();
        assert!(!config.features.elite_points);
    }

    // Only test that touches PASS_CONFIG_PATH, so it cannot race itself
    #[test]
    fn test_from_env() {
        env::remove_var(PASS_CONFIG_PATH_ENV);
        assert_eq!(PassConfig::from_env().unwrap(), None);

        env::set_var(PASS_CONFIG_PATH_ENV, "   ");
        assert_eq!(PassConfig::from_env().unwrap(), None);

        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "features:\n  card_packs: false\nrepeatable_cycle_limit: 12").unwrap();
        env::set_var(PASS_CONFIG_PATH_ENV, file.path());
        let config = PassConfig::from_env().unwrap().unwrap();
        assert!(!config.features.card_packs);
        assert_eq!(config.repeatable_cycle_limit, 12);

        let mut invalid = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(invalid, r#"{{"repeatable_cycle_limit": 20000}}"#).unwrap();
        env::set_var(PASS_CONFIG_PATH_ENV, invalid.path());
        assert!(matches!(PassConfig::from_env(), Err(PassError::Config(_))));

        env::remove_var(PASS_CONFIG_PATH_ENV);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PassConfig::load("/nonexistent/pass.yaml").unwrap_err();
        assert!(matches!(err, PassError::Io(_)));
    }
}
