// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::load_config::{find_in_parent, resolve_config_path};
use crate::yaml::load_yaml_with_env;
use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};
use tracing::info;

pub const DEFAULT_CONFIG_NAME: &str = "cycle.config.yaml";
pub const ENV_PREFIX: &str = "CC_";

/// Scalar keys that may be overridden through `CC_` prefixed environment variables.
const ENV_KEYS: &[&str] = &[
    "submission_window_secs",
    "cycle_duration_secs",
    "default_reputation",
    "seed",
    "reveal_delay_ms",
    "db_file",
    "data_dir",
    "in_mem_store",
];

/// BFV parameters for the ciphertext handle service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct BfvConfig {
    pub degree: usize,
    pub plaintext_modulus: u64,
    pub moduli: Vec<u64>,
}

impl Default for BfvConfig {
    fn default() -> Self {
        Self {
            degree: 2048,
            plaintext_modulus: 1032193,
            moduli: vec![0x3FFFFFFF000001],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct CycleConfig {
    /// Seconds after round start during which submissions are accepted
    pub submission_window_secs: u64,
    /// Seconds after round start after which a new round may be started
    pub cycle_duration_secs: u64,
    /// Reputation assigned on (re)verification
    pub default_reputation: u32,
    /// Largest accepted submission value. Bounds how many submissions fit in a round before
    /// the encrypted totals reach the plaintext modulus.
    pub max_submission_value: u64,
    /// Identities allowed to run authority operations
    pub authorities: Vec<Address>,
    pub bfv: BfvConfig,
    /// Fixed rng seed. Only meant for tests and reproducible demos.
    pub seed: Option<u64>,
    /// Artificial latency of the reveal responder
    pub reveal_delay_ms: u64,
    /// Database location, relative paths resolve against `data_dir`
    pub db_file: PathBuf,
    /// Defaults to the OS local data dir
    pub data_dir: Option<PathBuf>,
    pub in_mem_store: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            submission_window_secs: 21_600,
            cycle_duration_secs: 86_400,
            default_reputation: 50,
            max_submission_value: 10_000,
            authorities: vec![],
            bfv: BfvConfig::default(),
            seed: None,
            reveal_delay_ms: 0,
            db_file: PathBuf::from("db"),
            data_dir: None,
            in_mem_store: false,
        }
    }
}

impl CycleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.submission_window_secs == 0 {
            bail!("submission_window_secs must be greater than zero");
        }
        if self.submission_window_secs >= self.cycle_duration_secs {
            bail!(
                "submission_window_secs ({}) must be shorter than cycle_duration_secs ({})",
                self.submission_window_secs,
                self.cycle_duration_secs
            );
        }
        if self.default_reputation > 100 {
            bail!(
                "default_reputation must be within 0..=100, got {}",
                self.default_reputation
            );
        }
        if self.authorities.is_empty() {
            bail!("at least one authority address must be configured");
        }
        if self.max_submission_value == 0
            || self.max_submission_value >= self.bfv.plaintext_modulus
        {
            bail!(
                "max_submission_value must be within 1..{}, got {}",
                self.bfv.plaintext_modulus,
                self.max_submission_value
            );
        }
        if self.bfv.moduli.is_empty() {
            bail!("bfv.moduli must not be empty");
        }
        Ok(())
    }

    pub fn submission_window(&self) -> Duration {
        Duration::from_secs(self.submission_window_secs)
    }

    pub fn cycle_duration(&self) -> Duration {
        Duration::from_secs(self.cycle_duration_secs)
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn use_in_mem_store(&self) -> bool {
        self.in_mem_store
    }

    /// Absolute location of the sled database.
    pub fn db_path(&self) -> PathBuf {
        if self.db_file.is_absolute() {
            return self.db_file.clone();
        }
        self.data_dir
            .clone()
            .unwrap_or_else(OsDirs::data_dir)
            .join(&self.db_file)
    }
}

pub struct OsDirs;

impl OsDirs {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cycle")
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cycle")
    }
}

/// Load configuration from defaults, the resolved yaml file and `CC_` environment variables,
/// in increasing order of precedence. An explicitly named file must exist.
pub fn load_config(config_file: Option<&str>) -> Result<CycleConfig> {
    let explicit = config_file.map(PathBuf::from);
    let path = resolve_config_path(
        find_in_parent,
        env::current_dir()?,
        OsDirs::config_dir(),
        DEFAULT_CONFIG_NAME,
        explicit.clone(),
    );

    let yaml = if explicit.is_some() || path.exists() {
        info!("Loading configuration from {:?}", path);
        load_yaml_with_env(&path).context("Configuration file not found")?
    } else {
        info!("No configuration file found, using defaults");
        String::new()
    };

    let config: CycleConfig = Figment::from(Serialized::defaults(CycleConfig::default()))
        .merge(Yaml::string(&yaml))
        .merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
        .extract()
        .context("Could not parse configuration")?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const AUTHORITY: &str = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0";

    #[test]
    fn yaml_deserialization() -> Result<()> {
        let config: CycleConfig = serde_yaml::from_str(
            r#"
submission_window_secs: 60
cycle_duration_secs: 120
authorities:
  - "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
bfv:
  degree: 4096
in_mem_store: true
"#,
        )?;

        assert_eq!(config.submission_window(), Duration::from_secs(60));
        assert_eq!(config.cycle_duration(), Duration::from_secs(120));
        assert_eq!(config.default_reputation, 50);
        assert_eq!(config.authorities, vec![AUTHORITY.parse::<Address>()?]);
        assert_eq!(config.bfv.degree, 4096);
        assert_eq!(config.bfv.plaintext_modulus, 1032193);
        assert!(config.use_in_mem_store());
        config.validate()?;
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = serde_yaml::from_str::<CycleConfig>("submission_windows: 10\n");
        assert!(res.is_err());
    }

    #[test]
    fn validation_rules() -> Result<()> {
        let valid = CycleConfig {
            authorities: vec![AUTHORITY.parse()?],
            ..CycleConfig::default()
        };
        valid.validate()?;

        assert!(CycleConfig::default().validate().is_err());
        assert!(CycleConfig {
            submission_window_secs: 0,
            ..valid.clone()
        }
        .validate()
        .is_err());
        assert!(CycleConfig {
            submission_window_secs: 86_400,
            ..valid.clone()
        }
        .validate()
        .is_err());
        assert!(CycleConfig {
            default_reputation: 101,
            ..valid.clone()
        }
        .validate()
        .is_err());
        assert!(CycleConfig {
            max_submission_value: valid.bfv.plaintext_modulus,
            ..valid.clone()
        }
        .validate()
        .is_err());
        Ok(())
    }

    #[test]
    fn db_path_resolution() {
        let config = CycleConfig {
            data_dir: Some(PathBuf::from("/var/lib/cycle")),
            ..CycleConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/cycle/db"));

        let config = CycleConfig {
            db_file: PathBuf::from("/tmp/cycle.db"),
            ..config
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/cycle.db"));
    }

    #[test]
    fn load_from_file_and_env() {
        Jail::expect_with(|jail| {
            jail.set_env("CYCLE_AUTHORITY", AUTHORITY);
            jail.set_env("CC_REVEAL_DELAY_MS", "250");
            jail.create_file(
                DEFAULT_CONFIG_NAME,
                r#"
submission_window_secs: 3600
cycle_duration_secs: 7200
reveal_delay_ms: 10
authorities:
  - "${CYCLE_AUTHORITY}"
"#,
            )?;

            let config = load_config(None).map_err(|e| e.to_string())?;

            assert_eq!(config.submission_window_secs, 3600);
            assert_eq!(config.cycle_duration_secs, 7200);
            assert_eq!(config.reveal_delay(), Duration::from_millis(250));
            assert_eq!(config.authorities.len(), 1);
            assert_eq!(config.bfv, BfvConfig::default());
            Ok(())
        });
    }

    #[test]
    fn invalid_file_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_NAME,
                r#"
submission_window_secs: 7200
cycle_duration_secs: 3600
authorities:
  - "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
"#,
            )?;

            assert!(load_config(None).is_err());
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_fails() -> Result<()> {
        let Err(err) = load_config(Some("/nope/cycle.config.yaml")) else {
            bail!("error expected");
        };
        let Some(e) = err.downcast_ref::<std::io::Error>() else {
            bail!("io error expected");
        };
        assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
        Ok(())
    }
}
