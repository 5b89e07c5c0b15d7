use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tally_finance::{CategoryTable, PaymentRules};

pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TallyConfig {
    /// Directory holding one subdirectory of CSV statements per bank
    pub data_root: PathBuf,
    /// Directory holding `<bank>_schema.json` descriptors
    pub config_dir: PathBuf,
    /// Category keyword table; the built-in vocabulary when unset
    pub category_mapping: Option<PathBuf>,
    /// Payment rule list; the built-in rules when unset
    pub payment_rules: Option<PathBuf>,
    /// Largest tolerated share of skipped rows per file
    pub max_error_rate: f64,
    pub filter_payments: bool,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            config_dir: PathBuf::from("configs"),
            category_mapping: None,
            payment_rules: None,
            max_error_rate: 0.05,
            filter_payments: true,
        }
    }
}

impl TallyConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_error_rate) {
            bail!(
                "max_error_rate must be between 0 and 1, got {}",
                self.max_error_rate
            );
        }
        Ok(())
    }

    pub fn category_table(&self) -> Result<CategoryTable> {
        match &self.category_mapping {
            Some(p) => CategoryTable::load(p).with_context(|| format!("load {}", p.display())),
            None => Ok(CategoryTable::default_table()),
        }
    }

    pub fn payment_rules(&self) -> Result<PaymentRules> {
        match &self.payment_rules {
            Some(p) => PaymentRules::load(p).with_context(|| format!("load {}", p.display())),
            None => Ok(PaymentRules::builtin()),
        }
    }
}

pub fn parse_config(s: &str) -> Result<TallyConfig> {
    let cfg: TallyConfig = toml::from_str(s).context("parse tally.toml")?;
    cfg.validate()?;
    Ok(cfg)
}

/// An explicit path must exist; the default `tally.toml` is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<TallyConfig> {
    let p = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !p.exists() {
                return Ok(TallyConfig::default());
            }
            p
        }
    };
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("in {}", p.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), TallyConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = parse_config("data_root = \"/srv/statements\"\nfilter_payments = false\n").unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/srv/statements"));
        assert!(!cfg.filter_payments);
        assert_eq!(cfg.config_dir, PathBuf::from("configs"));
        assert_eq!(cfg.max_error_rate, 0.05);
    }

    #[test]
    fn test_rejects_unknown_key_and_bad_rate() {
        assert!(parse_config("data_dir = \"x\"").is_err());
        assert!(parse_config("max_error_rate = 1.5").is_err());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "max_error_rate = 0.25").unwrap();
        let cfg = load_config(Some(f.path())).unwrap();
        assert_eq!(cfg.max_error_rate, 0.25);
    }

    #[test]
    fn test_rule_files_default_to_builtin() {
        let cfg = TallyConfig::default();
        assert!(!cfg.category_table().unwrap().is_empty());
        assert!(!cfg.payment_rules().unwrap().rules().is_empty());
    }
}
