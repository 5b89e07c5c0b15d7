//! Format descriptor store.
//!
//! One JSON file per bank, `<config_dir>/<bank>_schema.json`. Descriptors are
//! validated when loaded and never change afterwards, so a loaded store can be
//! shared freely.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tally_core::{ConfigError, FormatDescriptor};
use tracing::{debug, info, warn};

pub const SCHEMA_SUFFIX: &str = "_schema.json";

/// Path of the descriptor file for `bank`.
pub fn descriptor_path(config_dir: &Path, bank: &str) -> PathBuf {
    config_dir.join(format!("{bank}{SCHEMA_SUFFIX}"))
}

/// Load and validate the descriptor for one bank.
pub fn load(config_dir: &Path, bank: &str) -> Result<FormatDescriptor, ConfigError> {
    let path = descriptor_path(config_dir, bank);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                bank: bank.to_string(),
                path,
            });
        }
        Err(source) => {
            return Err(ConfigError::Io {
                bank: bank.to_string(),
                path,
                source,
            });
        }
    };
    parse_descriptor(bank, &text)
}

/// Parse descriptor JSON for `bank`. The file's `bank_name` must equal `bank`.
pub fn parse_descriptor(bank: &str, json: &str) -> Result<FormatDescriptor, ConfigError> {
    let descriptor: FormatDescriptor =
        serde_json::from_str(json).map_err(|e| ConfigError::Invalid {
            bank: bank.to_string(),
            reason: e.to_string(),
        })?;

    if descriptor.bank_name != bank {
        return Err(ConfigError::Invalid {
            bank: bank.to_string(),
            reason: format!(
                "bank_name '{}' does not match file name",
                descriptor.bank_name
            ),
        });
    }

    Ok(descriptor)
}

/// Banks and format names, for `tally schemas`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaInfo {
    pub bank: String,
    pub formats: Vec<String>,
}

/// Every bank's descriptor, loaded once.
#[derive(Debug, Default)]
pub struct DescriptorStore {
    config_dir: PathBuf,
    descriptors: BTreeMap<String, FormatDescriptor>,
    failures: BTreeMap<String, ConfigError>,
}

impl DescriptorStore {
    /// Load every `*_schema.json` in `config_dir`, plus an attempt for each of
    /// `banks` so that a bank with data but no descriptor records `NotFound`.
    pub fn load<'a>(config_dir: impl AsRef<Path>, banks: impl IntoIterator<Item = &'a str>) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        let mut names: Vec<String> = discover_banks(&config_dir);
        for bank in banks {
            if !names.iter().any(|n| n == bank) {
                names.push(bank.to_string());
            }
        }
        names.sort();

        let mut store = DescriptorStore {
            config_dir,
            ..Default::default()
        };
        for bank in names {
            match load(&store.config_dir, &bank) {
                Ok(descriptor) => {
                    info!(
                        "Loaded format descriptor for {} ({} formats)",
                        bank,
                        descriptor.variants.len()
                    );
                    store.descriptors.insert(bank, descriptor);
                }
                Err(e) => {
                    warn!("{e}");
                    store.failures.insert(bank, e);
                }
            }
        }
        store
    }

    /// Build a store from descriptors already in memory.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = FormatDescriptor>) -> Self {
        DescriptorStore {
            descriptors: descriptors
                .into_iter()
                .map(|d| (d.bank_name.clone(), d))
                .collect(),
            ..Default::default()
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// `None` when the bank was never attempted.
    pub fn get(&self, bank: &str) -> Option<Result<&FormatDescriptor, &ConfigError>> {
        if let Some(d) = self.descriptors.get(bank) {
            return Some(Ok(d));
        }
        self.failures.get(bank).map(Err)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &FormatDescriptor> {
        self.descriptors.values()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConfigError> {
        self.failures.values()
    }

    pub fn schema_info(&self) -> Vec<SchemaInfo> {
        self.descriptors
            .values()
            .map(|d| SchemaInfo {
                bank: d.bank_name.clone(),
                formats: d.variants.iter().map(|v| v.format_name.clone()).collect(),
            })
            .collect()
    }
}

fn discover_banks(config_dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(config_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list config dir {}: {}", config_dir.display(), e);
            return Vec::new();
        }
    };

    let mut banks: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let bank = name.strip_suffix(SCHEMA_SUFFIX)?;
            (!bank.is_empty()).then(|| bank.to_string())
        })
        .collect();
    banks.sort();
    debug!("Found descriptor files for {:?}", banks);
    banks
}
