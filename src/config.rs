use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CLUSTER_NAME: &str = "e2e";
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 240;
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_DISK_IMAGE: &str = "data/persistence-disk.vmdk";
pub const DEFAULT_WORK_DIR: &str = "/tmp/untarova";

/// Overrides the location of the optional JSON config file.
pub const CONFIG_PATH_VAR: &str = "E2E_ENV_CONFIG";

pub const AGENT_IMAGE_VAR: &str = "MIGRATION_PLANNER_AGENT_IMAGE";
pub const API_IMAGE_VAR: &str = "MIGRATION_PLANNER_API_IMAGE";
pub const API_IMAGE_PULL_POLICY_VAR: &str = "MIGRATION_PLANNER_API_IMAGE_PULL_POLICY";
pub const INSECURE_REGISTRY_VAR: &str = "INSECURE_REGISTRY";
pub const REGISTRY_IP_VAR: &str = "REGISTRY_IP";

/// Settings every procedure reads, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub cluster_name: String,
    pub wait_timeout_secs: u64,
    pub namespace: String,
    pub disk_image: PathBuf,
    pub work_dir: PathBuf,
    pub agent_image: String,
    pub api_image: String,
    pub api_image_pull_policy: String,
    pub insecure_registry: String,
    pub registry_ip: String,
}

/// On-disk overrides. Every field is optional; environment variables win over
/// the image and registry settings found here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub cluster_name: Option<String>,
    pub wait_timeout_secs: Option<u64>,
    pub namespace: Option<String>,
    pub disk_image: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub agent_image: Option<String>,
    pub api_image: Option<String>,
    pub api_image_pull_policy: Option<String>,
    pub insecure_registry: Option<String>,
    pub registry_ip: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl Config {
    /// Path the disk image is converted into.
    pub fn converted_disk(&self) -> PathBuf {
        self.work_dir.join("persistence-disk.qcow2")
    }
}

/// Load the config file (if any) and layer the process environment over it.
pub fn load_config() -> anyhow::Result<Config> {
    let file = match config_file_path() {
        Some(path) => {
            debug!("reading configuration from {}", path.display());
            load_config_file(&path)?
        }
        None => ConfigFile::default(),
    };

    Ok(resolve(file, |key| std::env::var(key).ok())?)
}

pub fn load_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    let file: ConfigFile = serde_json::from_str(&data)
        .with_context(|| format!("parsing config file at {}", path.display()))?;
    Ok(file)
}

/// Merge defaults, file values and `lookup` (normally the process environment)
/// and validate the result. All missing settings are reported together.
pub fn resolve(
    file: ConfigFile,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut missing = Vec::new();
    let mut required = |var: &str, from_file: Option<String>| -> String {
        match non_empty(lookup(var)).or_else(|| non_empty(from_file)) {
            Some(value) => value,
            None => {
                missing.push(var.to_string());
                String::new()
            }
        }
    };

    let agent_image = required(AGENT_IMAGE_VAR, file.agent_image);
    let api_image = required(API_IMAGE_VAR, file.api_image);
    let api_image_pull_policy = required(API_IMAGE_PULL_POLICY_VAR, file.api_image_pull_policy);
    let insecure_registry = required(INSECURE_REGISTRY_VAR, file.insecure_registry);
    let registry_ip = required(REGISTRY_IP_VAR, file.registry_ip);

    if !missing.is_empty() {
        return Err(ConfigError::Missing(missing));
    }

    let cluster_name = file
        .cluster_name
        .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string());
    if cluster_name.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: "cluster_name",
            reason: "must not be empty".to_string(),
        });
    }

    let wait_timeout_secs = file.wait_timeout_secs.unwrap_or(DEFAULT_WAIT_TIMEOUT_SECS);
    if wait_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "wait_timeout_secs",
            reason: "must be greater than zero".to_string(),
        });
    }

    let namespace = file
        .namespace
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    if namespace.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: "namespace",
            reason: "must not be empty".to_string(),
        });
    }

    Ok(Config {
        cluster_name,
        wait_timeout_secs,
        namespace,
        disk_image: file
            .disk_image
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DISK_IMAGE)),
        work_dir: file
            .work_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
        agent_image,
        api_image,
        api_image_pull_policy,
        insecure_registry,
        registry_ip,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn config_file_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_PATH_VAR) {
        return Some(PathBuf::from(explicit));
    }

    let default = dirs::config_dir()?
        .join("migration-planner-e2e")
        .join("config.json");
    default.exists().then_some(default)
}
