use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub llm: Option<LlmConfig>,
    pub registry: Option<RegistryConfig>,
    pub store: Option<StoreConfig>,
    pub worker: Option<WorkerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub enabled: Option<bool>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: Option<String>,
    pub blob_path: Option<String>,
    pub max_upload_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub concurrency: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub analyze_timeout_secs: Option<u64>,
}

/// Platform config directory path: `<config_dir>/openavail/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("openavail").join("config.toml"))
}

/// Load config by cascading CWD `.openavail.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".openavail.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        llm: Some(LlmConfig {
            base_url: overlay
                .llm
                .as_ref()
                .and_then(|l| l.base_url.clone())
                .or_else(|| base.llm.as_ref().and_then(|l| l.base_url.clone())),
            model: overlay
                .llm
                .as_ref()
                .and_then(|l| l.model.clone())
                .or_else(|| base.llm.as_ref().and_then(|l| l.model.clone())),
            embedding_model: overlay
                .llm
                .as_ref()
                .and_then(|l| l.embedding_model.clone())
                .or_else(|| base.llm.as_ref().and_then(|l| l.embedding_model.clone())),
            api_key: overlay
                .llm
                .as_ref()
                .and_then(|l| l.api_key.clone())
                .or_else(|| base.llm.as_ref().and_then(|l| l.api_key.clone())),
        }),
        registry: Some(RegistryConfig {
            enabled: overlay
                .registry
                .as_ref()
                .and_then(|r| r.enabled)
                .or_else(|| base.registry.as_ref().and_then(|r| r.enabled)),
            timeout_secs: overlay
                .registry
                .as_ref()
                .and_then(|r| r.timeout_secs)
                .or_else(|| base.registry.as_ref().and_then(|r| r.timeout_secs)),
        }),
        store: Some(StoreConfig {
            db_path: overlay
                .store
                .as_ref()
                .and_then(|s| s.db_path.clone())
                .or_else(|| base.store.as_ref().and_then(|s| s.db_path.clone())),
            blob_path: overlay
                .store
                .as_ref()
                .and_then(|s| s.blob_path.clone())
                .or_else(|| base.store.as_ref().and_then(|s| s.blob_path.clone())),
            max_upload_mb: overlay
                .store
                .as_ref()
                .and_then(|s| s.max_upload_mb)
                .or_else(|| base.store.as_ref().and_then(|s| s.max_upload_mb)),
        }),
        worker: Some(WorkerConfig {
            concurrency: overlay
                .worker
                .as_ref()
                .and_then(|w| w.concurrency)
                .or_else(|| base.worker.as_ref().and_then(|w| w.concurrency)),
            poll_interval_ms: overlay
                .worker
                .as_ref()
                .and_then(|w| w.poll_interval_ms)
                .or_else(|| base.worker.as_ref().and_then(|w| w.poll_interval_ms)),
            analyze_timeout_secs: overlay
                .worker
                .as_ref()
                .and_then(|w| w.analyze_timeout_secs)
                .or_else(|| base.worker.as_ref().and_then(|w| w.analyze_timeout_secs)),
        }),
    }
}
