mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::OutreachError;
use defaults::*;

/// Top-level Outreach configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub outreach: OutreachConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Messaging transport (browser-automation bridge) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_transport_base_url")]
    pub base_url: String,
    /// Country code assumed for numbers written without one (e.g. "966").
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    #[serde(default = "default_transport_timeout")]
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: default_transport_base_url(),
            default_country_code: default_country_code(),
            timeout_secs: default_transport_timeout(),
        }
    }
}

/// Reply generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    #[serde(default = "default_responder_provider")]
    pub provider: String,
    /// Empty = read `OPENAI_API_KEY` at load time.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Empty = read `OPENAI_MODEL` at load time, else the default model.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_responder_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Optional file whose content replaces `system_prompt`.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
    /// Sent instead of a generated reply when the responder fails.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            provider: default_responder_provider(),
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_responder_timeout(),
            system_prompt: default_system_prompt(),
            system_prompt_file: None,
            fallback_reply: default_fallback_reply(),
        }
    }
}

impl ResponderConfig {
    /// Effective system prompt: the prompt file when readable, else the inline prompt.
    pub fn resolve_system_prompt(&self) -> String {
        if let Some(ref file) = self.system_prompt_file {
            let path = shellexpand(file);
            match std::fs::read_to_string(&path) {
                Ok(content) if !content.trim().is_empty() => return content.trim().to_string(),
                Ok(_) => warn!("system prompt file {path} is empty, using inline prompt"),
                Err(e) => warn!("failed to read system prompt file {path}: {e}"),
            }
        }
        self.system_prompt.clone()
    }
}

/// Monitoring scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// How often a suspended loop rechecks the bulk-send gate.
    #[serde(default = "default_gate_recheck_ms")]
    pub gate_recheck_ms: u64,
    /// How long `stop` waits for the loop to exit.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
    /// Maximum turns kept per conversation.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Most recent turns sent to the responder as context.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
    /// Seen message IDs retained per contact.
    #[serde(default = "default_ledger_cap")]
    pub ledger_cap: usize,
    /// Contacts added to monitoring at start-up.
    #[serde(default)]
    pub contacts: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            gate_recheck_ms: default_gate_recheck_ms(),
            stop_timeout_secs: default_stop_timeout(),
            history_cap: default_history_cap(),
            context_turns: default_context_turns(),
            ledger_cap: default_ledger_cap(),
            contacts: Vec::new(),
        }
    }
}

/// Bulk-send pacing and quota.
///
/// Between two sends the run waits `min_delay_secs..=max_delay_secs`. After
/// every `short_break_every` sends that wait is replaced by a short break,
/// after every `long_break_every` sends by a long one, and with probability
/// `random_pause_chance` an extra pause follows. An `*_every` of 0 disables
/// that break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Maximum successful sends per calendar day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_min_delay")]
    pub min_delay_secs: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
    #[serde(default = "default_short_break_every")]
    pub short_break_every: usize,
    #[serde(default = "default_short_break_min")]
    pub short_break_min_secs: u64,
    #[serde(default = "default_short_break_max")]
    pub short_break_max_secs: u64,
    #[serde(default = "default_long_break_every")]
    pub long_break_every: usize,
    #[serde(default = "default_long_break_min")]
    pub long_break_min_secs: u64,
    #[serde(default = "default_long_break_max")]
    pub long_break_max_secs: u64,
    #[serde(default = "default_random_pause_chance")]
    pub random_pause_chance: f64,
    #[serde(default = "default_random_pause_min")]
    pub random_pause_min_secs: u64,
    #[serde(default = "default_random_pause_max")]
    pub random_pause_max_secs: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
            short_break_every: default_short_break_every(),
            short_break_min_secs: default_short_break_min(),
            short_break_max_secs: default_short_break_max(),
            long_break_every: default_long_break_every(),
            long_break_min_secs: default_long_break_min(),
            long_break_max_secs: default_long_break_max(),
            random_pause_chance: default_random_pause_chance(),
            random_pause_min_secs: default_random_pause_min(),
            random_pause_max_secs: default_random_pause_max(),
        }
    }
}

/// Lead store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Optional contacts directory used for lead enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// CSV with `phone`, `name`, and `city` columns.
    #[serde(default)]
    pub contacts_csv: Option<String>,
}

/// Control API served by `start` so a running scheduler can be steered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Bearer token. Empty = no auth (for local-only use).
    #[serde(default)]
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_api_host(),
            port: default_api_port(),
            api_key: String::new(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Fill settings left empty in the file from the environment.
fn apply_env_fallbacks(config: &mut Config) {
    if config.responder.api_key.is_empty() {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.responder.api_key = key;
        }
    }
    if config.responder.model.is_empty() {
        config.responder.model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| default_openai_model());
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, OutreachError> {
    let path = Path::new(path);
    let mut config = if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OutreachError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| OutreachError::Config(format!("failed to parse config: {}", e)))?
    };

    apply_env_fallbacks(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Reject settings the scheduler cannot run with.
fn validate(config: &Config) -> Result<(), OutreachError> {
    if config.monitor.poll_interval_secs == 0 {
        return Err(OutreachError::Config(
            "monitor.poll_interval_secs must be at least 1".into(),
        ));
    }
    if config.monitor.gate_recheck_ms == 0 {
        return Err(OutreachError::Config(
            "monitor.gate_recheck_ms must be at least 1".into(),
        ));
    }
    if config.monitor.history_cap == 0 || config.monitor.ledger_cap == 0 {
        return Err(OutreachError::Config(
            "monitor.history_cap and monitor.ledger_cap must be positive".into(),
        ));
    }
    let bulk = &config.bulk;
    for (lo, hi, min, max) in [
        ("min_delay_secs", "max_delay_secs", bulk.min_delay_secs, bulk.max_delay_secs),
        (
            "short_break_min_secs",
            "short_break_max_secs",
            bulk.short_break_min_secs,
            bulk.short_break_max_secs,
        ),
        (
            "long_break_min_secs",
            "long_break_max_secs",
            bulk.long_break_min_secs,
            bulk.long_break_max_secs,
        ),
        (
            "random_pause_min_secs",
            "random_pause_max_secs",
            bulk.random_pause_min_secs,
            bulk.random_pause_max_secs,
        ),
    ] {
        if min > max {
            return Err(OutreachError::Config(format!(
                "bulk.{lo} ({min}) exceeds bulk.{hi} ({max})"
            )));
        }
    }
    if !(0.0..=1.0).contains(&bulk.random_pause_chance) {
        return Err(OutreachError::Config(format!(
            "bulk.random_pause_chance must be between 0 and 1, got {}",
            bulk.random_pause_chance
        )));
    }
    Ok(())
}
