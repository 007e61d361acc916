use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Prefixes used to scrape the host's status lines.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusConfig {
    pub area_prefix: String,
    pub hazard_prefix: String,
    pub consumable_prefix: String,
    /// Timer text the host shows once the consumable has run out.
    pub depleted_sentinel: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            area_prefix: "Area:".to_string(),
            hazard_prefix: "Alive:".to_string(),
            consumable_prefix: "Repellent:".to_string(),
            depleted_sentinel: "None".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub zone_name: String,
    pub status: StatusConfig,
    pub consumable_item: String,
    pub min_hazard_count: u32,
    pub hazard_alarm_cooldown_ms: u64,
    pub inventory_stall_ms: u64,
    pub orientation_tolerance_deg: f32,
    pub arrival_tolerance: f64,
    pub reapply_interval_ms: u64,
    pub watch_interval_ms: u64,
    pub zone_warp_command: String,
    pub hub_warp_command: String,
    pub alarm_sound: String,
    pub hazard_sound: String,
    pub alarm_repeats: u32,
    pub evacuate_on_failure: bool,
    pub disconnect_after_evacuation: bool,
    pub routes_path: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            zone_name: "Garden".to_string(),
            status: StatusConfig::default(),
            consumable_item: "Pest Repellent".to_string(),
            min_hazard_count: 4,
            hazard_alarm_cooldown_ms: 30_000,
            inventory_stall_ms: 3_000,
            orientation_tolerance_deg: 1.0,
            arrival_tolerance: 0.5,
            reapply_interval_ms: 60_000,
            watch_interval_ms: 1_000,
            zone_warp_command: "warp garden".to_string(),
            hub_warp_command: "warp hub".to_string(),
            alarm_sound: "levelUp.ogg".to_string(),
            hazard_sound: "softAlert.ogg".to_string(),
            alarm_repeats: 5,
            evacuate_on_failure: false,
            disconnect_after_evacuation: true,
            routes_path: PathBuf::from("routes.json"),
        }
    }
}

impl BotConfig {
    /// Loads `relative_path` through [`ConfigLoader`], falling back to defaults
    /// when no file exists. A file that exists but fails to parse is an error.
    pub fn load(relative_path: &str) -> anyhow::Result<Self> {
        match ConfigLoader::resolve_path(relative_path) {
            Some(path) => {
                info!("config.load path={}", path.display());
                ConfigLoader::parse_from_path(&path)
            }
            None => {
                info!("config.defaults file={relative_path} not found");
                Ok(Self::default())
            }
        }
    }
}

/// TOML config lookup.
///
/// Search order:
/// 1) `FARMBOT_CONFIG_DIR/<relative_path>`
/// 2) `./<relative_path>`
/// 3) `<repo_root>/config/<relative_path>`
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn parse_from_file<T: DeserializeOwned>(relative_path: &str) -> anyhow::Result<T> {
        let path = Self::resolve_path(relative_path)
            .ok_or_else(|| anyhow::anyhow!("Config file not found for {relative_path:?}"))?;
        Self::parse_from_path(&path)
    }

    pub fn parse_from_path<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::parse_from_str(&text)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn parse_from_str<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
        toml::from_str(text).context("Failed to parse TOML")
    }

    pub fn resolve_path(relative_path: &str) -> Option<PathBuf> {
        let rel = Path::new(relative_path);

        if let Some(root) = env::var_os("FARMBOT_CONFIG_DIR") {
            let candidate = PathBuf::from(root).join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if let Ok(cwd) = env::current_dir() {
            let candidate = cwd.join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        // This crate lives at <repo_root>/crates/bot-core.
        let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .ancestors()
            .nth(2)?
            .join("config")
            .join(rel);
        if candidate.is_file() {
            return Some(candidate);
        }

        debug!("config.not_found file={relative_path}");
        None
    }
}
