use crate::domain::models::DeviceAddress;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "paddle_gateway".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// How paddles get bound to the LEFT/RIGHT roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BindingStrategy {
    /// Both addresses are known up front; the gateway only listens to filtered
    /// advertisements and never connects.
    Passive {
        left_address: DeviceAddress,
        right_address: DeviceAddress,
    },
    /// Scan, then connect to the first two discovered paddles in order:
    /// first becomes LEFT, second becomes RIGHT. Each paddle gets its role
    /// written to the role-config characteristic.
    DiscoveryOrder,
}

/// Gateway configuration, fixed for the worker's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Timeout of the first scan attempt, in seconds.
    #[serde(default = "default_scan_timeout_base")]
    pub scan_timeout_base_secs: u64,
    /// Added to the timeout on every further attempt, in seconds.
    #[serde(default = "default_scan_timeout_step")]
    pub scan_timeout_step_secs: u64,
    /// Scan attempts before giving up. Values below 1 are treated as 1.
    #[serde(default = "default_max_scan_attempts")]
    pub max_scan_attempts: u32,
    /// Service UUID advertised by the paddles.
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,
    #[serde(default = "default_strategy")]
    pub strategy: BindingStrategy,
    /// With the connection strategy: whether both roles must bind before the
    /// gateway reports ready. `false` means one healthy paddle is enough.
    #[serde(default = "default_false")]
    pub require_all_roles: bool,
    /// How long `stop()` waits for the worker before detaching, in seconds.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            scan_timeout_base_secs: default_scan_timeout_base(),
            scan_timeout_step_secs: default_scan_timeout_step(),
            max_scan_attempts: default_max_scan_attempts(),
            service_uuid: default_service_uuid(),
            strategy: default_strategy(),
            require_all_roles: false,
            stop_timeout_secs: default_stop_timeout(),
        }
    }
}

impl GatewayConfig {
    pub fn max_attempts(&self) -> u32 {
        self.max_scan_attempts.max(1)
    }

    /// Timeout for a 1-indexed scan attempt: base + step * (attempt - 1).
    pub fn scan_timeout(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        Duration::from_secs(
            self.scan_timeout_base_secs + self.scan_timeout_step_secs * u64::from(attempt - 1),
        )
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

fn default_scan_timeout_base() -> u64 {
    2
}
fn default_scan_timeout_step() -> u64 {
    2
}
fn default_max_scan_attempts() -> u32 {
    6
}
fn default_service_uuid() -> String {
    "ef680400-9b35-4933-9b10-52ffa9740042".to_string()
}
fn default_strategy() -> BindingStrategy {
    BindingStrategy::Passive {
        left_address: DeviceAddress::new(default_left_address()),
        right_address: DeviceAddress::new(default_right_address()),
    }
}
fn default_left_address() -> String {
    "C6:43:EA:BC:7A:D4".to_string()
}
fn default_right_address() -> String {
    "D2:81:05:1F:99:3B".to_string()
}
fn default_stop_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub log_settings: LogSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::default_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Use an explicit settings file instead of the platform config directory.
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn default_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("PaddleGateway");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
