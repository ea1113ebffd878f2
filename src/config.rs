//! Configuration management for the wheel_ffb runtime.
//!
//! Handles loading, parsing, and validation of the YAML file that sets force
//! gains, startup timing, input smoothing, the force model and the provider.

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    drivers::logitech::layout::ButtonLayout, force_feedback::ForceFeedbackSettings,
    manager::ManagerSettings,
};

/// Main configuration structure.
///
/// # Example
///
/// ```yaml
/// version: 1
/// tick_hz: 60
/// ffb_gain: 1.0
///
/// timing:
///   ffb_settle_ms: 500
///   spring_init_delay_ms: 1000
///   spring_max_attempts: 150
///
/// smoothing:
///   throttle_factor: 0.9
///
/// force_feedback:
///   weight_intensity: 1.0
///   tire_width: 0.1
///   damper_amount: 3000
///
/// provider:
///   kind: logitech
///   buttons:
///     horn: [0, 1, 2, 3, 7, 11, 23]
///     high_beams: [6, 10]
///     left_indicator: [5]
///     right_indicator: [4]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    /// Manager ticks per second.
    #[serde(default = "defaults::tick_hz")]
    pub tick_hz: u16,

    /// Global force-feedback gain.
    #[serde(default = "defaults::ffb_gain")]
    pub ffb_gain: f32,

    #[serde(default)]
    pub timing: TimingCfg,

    #[serde(default)]
    pub smoothing: SmoothingCfg,

    #[serde(default)]
    pub force_feedback: ForceFeedbackSettings,

    #[serde(default)]
    pub provider: ProviderCfg,
}

/// Delays and retry budgets of the startup sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingCfg {
    #[serde(default = "defaults::ffb_settle_ms")]
    pub ffb_settle_ms: u64,

    #[serde(default = "defaults::spring_init_delay_ms")]
    pub spring_init_delay_ms: u64,

    #[serde(default = "defaults::spring_restart_stop_delay_ms")]
    pub spring_restart_stop_delay_ms: u64,

    #[serde(default = "defaults::spring_restart_start_delay_ms")]
    pub spring_restart_start_delay_ms: u64,

    #[serde(default = "defaults::spring_max_attempts")]
    pub spring_max_attempts: u32,

    #[serde(default = "defaults::session_wait_timeout_ms")]
    pub session_wait_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingCfg {
    /// Weight of the previous throttle value in `[0, 1)`.
    #[serde(default = "defaults::throttle_factor")]
    pub throttle_factor: f32,
}

/// Steering wheel provider to install at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProviderCfg {
    /// No vendor; every query reports "no device".
    #[serde(rename = "none")]
    Null,

    /// Logitech steering wheel SDK.
    Logitech {
        /// Path of the vendor wrapper library; platform file name when unset.
        #[serde(default)]
        library: Option<PathBuf>,

        /// Raw button table; the G-series layout when unset.
        #[serde(default)]
        buttons: Option<ButtonLayout>,
    },
}

impl Default for ProviderCfg {
    fn default() -> Self {
        ProviderCfg::Logitech {
            library: None,
            buttons: None,
        }
    }
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            ffb_settle_ms: defaults::ffb_settle_ms(),
            spring_init_delay_ms: defaults::spring_init_delay_ms(),
            spring_restart_stop_delay_ms: defaults::spring_restart_stop_delay_ms(),
            spring_restart_start_delay_ms: defaults::spring_restart_start_delay_ms(),
            spring_max_attempts: defaults::spring_max_attempts(),
            session_wait_timeout_ms: defaults::session_wait_timeout_ms(),
        }
    }
}

impl Default for SmoothingCfg {
    fn default() -> Self {
        Self {
            throttle_factor: defaults::throttle_factor(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            tick_hz: defaults::tick_hz(),
            ffb_gain: defaults::ffb_gain(),
            timing: TimingCfg::default(),
            smoothing: SmoothingCfg::default(),
            force_feedback: ForceFeedbackSettings::default(),
            provider: ProviderCfg::default(),
        }
    }
}

impl Config {
    /// Validates the configuration for consistency.
    ///
    /// # Example
    ///
    /// ```
    /// use wheel_ffb::config::Config;
    ///
    /// let config = Config::default();
    /// config.validate()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            anyhow::bail!("Unsupported config version {}", self.version);
        }
        if self.tick_hz == 0 {
            anyhow::bail!("tick_hz must be greater than zero");
        }
        if !self.ffb_gain.is_finite() || self.ffb_gain < 0.0 {
            anyhow::bail!("ffb_gain must be a non-negative number, got {}", self.ffb_gain);
        }
        if !(0.0..1.0).contains(&self.smoothing.throttle_factor) {
            anyhow::bail!(
                "smoothing.throttle_factor must be in [0, 1), got {}",
                self.smoothing.throttle_factor
            );
        }
        if self.timing.spring_max_attempts == 0 {
            anyhow::bail!("timing.spring_max_attempts must be greater than zero");
        }

        let ffb = &self.force_feedback;
        if !ffb.tire_width.is_finite() || ffb.tire_width < 0.0 {
            anyhow::bail!("force_feedback.tire_width must be non-negative, got {}", ffb.tire_width);
        }
        if !ffb.weight_intensity.is_finite() {
            anyhow::bail!("force_feedback.weight_intensity must be finite");
        }

        if let ProviderCfg::Logitech {
            buttons: Some(layout),
            ..
        } = &self.provider
        {
            layout
                .validate()
                .context("Invalid provider.buttons layout")?;
        }

        Ok(())
    }

    /// Period between manager ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    /// Manager tunables described by this configuration.
    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            ffb_gain: self.ffb_gain,
            ffb_settle_delay: Duration::from_millis(self.timing.ffb_settle_ms),
            spring_init_delay: Duration::from_millis(self.timing.spring_init_delay_ms),
            spring_restart_stop_delay: Duration::from_millis(
                self.timing.spring_restart_stop_delay_ms,
            ),
            spring_restart_start_delay: Duration::from_millis(
                self.timing.spring_restart_start_delay_ms,
            ),
            spring_max_attempts: self.timing.spring_max_attempts,
            throttle_smoothing: self.smoothing.throttle_factor,
            session_wait_timeout: Duration::from_millis(self.timing.session_wait_timeout_ms),
            ..ManagerSettings::default()
        }
    }
}

mod defaults {
    pub fn tick_hz() -> u16 {
        60
    }

    pub fn ffb_gain() -> f32 {
        1.0
    }

    pub fn ffb_settle_ms() -> u64 {
        500
    }

    pub fn spring_init_delay_ms() -> u64 {
        1000
    }

    pub fn spring_restart_stop_delay_ms() -> u64 {
        1000
    }

    pub fn spring_restart_start_delay_ms() -> u64 {
        500
    }

    pub fn spring_max_attempts() -> u32 {
        150
    }

    pub fn session_wait_timeout_ms() -> u64 {
        30_000
    }

    pub fn throttle_factor() -> f32 {
        0.9
    }
}

fn user_config_path() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
        .map(|dir| dir.join("wheel_ffb/config.yml"))
}

fn locate_config() -> Result<PathBuf> {
    // 2) ENV
    if let Ok(env_path) = env::var("WHEEL_FFB_CONFIG") {
        return Ok(PathBuf::from(env_path));
    }

    // 3) XDG_CONFIG_HOME or $HOME/.config
    if let Some(path) = user_config_path() {
        if path.exists() {
            return Ok(path);
        }
    }

    // 4) /etc
    let etc = Path::new("/etc/wheel_ffb/config.yml");
    if etc.exists() {
        return Ok(etc.to_path_buf());
    }

    anyhow::bail!("Configuration file not found in any standard location")
}

/// Configuration manager that handles both config data and file operations.
///
/// # Example
///
/// ```no_run
/// use wheel_ffb::config::ConfigManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// // Load from specific path
/// let config_manager = ConfigManager::load(Some(PathBuf::from("config.yml"))).await?;
///
/// // Fall back to defaults when no file exists
/// let config_manager = ConfigManager::load_or_default(None).await?;
///
/// let gain = config_manager.clone_config().await.ffb_gain;
/// config_manager.reload().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            path,
        }
    }

    /// Loads configuration from file or standard locations.
    ///
    /// Searches for configuration in the following order:
    /// 1. Provided path parameter
    /// 2. WHEEL_FFB_CONFIG environment variable
    /// 3. XDG_CONFIG_HOME/wheel_ffb/config.yml or ~/.config/wheel_ffb/config.yml
    /// 4. /etc/wheel_ffb/config.yml
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => locate_config().context("No configuration file found")?,
        };

        info!("Loading config from: {}", config_path.display());
        let config = Self::load_config_from_path(&config_path).await?;

        Ok(Self::new(config, config_path))
    }

    /// Like [`load`](Self::load), but uses defaults when no file is found.
    ///
    /// An explicit `path` must exist. The default configuration is bound to the
    /// user config location so a later [`save`](Self::save) creates it there.
    pub async fn load_or_default(path: Option<PathBuf>) -> Result<Self> {
        if path.is_some() {
            return Self::load(path).await;
        }
        match locate_config() {
            Ok(found) => Self::load(Some(found)).await,
            Err(_) => {
                let path = user_config_path()
                    .unwrap_or_else(|| PathBuf::from("wheel_ffb.yml"));
                info!("No configuration file found, using defaults");
                Ok(Self::new(Config::default(), path))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reloads configuration from the same file.
    pub async fn reload(&self) -> Result<()> {
        info!("Reloading config from: {}", self.path.display());
        let new_config = Self::load_config_from_path(&self.path).await?;

        *self.config.write().await = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Saves the current configuration to file.
    pub async fn save(&self) -> Result<()> {
        let config = self.config.read().await;
        Self::save_to_path(&config, &self.path)
    }

    /// Writes `config` to `path` through a temporary file and a rename.
    fn save_to_path(config: &Config, path: &Path) -> Result<()> {
        let config_yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("yml.tmp");
        fs::write(&tmp_path, config_yaml).with_context(|| {
            format!("Failed to write temporary config to {}", tmp_path.display())
        })?;

        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move config to {}", path.display()))?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Clones the current configuration.
    pub async fn clone_config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Replaces the configuration after validating it.
    pub async fn update_config(&self, new_config: Config) -> Result<()> {
        new_config
            .validate()
            .context("New configuration is invalid")?;
        *self.config.write().await = new_config;
        info!("Configuration updated in memory");
        Ok(())
    }

    async fn load_config_from_path(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }
}
