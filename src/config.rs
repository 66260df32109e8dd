use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub probes: ProbesConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbesConfig {
    pub fonts: FontsProbeConfig,
    pub clipboard: ClipboardProbeConfig,
    pub synthesizer: SynthesizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontsProbeConfig {
    pub enabled: bool,
    pub delay_ms: u64,
}

impl FontsProbeConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardProbeConfig {
    pub enabled: bool,
    pub delay_ms: u64,
}

impl ClipboardProbeConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Synthetic clipboard activity for the headless environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl SynthesizerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub logs_dir: String,
}

impl AppConfig {
    pub fn load(path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        let config_path = if let Some(p) = path {
            p.clone()
        } else {
            std::env::var("PROBEGUARD_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/default.yaml"))
        };

        info!("Loading configuration from: {:?}", config_path);

        let config = Config::builder()
            .add_source(File::from(config_path))
            .add_source(Environment::with_prefix("PROBEGUARD").separator("_"))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;

        debug!("Configuration loaded successfully");
        debug!("Environment: {}", app_config.app.environment);
        debug!("Log level: {}", app_config.app.log_level);

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.probes.fonts.enabled && !self.probes.clipboard.enabled {
            errors.push("At least one probe must be enabled".to_string());
        }

        if self.probes.synthesizer.enabled && self.probes.synthesizer.interval_ms == 0 {
            errors.push("Synthesizer interval must be greater than 0".to_string());
        }

        if self.storage.logs_dir.is_empty() {
            errors.push("Logs directory cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "ProbeGuard".to_string(),
                environment: "development".to_string(),
                log_level: "debug".to_string(),
            },
            probes: ProbesConfig {
                fonts: FontsProbeConfig {
                    enabled: true,
                    delay_ms: 1000,
                },
                clipboard: ClipboardProbeConfig {
                    enabled: true,
                    delay_ms: 2000,
                },
                synthesizer: SynthesizerConfig {
                    enabled: true,
                    interval_ms: 3000,
                },
            },
            storage: StorageConfig {
                logs_dir: dirs::data_local_dir()
                    .map(|dir| dir.join("probe-guard/logs"))
                    .unwrap_or_else(|| PathBuf::from("logs"))
                    .to_string_lossy()
                    .to_string(),
            },
        }
    }
}
