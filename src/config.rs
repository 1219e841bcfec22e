//! Runtime settings.
//!
//! Loaded once in `main` from defaults, an optional TOML file and the
//! environment (after `.env` is read), then passed down by reference.

use crate::error::{Error, Result};
use crate::execution::DailyWindow;
use chrono::{FixedOffset, Offset, Utc};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

const DEFAULT_CONFIG_FILE: &str = "stockwatch.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub environment: String,

    pub api_host: String,
    pub api_port: u16,

    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: String,
    pub telegram_timeout_secs: u64,

    pub data_file_path: String,

    pub market_data_base_url: String,
    pub market_data_timeout_secs: u64,
    pub market_data_retry_attempts: u32,
    pub market_data_retry_delay_ms: u64,
    pub market_data_rate_limit_rpm: u32,

    pub log_level: String,
    /// Rolling log file; empty disables file logging
    pub log_file_path: String,
    /// minutely, hourly, daily or never
    pub log_rotation: String,
    /// Rotated files kept besides the current one
    pub log_backup_count: usize,

    /// Offset from UTC used for the daily update window (330 = IST)
    pub utc_offset_minutes: i32,
    pub daily_update_hour: u32,
    pub daily_update_minute: u32,
    pub daily_update_window_minutes: u32,

    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Stock Agent".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: "https://api.telegram.org".to_string(),
            telegram_timeout_secs: 10,
            data_file_path: "data/stocks.json".to_string(),
            market_data_base_url: "https://query1.finance.yahoo.com".to_string(),
            market_data_timeout_secs: 10,
            market_data_retry_attempts: 3,
            market_data_retry_delay_ms: 1000,
            market_data_rate_limit_rpm: 60,
            log_level: "info".to_string(),
            log_file_path: "logs/stockwatch.log".to_string(),
            log_rotation: "daily".to_string(),
            log_backup_count: 5,
            utc_offset_minutes: 330,
            daily_update_hour: 12,
            daily_update_minute: 0,
            daily_update_window_minutes: 5,
            poll_interval_secs: 300,
        }
    }
}

impl Settings {
    /// Load settings from `stockwatch.toml` (or `$STOCKWATCH_CONFIG`) and the environment.
    ///
    /// Environment variables win over the file; keys are matched
    /// case-insensitively, so `TELEGRAM_CHAT_ID` sets `telegram_chat_id`.
    pub fn load() -> Result<Self> {
        let path = std::env::var("STOCKWATCH_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::default())
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.daily_update_hour > 23 {
            return Err(Error::Config(format!(
                "daily_update_hour must be 0-23, got {}",
                self.daily_update_hour
            )));
        }
        if self.daily_update_minute > 59 {
            return Err(Error::Config(format!(
                "daily_update_minute must be 0-59, got {}",
                self.daily_update_minute
            )));
        }
        self.log_rotation()?;
        if FixedOffset::east_opt(self.utc_offset_minutes * 60).is_none() {
            return Err(Error::Config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Both bot token and chat id are present
    pub fn telegram_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.telegram_bot_token) && set(&self.telegram_chat_id)
    }

    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn daily_window(&self) -> DailyWindow {
        DailyWindow {
            hour: self.daily_update_hour,
            minute: self.daily_update_minute,
            window_minutes: self.daily_update_window_minutes,
        }
    }

    pub fn retry_attempts(&self) -> u32 {
        self.market_data_retry_attempts.max(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.market_data_retry_delay_ms)
    }

    pub fn telegram_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram_timeout_secs)
    }

    pub fn market_data_timeout(&self) -> Duration {
        Duration::from_secs(self.market_data_timeout_secs)
    }

    pub fn log_rotation(&self) -> Result<Rotation> {
        match self.log_rotation.to_lowercase().as_str() {
            "minutely" => Ok(Rotation::MINUTELY),
            "hourly" => Ok(Rotation::HOURLY),
            "daily" => Ok(Rotation::DAILY),
            "never" => Ok(Rotation::NEVER),
            other => Err(Error::Config(format!(
                "log_rotation must be minutely, hourly, daily or never, got {}",
                other
            ))),
        }
    }

    fn log_directory(&self) -> Option<PathBuf> {
        if self.log_file_path.trim().is_empty() {
            return None;
        }
        let dir = Path::new(&self.log_file_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Some(dir.to_path_buf())
    }

    /// Rolling appender for `log_file_path`, or `None` when file logging is off.
    ///
    /// `logs/stockwatch.log` rolls into `logs/stockwatch.<date>.log`.
    pub fn log_file_appender(&self) -> Result<Option<RollingFileAppender>> {
        let Some(dir) = self.log_directory() else {
            return Ok(None);
        };
        let path = Path::new(&self.log_file_path);
        let prefix = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stockwatch".to_string());

        std::fs::create_dir_all(&dir).map_err(|e| Error::storage("initialize", e))?;

        let mut builder = RollingFileAppender::builder()
            .rotation(self.log_rotation()?)
            .filename_prefix(prefix)
            .max_log_files(self.log_backup_count + 1);
        if let Some(ext) = path.extension() {
            builder = builder.filename_suffix(ext.to_string_lossy().into_owned());
        }

        builder
            .build(&dir)
            .map(Some)
            .map_err(|e| Error::Config(format!("Failed to open log file: {}", e)))
    }

    /// Create the directories holding the data file and the log file
    pub fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = Path::new(&self.data_file_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::storage("initialize", e))?;
            }
        }
        if let Some(dir) = self.log_directory() {
            std::fs::create_dir_all(dir).map_err(|e| Error::storage("initialize", e))?;
        }
        Ok(())
    }
}
