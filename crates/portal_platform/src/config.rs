//! # Runtime Configuration
//!
//! Loaded once at start-up from TOML. Every key is optional:
//!
//! ```toml
//! [platform]
//! threads = true
//! async_suspend = true
//! browser = "firefox"
//! os = "linux"
//! device_pixel_ratio = 2.0
//! canvas_width = 1280
//! canvas_height = 720
//! allow_canvas_resize = false
//! # min_sleep_ms = 4        # skip timer calibration
//! window_hidden = false
//!
//! [channel]
//! command_capacity = 64
//! reply_capacity = 64
//! max_message_len = 65536
//!
//! [pacing]
//! refresh_hz = 60
//! initial_interval = 1
//! fixed_period_ms = 0
//! ```

use std::path::Path;

use portal_core::ChannelLimits;
use portal_shared::{
    Browser, HostOs, DEFAULT_COMMAND_CAPACITY, DEFAULT_FIXED_PERIOD_MS, DEFAULT_MAX_MESSAGE_LEN,
    DEFAULT_REFRESH_HZ, DEFAULT_REPLY_CAPACITY, MAX_REFRESH_HZ,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlatformError, PlatformResult};

/// Full runtime configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalConfig {
    /// Host capabilities and initial page state.
    pub platform: PlatformSection,
    /// Command channel bounds.
    pub channel: ChannelSection,
    /// Main-loop cadence.
    pub pacing: PacingSection,
}

/// `[platform]`: what the embedding page reported about itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformSection {
    /// A real application thread is available.
    pub threads: bool,
    /// Blocking waits can park instead of polling.
    pub async_suspend: bool,
    /// Browser family.
    pub browser: Browser,
    /// Host operating system.
    pub os: HostOs,
    /// Physical pixels per CSS pixel.
    pub device_pixel_ratio: f64,
    /// Initial canvas width in pixels.
    pub canvas_width: u32,
    /// Initial canvas height in pixels.
    pub canvas_height: u32,
    /// The embedder allows the application to resize the canvas.
    pub allow_canvas_resize: bool,
    /// Timer floor in milliseconds. Calibrated at start-up when absent.
    pub min_sleep_ms: Option<u32>,
    /// The page starts hidden.
    pub window_hidden: bool,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            threads: true,
            async_suspend: true,
            browser: Browser::Other,
            os: HostOs::Other,
            device_pixel_ratio: 1.0,
            canvas_width: 800,
            canvas_height: 600,
            allow_canvas_resize: false,
            min_sleep_ms: None,
            window_hidden: false,
        }
    }
}

/// `[channel]`: command and reply queue bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelSection {
    /// Unread commands kept before eviction.
    pub command_capacity: usize,
    /// Unread replies kept before eviction.
    pub reply_capacity: usize,
    /// Longest accepted message in bytes.
    pub max_message_len: usize,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            reply_capacity: DEFAULT_REPLY_CAPACITY,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

/// `[pacing]`: main-loop cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingSection {
    /// Display refresh rate driving vsync ticks.
    pub refresh_hz: u32,
    /// Main-loop interval at start-up. 0 starts with vsync off.
    pub initial_interval: u32,
    /// Period of the fixed cadence used while vsync is off.
    pub fixed_period_ms: u32,
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            refresh_hz: DEFAULT_REFRESH_HZ,
            initial_interval: 1,
            fixed_period_ms: DEFAULT_FIXED_PERIOD_MS,
        }
    }
}

impl PortalConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`PlatformError::Parse`] for malformed TOML or unknown keys,
    /// [`PlatformError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> PlatformResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`PlatformError::Io`] if the file cannot be read, otherwise as
    /// [`PortalConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> PlatformResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| PlatformError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading configuration");
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidConfig`] naming the first bad key.
    pub fn validate(&self) -> PlatformResult<()> {
        let invalid = |message: &str| -> PlatformResult<()> {
            Err(PlatformError::InvalidConfig(message.to_owned()))
        };

        if self.channel.command_capacity == 0 {
            return invalid("channel.command_capacity must be non-zero");
        }
        if self.channel.reply_capacity == 0 {
            return invalid("channel.reply_capacity must be non-zero");
        }
        if self.channel.max_message_len == 0 {
            return invalid("channel.max_message_len must be non-zero");
        }
        let dpr = self.platform.device_pixel_ratio;
        if !(dpr.is_finite() && dpr > 0.0) {
            return invalid("platform.device_pixel_ratio must be positive");
        }
        if self.pacing.refresh_hz == 0 || self.pacing.refresh_hz > MAX_REFRESH_HZ {
            return Err(PlatformError::InvalidConfig(format!(
                "pacing.refresh_hz must be between 1 and {MAX_REFRESH_HZ}"
            )));
        }
        Ok(())
    }

    /// Channel bounds in the form the command channel takes.
    #[must_use]
    pub const fn channel_limits(&self) -> ChannelLimits {
        ChannelLimits {
            command_capacity: self.channel.command_capacity,
            reply_capacity: self.channel.reply_capacity,
            max_message_len: self.channel.max_message_len,
        }
    }
}
