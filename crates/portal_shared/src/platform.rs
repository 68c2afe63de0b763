//! Host environment classification.
//!
//! The string matching that produces these values lives in the embedding
//! page. Only the enumerated result crosses into Rust.

use serde::{Deserialize, Serialize};

/// Browser family the program is running in.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    /// Unknown or unclassified browser.
    #[default]
    Other = 0,
    /// Chrome, Edge, Opera and other Blink-based browsers.
    Chromium = 1,
    /// Firefox and Gecko-based browsers.
    Firefox = 2,
    /// Safari and WebKit-based browsers.
    Safari = 3,
}

/// Operating system the host browser is running on.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    /// Unknown or unclassified OS.
    #[default]
    Other = 0,
    /// Microsoft Windows.
    Windows = 1,
    /// Linux (including ChromeOS and Android reported as Linux).
    Linux = 2,
    /// iOS / iPadOS.
    Ios = 3,
    /// macOS.
    Macos = 4,
}
