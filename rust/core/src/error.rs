// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building core data model values
#[derive(Error, Debug)]
pub enum Error {
    #[error("Raster has zero dimension: {width}x{height}")]
    EmptyRaster { width: u32, height: u32 },

    #[error("Raster {channel} channel length mismatch: expected {expected}, got {actual}")]
    ChannelLengthMismatch {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
