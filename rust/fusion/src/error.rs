// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;
use wallsense_core::SurfaceId;

/// Result type for fusion pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the fusion pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// A duplicate add is a tracking-subsystem contract violation:
    /// continuing would break the registry's uniqueness invariant.
    #[error("Surface {0} already exists in the registry")]
    DuplicateSurface(SurfaceId),

    #[error("Core error: {0}")]
    Core(#[from] wallsense_core::Error),
}
