//! EDID interpretation and specialization for XR displays.
//!
//! This crate provides:
//! - A bounds-checked parser for raw EDID blocks read from display hardware
//! - A static quirks registry compensating for incomplete device self-description
//! - A patcher that marks an EDID as a "specialized display" so the OS exposes
//!   the headset as directly addressable instead of a generic mirrored monitor

#![forbid(unsafe_code)]

mod parser;
pub mod quirks;
mod specialize;

pub use parser::{interpret, DisplayProfile};
pub use quirks::QuirkEntry;
pub use specialize::{block_checksum, specialize, EDID_BLOCK_SIZE};

use thiserror::Error;

/// Result type alias for EDID operations.
pub type EdidResult<T> = Result<T, EdidError>;

#[derive(Debug, Error)]
pub enum EdidError {
    /// Structurally malformed EDID block. Unrecoverable.
    #[error("malformed EDID: {0}")]
    Parse(String),

    /// Manufacturer or model is not in the quirks registry.
    #[error("unsupported display device: manufacturer '{manufacturer}', model '{model}'")]
    UnsupportedDevice { manufacturer: String, model: String },

    /// No usable timing descriptors and no quirk fallback.
    #[error("cannot determine maximum resolution for display '{0}'")]
    ResolutionUndetermined(String),

    /// No usable pixel clocks and no quirk fallback.
    #[error("cannot determine maximum refresh rate for display '{0}'")]
    RefreshRateUndetermined(String),

    /// The base block's extension counter is already saturated.
    #[error("EDID extension block limit reached, but another extension is needed")]
    ExtensionLimit,
}
