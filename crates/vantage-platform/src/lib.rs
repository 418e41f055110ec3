//! Platform-specific collaborators around the EDID core: discovering the
//! headset's display on the graphics stack, and loading/unloading the
//! specialized firmware through the kernel's override path.

#![forbid(unsafe_code)]

#[cfg(all(target_os = "linux", not(feature = "fake-patching")))]
mod linux;
#[cfg(all(target_os = "linux", not(feature = "fake-patching")))]
pub use linux::{discover_headset_display, load_edid_override, unload_edid_override};

#[cfg(feature = "fake-patching")]
mod fake;
#[cfg(feature = "fake-patching")]
pub use fake::{discover_headset_display, load_edid_override, unload_edid_override};

#[cfg(all(not(target_os = "linux"), not(feature = "fake-patching")))]
mod unsupported;
#[cfg(all(not(target_os = "linux"), not(feature = "fake-patching")))]
pub use unsupported::{discover_headset_display, load_edid_override, unload_edid_override};

/// Reference EDID dump of an XREAL Air (base block plus one CTA extension).
/// Used by the fake-patching backend and by tests.
pub const REFERENCE_FIRMWARE: &[u8] = include_bytes!("../assets/xreal-air-edid.bin");
