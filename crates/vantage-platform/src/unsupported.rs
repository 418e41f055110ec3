//! Fallbacks for platforms without DRM plumbing.

use anyhow::{bail, Result};
use vantage_edid::DisplayProfile;

pub fn discover_headset_display(_allow_unknown_devices: bool) -> Result<DisplayProfile> {
    bail!("XR display discovery is not implemented for this platform")
}

pub fn load_edid_override(_profile: &DisplayProfile, _firmware: &[u8]) -> Result<()> {
    bail!("EDID override is not implemented for this platform")
}

pub fn unload_edid_override(_profile: &DisplayProfile) -> Result<()> {
    bail!("EDID override is not implemented for this platform")
}
