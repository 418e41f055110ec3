//! Fake-patching backend: embedded firmware, no kernel writes.

use anyhow::{Context, Result};
use tracing::warn;
use vantage_edid::{interpret, DisplayProfile};

use crate::REFERENCE_FIRMWARE;

pub fn discover_headset_display(allow_unknown_devices: bool) -> Result<DisplayProfile> {
    warn!("fake patching build: using embedded reference firmware instead of probing DRM");
    let mut profile = interpret(REFERENCE_FIRMWARE, allow_unknown_devices)
        .context("failed to interpret embedded reference firmware")?;

    // No physical sensors to settle or distrust on a development machine;
    // drive the camera from the pointer instead.
    profile.quirks.roll_disabled = false;
    profile.quirks.sensor_init_delay_secs = 0;
    profile.quirks.uses_pointer_look = true;

    Ok(profile)
}

pub fn load_edid_override(_profile: &DisplayProfile, _firmware: &[u8]) -> Result<()> {
    warn!("fake patching build: ignoring EDID override load");
    Ok(())
}

pub fn unload_edid_override(_profile: &DisplayProfile) -> Result<()> {
    warn!("fake patching build: ignoring EDID override unload");
    Ok(())
}
