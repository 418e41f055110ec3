//! Linux DRM discovery and debugfs EDID override.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::warn;
use vantage_edid::{interpret, DisplayProfile, EdidError};

const DRM_CLASS_DIR: &str = "/sys/class/drm";
const DRI_DEBUG_DIR: &str = "/sys/kernel/debug/dri";
/// Writing this sentinel to `edid_override` restores the connector's real EDID.
const OVERRIDE_RESET: &[u8] = b"reset";

/// Walk the DRM connectors and return a profile for the first supported XR
/// display, with its card/connector locator filled in.
pub fn discover_headset_display(allow_unknown_devices: bool) -> Result<DisplayProfile> {
    discover_in(Path::new(DRM_CLASS_DIR), allow_unknown_devices)
}

fn discover_in(drm_root: &Path, allow_unknown_devices: bool) -> Result<DisplayProfile> {
    let entries = fs::read_dir(drm_root)
        .with_context(|| format!("failed to read DRM directory {}", drm_root.display()))?;

    for entry in entries {
        let entry = entry.context("failed to read DRM directory entry")?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some((card, connector)) = split_connector(&name) else {
            continue;
        };

        let raw = match fs::read(entry.path().join("edid")) {
            Ok(raw) => raw,
            Err(_) => continue,
        };
        if raw.is_empty() {
            continue;
        }

        match interpret(&raw, allow_unknown_devices) {
            Ok(mut profile) => {
                profile.drm_card = Some(card);
                profile.drm_connector = Some(connector);
                return Ok(profile);
            }
            // Ordinary monitors on the same card; keep scanning quietly.
            Err(EdidError::UnsupportedDevice { .. }) => continue,
            Err(err) => warn!(connector = %name, "failed to interpret EDID: {err}"),
        }
    }

    bail!("no supported XR display found; check that the headset is plugged in and powered on")
}

/// Split a connector directory name like `card1-DP-2` into the card and
/// connector halves. Plain card directories and render nodes yield `None`.
fn split_connector(name: &str) -> Option<(String, String)> {
    let rest = name.strip_prefix("card")?;
    let (number, connector) = rest.split_once('-')?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((format!("card{number}"), connector.to_string()))
}

/// Write the specialized firmware to the connector's kernel override path.
/// Reverted on session teardown by [`unload_edid_override`].
pub fn load_edid_override(profile: &DisplayProfile, firmware: &[u8]) -> Result<()> {
    write_override(Path::new(DRI_DEBUG_DIR), profile, firmware)
}

/// Restore the connector's real EDID.
pub fn unload_edid_override(profile: &DisplayProfile) -> Result<()> {
    write_override(Path::new(DRI_DEBUG_DIR), profile, OVERRIDE_RESET)
}

fn write_override(debug_root: &Path, profile: &DisplayProfile, payload: &[u8]) -> Result<()> {
    let path = override_path(debug_root, profile)?;
    fs::write(&path, payload)
        .with_context(|| format!("failed to write EDID override at {}", path.display()))
}

fn override_path(debug_root: &Path, profile: &DisplayProfile) -> Result<PathBuf> {
    let (Some(card), Some(connector)) = (&profile.drm_card, &profile.drm_connector) else {
        bail!("display profile is missing DRM card/connector information");
    };
    // debugfs keys cards by bare number: card1 -> dri/1.
    let number = card.trim_start_matches("card");
    Ok(debug_root.join(number).join(connector).join("edid_override"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::REFERENCE_FIRMWARE;

    #[test]
    fn split_connector_accepts_connectors_only() {
        assert_eq!(
            split_connector("card0-DP-1"),
            Some(("card0".into(), "DP-1".into()))
        );
        assert_eq!(
            split_connector("card1-HDMI-A-2"),
            Some(("card1".into(), "HDMI-A-2".into()))
        );
        assert_eq!(split_connector("card0"), None);
        assert_eq!(split_connector("renderD128"), None);
        assert_eq!(split_connector("version"), None);
        assert_eq!(split_connector("cardX-DP-1"), None);
    }

    #[test]
    fn discovery_fills_in_locator_fields() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("card0")).unwrap();
        fs::create_dir(root.path().join("card0-eDP-1")).unwrap();
        // Empty EDID: a connector with nothing plugged in.
        fs::write(root.path().join("card0-eDP-1/edid"), b"").unwrap();
        fs::create_dir(root.path().join("card0-DP-2")).unwrap();
        fs::write(root.path().join("card0-DP-2/edid"), REFERENCE_FIRMWARE).unwrap();

        let profile = discover_in(root.path(), false).unwrap();
        assert_eq!(profile.manufacturer, "MRG");
        assert_eq!(profile.model, "Air");
        assert_eq!(profile.drm_card.as_deref(), Some("card0"));
        assert_eq!(profile.drm_connector.as_deref(), Some("DP-2"));
    }

    #[test]
    fn discovery_fails_when_nothing_matches() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("card0-DP-1")).unwrap();
        fs::write(root.path().join("card0-DP-1/edid"), b"").unwrap();
        assert!(discover_in(root.path(), true).is_err());
    }

    #[test]
    fn override_write_and_reset() {
        let root = tempfile::tempdir().unwrap();
        let mut profile = interpret(REFERENCE_FIRMWARE, false).unwrap();
        profile.drm_card = Some("card0".into());
        profile.drm_connector = Some("DP-2".into());

        let dir = root.path().join("0").join("DP-2");
        fs::create_dir_all(&dir).unwrap();

        let patched = vantage_edid::specialize(&profile.raw_edid).unwrap();
        write_override(root.path(), &profile, &patched).unwrap();
        assert_eq!(fs::read(dir.join("edid_override")).unwrap(), patched);

        write_override(root.path(), &profile, OVERRIDE_RESET).unwrap();
        assert_eq!(fs::read(dir.join("edid_override")).unwrap(), b"reset");
    }

    #[test]
    fn override_requires_locator_fields() {
        let root = tempfile::tempdir().unwrap();
        let profile = interpret(REFERENCE_FIRMWARE, false).unwrap();
        assert!(write_override(root.path(), &profile, b"x").is_err());
    }
}
