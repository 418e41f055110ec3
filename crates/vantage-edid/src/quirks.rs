//! Static registry of per-device display quirks.
//!
//! XR glasses frequently ship EDIDs that under-describe the hardware: missing
//! timing descriptors, sensors that need a warm-up period, or a roll axis that
//! cannot be trusted. Entries here patch over those gaps. The registry is
//! compiled in; adding a device is a code change, not a config change.

/// Behavioral overrides for a single (manufacturer, model) pair.
///
/// Zero means "unknown" for the numeric fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuirkEntry {
    pub max_width: u32,
    pub max_height: u32,
    pub max_refresh_rate: u32,
    /// Seconds to ignore sensor data after session start.
    pub sensor_init_delay_secs: u32,
    /// The device's roll (z) axis is unreliable and must be suppressed.
    pub roll_disabled: bool,
    /// The device has no usable onboard orientation; look direction comes
    /// from a pointer device instead.
    pub uses_pointer_look: bool,
}

// Manufacturer ids follow the UEFI PNP id registry (https://uefi.org/uefi-pnp-export).
const REGISTRY: &[(&str, &[(&str, QuirkEntry)])] = &[(
    "MRG",
    &[(
        "Air",
        QuirkEntry {
            max_width: 1920,
            max_height: 1080,
            max_refresh_rate: 120,
            sensor_init_delay_secs: 10,
            roll_disabled: true,
            uses_pointer_look: false,
        },
    )],
)];

/// Whether any model of this manufacturer is known to the registry.
pub fn manufacturer_known(manufacturer: &str) -> bool {
    REGISTRY.iter().any(|(known, _)| *known == manufacturer)
}

/// Look up the quirk entry for a specific (manufacturer, model) pair.
pub fn lookup(manufacturer: &str, model: &str) -> Option<&'static QuirkEntry> {
    REGISTRY
        .iter()
        .find(|(known, _)| *known == manufacturer)
        .and_then(|(_, models)| models.iter().find(|(name, _)| *name == model))
        .map(|(_, entry)| entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_device_resolves() {
        let entry = lookup("MRG", "Air").expect("MRG Air should be registered");
        assert_eq!(entry.max_width, 1920);
        assert_eq!(entry.max_height, 1080);
        assert_eq!(entry.max_refresh_rate, 120);
        assert!(entry.roll_disabled);
        assert!(!entry.uses_pointer_look);
    }

    #[test]
    fn unknown_model_under_known_manufacturer() {
        assert!(manufacturer_known("MRG"));
        assert!(lookup("MRG", "Air 2 Ultra").is_none());
    }

    #[test]
    fn unknown_manufacturer() {
        assert!(!manufacturer_known("ZZZ"));
        assert!(lookup("ZZZ", "Air").is_none());
    }
}
