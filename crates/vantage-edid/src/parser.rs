//! Parsing of raw EDID blocks into a resolved [`DisplayProfile`].
//!
//! The raw block is untrusted external input (a firmware dump or sysfs read),
//! so every offset access is bounds-checked and structural violations are
//! reported as [`EdidError::Parse`] rather than panicking.

use crate::quirks::{self, QuirkEntry};
use crate::specialize::EDID_BLOCK_SIZE;
use crate::{EdidError, EdidResult};

const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
const DESCRIPTOR_BASE: usize = 54;
const DESCRIPTOR_LEN: usize = 18;
const DESCRIPTOR_COUNT: usize = 4;
/// Display-descriptor tag carrying the model name.
const MONITOR_NAME_TAG: u8 = 0xFC;

/// Everything the rest of the system needs to know about the headset display.
///
/// Resolution and refresh rate are guaranteed non-zero; construction fails
/// instead of producing a profile with an unknown dimension.
#[derive(Debug, Clone)]
pub struct DisplayProfile {
    /// Owned copy of the raw identification bytes the profile was built from.
    pub raw_edid: Vec<u8>,
    /// Three-letter PNP manufacturer id.
    pub manufacturer: String,
    /// Model name from the monitor-name descriptor; empty if absent.
    pub model: String,
    /// Resolved quirks for this device (all-zero for tolerated unknown models).
    pub quirks: QuirkEntry,
    pub max_width: u32,
    pub max_height: u32,
    pub max_refresh_hz: u32,
    /// DRM card the EDID was read from, filled in by platform discovery.
    pub drm_card: Option<String>,
    /// DRM connector the EDID was read from, filled in by platform discovery.
    pub drm_connector: Option<String>,
}

impl DisplayProfile {
    /// Apply user-configured dimension overrides on top of the resolved values.
    /// `None` leaves the detected value in place.
    pub fn apply_overrides(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
        refresh_hz: Option<u32>,
    ) {
        if let Some(width) = width {
            self.max_width = width;
        }
        if let Some(height) = height {
            self.max_height = height;
        }
        if let Some(refresh_hz) = refresh_hz {
            self.max_refresh_hz = refresh_hz;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimingDescriptor {
    pixel_clock_khz: u32,
    h_active: u32,
    h_blank: u32,
    v_active: u32,
    v_blank: u32,
}

struct ParsedBase {
    manufacturer: String,
    model: String,
    timings: Vec<TimingDescriptor>,
}

/// Interpret a raw EDID into a [`DisplayProfile`].
///
/// `allow_unknown_devices` waives the *model* quirk lookup only: a model that
/// is missing from the registry proceeds with an all-zero [`QuirkEntry`]. A
/// manufacturer with no registry entry at all is always rejected, since there
/// is no evidence the device is an XR display.
pub fn interpret(raw: &[u8], allow_unknown_devices: bool) -> EdidResult<DisplayProfile> {
    let parsed = parse_base(raw)?;

    if !quirks::manufacturer_known(&parsed.manufacturer) {
        return Err(EdidError::UnsupportedDevice {
            manufacturer: parsed.manufacturer,
            model: parsed.model,
        });
    }

    let quirks = match quirks::lookup(&parsed.manufacturer, &parsed.model) {
        Some(entry) => entry.clone(),
        None if allow_unknown_devices => QuirkEntry::default(),
        None => {
            return Err(EdidError::UnsupportedDevice {
                manufacturer: parsed.manufacturer,
                model: parsed.model,
            })
        }
    };

    let mut max_width = 0u32;
    let mut max_height = 0u32;
    let mut max_refresh_hz = 0u32;

    for timing in &parsed.timings {
        // A descriptor must dominate on both axes to replace the maximum.
        if timing.h_active > max_width && timing.v_active > max_height {
            max_width = timing.h_active;
            max_height = timing.v_active;
        }

        let h_total = (timing.h_active + timing.h_blank) as u64;
        let v_total = (timing.v_active + timing.v_blank) as u64;
        if h_total == 0 || v_total == 0 {
            continue;
        }
        let refresh = (timing.pixel_clock_khz as u64 * 1000 / (h_total * v_total)) as u32;
        if refresh > max_refresh_hz {
            max_refresh_hz = refresh;
        }
    }

    if max_width == 0 || max_height == 0 {
        if quirks.max_width == 0 || quirks.max_height == 0 {
            return Err(EdidError::ResolutionUndetermined(parsed.model));
        }
        max_width = quirks.max_width;
        max_height = quirks.max_height;
    }

    if max_refresh_hz == 0 {
        if quirks.max_refresh_rate == 0 {
            return Err(EdidError::RefreshRateUndetermined(parsed.model));
        }
        max_refresh_hz = quirks.max_refresh_rate;
    }

    Ok(DisplayProfile {
        raw_edid: raw.to_vec(),
        manufacturer: parsed.manufacturer,
        model: parsed.model,
        quirks,
        max_width,
        max_height,
        max_refresh_hz,
        drm_card: None,
        drm_connector: None,
    })
}

fn parse_base(raw: &[u8]) -> EdidResult<ParsedBase> {
    if raw.len() < EDID_BLOCK_SIZE {
        return Err(EdidError::Parse(format!(
            "{} bytes is shorter than the {EDID_BLOCK_SIZE}-byte base block",
            raw.len()
        )));
    }
    if raw.len() % EDID_BLOCK_SIZE != 0 {
        return Err(EdidError::Parse(format!(
            "length {} is not a multiple of {EDID_BLOCK_SIZE}",
            raw.len()
        )));
    }
    if raw[0..8] != EDID_HEADER {
        return Err(EdidError::Parse("bad header magic".into()));
    }
    let sum = raw[..EDID_BLOCK_SIZE]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        return Err(EdidError::Parse("base block checksum mismatch".into()));
    }

    let manufacturer = decode_manufacturer(u16::from_be_bytes([raw[8], raw[9]]))?;

    let mut model = String::new();
    let mut timings = Vec::with_capacity(DESCRIPTOR_COUNT);

    for slot in 0..DESCRIPTOR_COUNT {
        let start = DESCRIPTOR_BASE + slot * DESCRIPTOR_LEN;
        let descriptor = &raw[start..start + DESCRIPTOR_LEN];
        let pixel_clock = u16::from_le_bytes([descriptor[0], descriptor[1]]);

        if pixel_clock != 0 {
            timings.push(parse_timing(pixel_clock, descriptor));
        } else if descriptor[3] == MONITOR_NAME_TAG {
            model = decode_descriptor_text(&descriptor[5..DESCRIPTOR_LEN]);
        }
    }

    Ok(ParsedBase {
        manufacturer,
        model,
        timings,
    })
}

/// Unpack a detailed timing descriptor. Active and blanking values are split
/// across a low byte and a shared high nibble.
fn parse_timing(pixel_clock: u16, d: &[u8]) -> TimingDescriptor {
    TimingDescriptor {
        pixel_clock_khz: pixel_clock as u32 * 10,
        h_active: d[2] as u32 | (((d[4] & 0xF0) as u32) << 4),
        h_blank: d[3] as u32 | (((d[4] & 0x0F) as u32) << 8),
        v_active: d[5] as u32 | (((d[7] & 0xF0) as u32) << 4),
        v_blank: d[6] as u32 | (((d[7] & 0x0F) as u32) << 8),
    }
}

/// Decode the packed PNP manufacturer id: three 5-bit letters, big-endian.
fn decode_manufacturer(id: u16) -> EdidResult<String> {
    let mut letters = String::with_capacity(3);
    for shift in [10u16, 5, 0] {
        let code = (id >> shift) & 0x1F;
        if !(1..=26).contains(&code) {
            return Err(EdidError::Parse(format!(
                "invalid manufacturer id 0x{id:04X}"
            )));
        }
        letters.push((b'A' + code as u8 - 1) as char);
    }
    Ok(letters)
}

/// Descriptor text is newline-terminated and space-padded to 13 bytes.
fn decode_descriptor_text(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == b'\n' || b == 0)
        .unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}
