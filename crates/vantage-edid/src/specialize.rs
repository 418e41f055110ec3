//! Patching an EDID so the OS treats the display as "specialized".
//!
//! A specialized display carries a vendor-specific data block inside a CTA
//! extension (tag byte, IEEE OUI, version, capability tag, 16-byte unique
//! id). Window managers and compositors then expose it for direct addressing
//! instead of mirroring it. The layout follows the published specialized-
//! monitor EDID extension.

use tracing::warn;
use uuid::Uuid;

use crate::{EdidError, EdidResult};

/// Every EDID block, base or extension, is exactly 128 bytes.
pub const EDID_BLOCK_SIZE: usize = 128;

const CTA_EXTENSION_TAG: u8 = 0x02;
const CTA_EXTENSION_REVISION: u8 = 0x03;
/// Size of the specialization vendor data block including its header.
const SPECIALIZATION_PAYLOAD_SIZE: u8 = 22 + 4;
/// IEEE OUI assigned to the specialized-monitor extension.
const SPECIALIZATION_OUI: [u8; 3] = [0x5C, 0x12, 0xCA];
/// Version 0x2 has the widest loader compatibility.
const SPECIALIZATION_VERSION: u8 = 0x02;
/// VR capability tag.
const SPECIALIZATION_VR_TAG: u8 = 0x07;

/// Checksum over all bytes of a block except its final byte, chosen so the
/// whole block sums to zero modulo 256.
pub fn block_checksum(block: &[u8]) -> u8 {
    let sum = block[..block.len() - 1]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    sum.wrapping_neg()
}

/// Produce a copy of `edid` patched to advertise a specialized display.
///
/// The input is never mutated. If no CTA extension block exists one is
/// appended (bumping the base block's extension count and checksum);
/// otherwise the vendor data block is written into the last CTA extension
/// found, displacing any foreign vendor data already at that offset.
pub fn specialize(edid: &[u8]) -> EdidResult<Vec<u8>> {
    if edid.len() < EDID_BLOCK_SIZE {
        return Err(EdidError::Parse(format!(
            "{} bytes is shorter than the {EDID_BLOCK_SIZE}-byte base block",
            edid.len()
        )));
    }
    if edid.len() % EDID_BLOCK_SIZE != 0 {
        return Err(EdidError::Parse(format!(
            "length {} is not a multiple of {EDID_BLOCK_SIZE}",
            edid.len()
        )));
    }

    let mut out = edid.to_vec();

    let mut extension_base = 0usize;
    let mut extension_exists = false;

    if out.len() > EDID_BLOCK_SIZE {
        // Scan every extension block; the last CTA block wins.
        for position in (EDID_BLOCK_SIZE..out.len()).step_by(EDID_BLOCK_SIZE) {
            if out[position] != CTA_EXTENSION_TAG {
                continue;
            }
            if out[position + 1] != CTA_EXTENSION_REVISION {
                warn!(
                    revision = out[position + 1],
                    "unexpected revision for CTA data section in EDID"
                );
            }
            extension_base = position;
            extension_exists = true;
        }

        if !extension_exists {
            extension_base = out.len();
            out.extend(std::iter::repeat(0u8).take(EDID_BLOCK_SIZE));
        }
    } else {
        extension_base = EDID_BLOCK_SIZE;
        out.extend(std::iter::repeat(0u8).take(EDID_BLOCK_SIZE));
    }

    if !extension_exists {
        if out[126] == u8::MAX {
            return Err(EdidError::ExtensionLimit);
        }
        out[126] += 1;
        out[127] = block_checksum(&out[..EDID_BLOCK_SIZE]);

        out[extension_base] = CTA_EXTENSION_TAG;
        out[extension_base + 1] = CTA_EXTENSION_REVISION;
        out[extension_base + 3] = 0x00;
    }

    let block = &mut out[extension_base..extension_base + EDID_BLOCK_SIZE];
    let previous_dtd_offset = block[2] as usize;
    block[2] = SPECIALIZATION_PAYLOAD_SIZE;

    if extension_exists
        && previous_dtd_offset != SPECIALIZATION_PAYLOAD_SIZE as usize
        && previous_dtd_offset != 0
    {
        // Foreign vendor data sits where our payload goes. Zero its region
        // and slide the trailing bytes up past our payload; best effort, not
        // a multi-vendor merge.
        if (5..EDID_BLOCK_SIZE).contains(&previous_dtd_offset) {
            block[4..previous_dtd_offset - 1].fill(0);
            let count = (127 - SPECIALIZATION_PAYLOAD_SIZE as usize)
                .min(127 - previous_dtd_offset);
            block.copy_within(
                previous_dtd_offset..previous_dtd_offset + count,
                SPECIALIZATION_PAYLOAD_SIZE as usize,
            );
        } else {
            warn!(
                offset = previous_dtd_offset,
                "implausible DTD offset in CTA extension; leaving existing data in place"
            );
        }
    }

    // Vendor-specific tag (0x3) in the top three bits, payload length 0x15.
    block[4] = 0x3 << 5 | 0x15;
    block[5..8].copy_from_slice(&SPECIALIZATION_OUI);
    block[8] = SPECIALIZATION_VERSION;
    block[9] = SPECIALIZATION_VR_TAG;
    block[10..26].copy_from_slice(Uuid::new_v4().as_bytes());

    block[127] = block_checksum(block);

    Ok(out)
}
