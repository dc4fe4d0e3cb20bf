//! # Vision Sensor Equipment Communications Module
//!
//! The vision sensor reports the objects it is tracking as "blocks": rectangular detections with
//! a tracking index and an age counter. This module defines the wire format of the sensor's
//! get-blocks exchange and the [`Detection`] record decoded from it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Get-blocks request: sync `0xc1ae`, request type `0x20`, payload length 2, signature map `0x01`
/// (first signature only), maximum number of blocks `0xff`.
pub const GET_BLOCKS_REQUEST: [u8; 6] = [0xae, 0xc1, 0x20, 0x02, 0x01, 0xff];

/// Sync word which starts every response, as it appears when two consecutive bytes are shifted
/// into a `u16` first-byte-high (`0xc1af` on the wire is read as `0xafc1`).
pub const RESPONSE_SYNC: u16 = 0xafc1;

/// Maximum number of single bytes to read while looking for the response sync word.
pub const SYNC_SEARCH_LIMIT: usize = 32;

/// Length of the response header following the sync word.
pub const RESPONSE_HEADER_LEN: usize = 4;

/// Index of the payload length byte within the response header.
pub const RESPONSE_HEADER_LEN_INDEX: usize = 1;

/// Length of one encoded block in the response payload.
pub const BLOCK_LEN: usize = 14;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One object reported by the vision sensor.
///
/// Positions and sizes are in sensor pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Detection {
    /// Tracking index. Reused by the sensor once an object is lost and a new one acquired.
    pub index: u8,

    /// Number of frames the object has been tracked for. Saturates at 255 and resets when the
    /// sensor re-acquires the object.
    pub age: u8,

    /// Centre x position
    pub x: i32,

    /// Centre y position
    pub y: i32,

    /// Width of the bounding box
    pub width: i32,

    /// Height of the bounding box
    pub height: i32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Detection {
    /// Create a new detection.
    pub fn new(index: u8, age: u8, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            index,
            age,
            x,
            y,
            width,
            height,
        }
    }

    /// Decode a detection from one encoded block.
    ///
    /// Returns `None` if `block` is shorter than [`BLOCK_LEN`].
    pub fn from_block(block: &[u8]) -> Option<Self> {
        if block.len() < BLOCK_LEN {
            return None;
        }

        Some(Self {
            x: LittleEndian::read_u16(&block[2..4]) as i32,
            y: LittleEndian::read_u16(&block[4..6]) as i32,
            width: LittleEndian::read_u16(&block[6..8]) as i32,
            height: LittleEndian::read_u16(&block[8..10]) as i32,
            index: block[12],
            age: block[13],
        })
    }

    /// Area of the bounding box. Wide enough for any pair of sizes, including the largest the
    /// sensor can send.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

/// Decode every whole block in a response payload.
///
/// Trailing bytes which do not make up a whole block are ignored.
pub fn decode_blocks(payload: &[u8]) -> Vec<Detection> {
    payload
        .chunks_exact(BLOCK_LEN)
        .filter_map(Detection::from_block)
        .collect()
}
