//! Synchronized write frame for the AX/MX (Dynamixel protocol 1.0) servo bus.
//!
//! One broadcast packet sets the goal position of several actuators at once:
//!
//! ```text
//! FF FF FE <len> 83 1E 02 { <id> <pos lo> <pos hi> } x N <checksum>
//! ```
//!
//! where `len = 4 + 3N` and the checksum makes all bytes after the two `FF` sum to `0xFF`
//! (mod 256). There is no reply.

use std::fmt;

pub const HEADER: [u8; 2] = [0xFF, 0xFF];
pub const BROADCAST_ID: u8 = 0xFE;
pub const INSTR_SYNC_WRITE: u8 = 0x83;
pub const GOAL_POSITION_L: u8 = 0x1E;
/// Bytes of data written per actuator (one 16 bit position).
pub const DATA_WIDTH: u8 = 2;

/// Most entries that fit into the one byte length field.
pub const MAX_ENTRIES: usize = (u8::MAX as usize - 4) / 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    TooManyEntries,
    TooShort(usize),
    BadHeader,
    UnexpectedInstruction { instruction: u8, address: u8, width: u8 },
    LengthMismatch { declared: u8, actual: usize },
    BadChecksum { expected: u8, found: u8 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FrameError::TooManyEntries =>
                write!(f, "Sync write frame can carry at most {} entries", MAX_ENTRIES),
            FrameError::TooShort(len) =>
                write!(f, "Frame of {} bytes is too short", len),
            FrameError::BadHeader =>
                write!(f, "Frame does not start with a broadcast header"),
            FrameError::UnexpectedInstruction { instruction, address, width } =>
                write!(f, "Not a goal position sync write: instruction {:#04x}, address {:#04x}, width {}",
                       instruction, address, width),
            FrameError::LengthMismatch { declared, actual } =>
                write!(f, "Declared length {} does not match {} bytes of payload", declared, actual),
            FrameError::BadChecksum { expected, found } =>
                write!(f, "Bad checksum: expected {:#04x}, found {:#04x}", expected, found),
        }
    }
}

impl std::error::Error for FrameError {}

/// Goal positions for several actuators, built fresh for each dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncWrite {
    entries: Vec<(u8, u16)>,
}

impl SyncWrite {
    pub fn new() -> Self {
        SyncWrite { entries: Vec::new() }
    }

    /// Appends the goal position for the given actuator id.
    pub fn push(&mut self, id: u8, position: u16) -> Result<(), FrameError> {
        if self.entries.len() >= MAX_ENTRIES {
            return Err(FrameError::TooManyEntries);
        }
        self.entries.push((id, position));
        Ok(())
    }

    pub fn entries(&self) -> &[(u8, u16)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize into the wire format.
    pub fn encode(&self) -> Vec<u8> {
        let length = (4 + 3 * self.entries.len()) as u8;
        let mut packet = Vec::with_capacity(8 + 3 * self.entries.len());
        packet.extend_from_slice(&HEADER);
        packet.push(BROADCAST_ID);
        packet.push(length);
        packet.push(INSTR_SYNC_WRITE);
        packet.push(GOAL_POSITION_L);
        packet.push(DATA_WIDTH);
        for &(id, position) in &self.entries {
            packet.push(id);
            packet.extend_from_slice(&position.to_le_bytes());
        }
        packet.push(checksum(&packet[2..]));
        packet
    }

    /// Parse a frame produced by [SyncWrite::encode], validating header, length and checksum.
    pub fn decode(frame: &[u8]) -> Result<SyncWrite, FrameError> {
        if frame.len() < 8 {
            return Err(FrameError::TooShort(frame.len()));
        }
        if frame[0..2] != HEADER || frame[2] != BROADCAST_ID {
            return Err(FrameError::BadHeader);
        }
        let (instruction, address, width) = (frame[4], frame[5], frame[6]);
        if instruction != INSTR_SYNC_WRITE || address != GOAL_POSITION_L || width != DATA_WIDTH {
            return Err(FrameError::UnexpectedInstruction { instruction, address, width });
        }

        // Length counts everything after itself: instruction, address, width, data, checksum
        let declared = frame[3];
        let actual = frame.len() - 4;
        if declared as usize != actual || (actual - 4) % 3 != 0 {
            return Err(FrameError::LengthMismatch { declared, actual });
        }

        let last = frame.len() - 1;
        let expected = checksum(&frame[2..last]);
        if frame[last] != expected {
            return Err(FrameError::BadChecksum { expected, found: frame[last] });
        }

        let entries = frame[7..last]
            .chunks_exact(3)
            .map(|chunk| (chunk[0], u16::from_le_bytes([chunk[1], chunk[2]])))
            .collect();
        Ok(SyncWrite { entries })
    }
}

/// Protocol 1.0 checksum: inverted low byte of the sum.
fn checksum(data: &[u8]) -> u8 {
    let mut s: u8 = 0;
    for &b in data {
        s = s.wrapping_add(b);
    }
    !s
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn frame_of(entries: &[(u8, u16)]) -> SyncWrite {
        let mut frame = SyncWrite::new();
        for &(id, position) in entries {
            frame.push(id, position).unwrap();
        }
        frame
    }

    #[test]
    fn test_known_frame() {
        let bytes = frame_of(&[(1, 2048), (2, 0x0123)]).encode();
        let sum: u32 = 0xFE + 10 + 0x83 + 0x1E + 0x02 + (1 + 0x00 + 0x08) + (2 + 0x23 + 0x01);
        let expected_checksum = 0xFF - (sum % 256) as u8;
        assert_eq!(
            bytes,
            vec![0xFF, 0xFF, 0xFE, 10, 0x83, 0x1E, 0x02, 1, 0x00, 0x08, 2, 0x23, 0x01, expected_checksum]
        );
    }

    #[test]
    fn test_checksum_property() {
        let mut rng = StdRng::from_seed([0u8; 32]);
        for _ in 0..200 {
            let n = rng.gen_range(1..=6);
            let entries: Vec<(u8, u16)> =
                (0..n).map(|_| (rng.gen_range(0..=253), rng.gen_range(0..=4095))).collect();
            let bytes = frame_of(&entries).encode();

            assert_eq!(bytes.len(), 8 + 3 * n);
            assert_eq!(bytes[3] as usize, 4 + 3 * n);
            let sum = bytes[2..].iter().fold(0u8, |s, &b| s.wrapping_add(b));
            assert_eq!(sum, 0xFF);

            let decoded = SyncWrite::decode(&bytes).unwrap();
            assert_eq!(decoded.entries(), entries.as_slice());
        }
    }

    #[test]
    fn test_capacity() {
        let mut frame = SyncWrite::new();
        for id in 0..MAX_ENTRIES {
            frame.push(id as u8, 512).unwrap();
        }
        assert_eq!(frame.push(0, 512), Err(FrameError::TooManyEntries));
        assert_eq!(frame.encode()[3], 4 + 3 * MAX_ENTRIES as u8);
    }

    #[test]
    fn test_decode_rejects_damage() {
        let bytes = frame_of(&[(3, 1000), (4, 300)]).encode();

        let mut corrupted = bytes.clone();
        corrupted[8] ^= 0x10;
        assert!(matches!(SyncWrite::decode(&corrupted), Err(FrameError::BadChecksum { .. })));

        let mut header = bytes.clone();
        header[2] = 0x01;
        assert_eq!(SyncWrite::decode(&header), Err(FrameError::BadHeader));

        let truncated = &bytes[..bytes.len() - 2];
        assert!(matches!(SyncWrite::decode(truncated), Err(FrameError::LengthMismatch { .. })));

        let mut instruction = bytes.clone();
        instruction[4] = 0x03;
        assert!(matches!(
            SyncWrite::decode(&instruction),
            Err(FrameError::UnexpectedInstruction { instruction: 0x03, .. })
        ));

        assert_eq!(SyncWrite::decode(&bytes[..5]), Err(FrameError::TooShort(5)));
    }
}
