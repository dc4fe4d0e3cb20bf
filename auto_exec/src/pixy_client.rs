//! # Pixy Client
//!
//! The Pixy client requests the latest detected blocks from the vision sensor over an SPI link.
//! The SPI transport itself is provided by the hardware binding through [`SpiLink`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io;

use comms_if::eqpt::pixy::*;
use log::{trace, warn};

use crate::robot::DetectionSource;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Byte transport to the sensor.
pub trait SpiLink {
    /// Write bytes to the sensor, returning the number written.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read bytes from the sensor into `buf`, returning the number read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The Pixy client
pub struct PixyClient<L: SpiLink> {
    link: L,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PixyClientError {
    #[error("Could not send the request to the sensor: {0}")]
    WriteError(io::Error),

    #[error("Only {0} bytes of the request were sent")]
    ShortWrite(usize),

    #[error("Could not read the response from the sensor: {0}")]
    ReadError(io::Error),

    #[error("No response sync word within {0} bytes")]
    SyncNotFound(usize),

    #[error("Expected {expected} bytes of {part}, got {got}")]
    ShortRead {
        part: &'static str,
        expected: usize,
        got: usize,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L: SpiLink> PixyClient<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// Request the current blocks from the sensor.
    pub fn get_blocks(&mut self) -> Result<Vec<Detection>, PixyClientError> {
        let sent = self
            .link
            .write(&GET_BLOCKS_REQUEST)
            .map_err(PixyClientError::WriteError)?;
        if sent != GET_BLOCKS_REQUEST.len() {
            return Err(PixyClientError::ShortWrite(sent));
        }

        self.wait_for_sync()?;

        let mut header = [0u8; RESPONSE_HEADER_LEN];
        self.read_exact(&mut header, "header")?;

        let payload_len = header[RESPONSE_HEADER_LEN_INDEX] as usize;
        let mut payload = vec![0u8; payload_len];
        self.read_exact(&mut payload, "payload")?;

        let dets = decode_blocks(&payload);
        trace!("Pixy returned {} blocks", dets.len());

        Ok(dets)
    }

    /// Read single bytes until the sync word has been seen.
    fn wait_for_sync(&mut self) -> Result<(), PixyClientError> {
        let mut word = 0u16;
        let mut byte = [0u8; 1];

        for _ in 0..SYNC_SEARCH_LIMIT {
            self.read_exact(&mut byte, "sync")?;
            word = (word << 8) | byte[0] as u16;

            if word == RESPONSE_SYNC {
                return Ok(());
            }
        }

        Err(PixyClientError::SyncNotFound(SYNC_SEARCH_LIMIT))
    }

    fn read_exact(&mut self, buf: &mut [u8], part: &'static str) -> Result<(), PixyClientError> {
        let got = self.link.read(buf).map_err(PixyClientError::ReadError)?;

        if got != buf.len() {
            return Err(PixyClientError::ShortRead {
                part,
                expected: buf.len(),
                got,
            });
        }

        Ok(())
    }
}

impl<L: SpiLink> DetectionSource for PixyClient<L> {
    fn poll(&mut self) -> Vec<Detection> {
        match self.get_blocks() {
            Ok(dets) => dets,
            Err(e) => {
                warn!("Could not get blocks from the Pixy: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::VecDeque;

    /// Link replaying a fixed response
    struct MockLink {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        fail_read: bool,
    }

    impl MockLink {
        fn new(rx: &[u8]) -> Self {
            Self {
                rx: rx.iter().copied().collect(),
                tx: Vec::new(),
                fail_read: false,
            }
        }
    }

    impl SpiLink for MockLink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.tx.extend_from_slice(data);
            Ok(data.len())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail_read {
                return Err(io::Error::new(io::ErrorKind::Other, "bus fault"));
            }

            let mut n = 0;
            for b in buf.iter_mut() {
                match self.rx.pop_front() {
                    Some(v) => {
                        *b = v;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    /// A response containing the given blocks, preceded by some noise
    fn response(blocks: &[[u8; BLOCK_LEN]]) -> Vec<u8> {
        let mut rx = vec![0x00, 0x13, 0xaf];
        rx.extend_from_slice(&[0xaf, 0xc1]);
        rx.extend_from_slice(&[0x21, (blocks.len() * BLOCK_LEN) as u8, 0x00, 0x00]);
        for b in blocks {
            rx.extend_from_slice(b);
        }
        rx
    }

    #[test]
    fn test_get_blocks() {
        let block = [
            0x01, 0x00, 0xa6, 0x00, 0x88, 0x00, 0x0a, 0x00, 0x08, 0x00, 0x00, 0x00, 0x05, 0x50,
        ];
        let mut client = PixyClient::new(MockLink::new(&response(&[block, block])));

        let dets = client.poll();

        assert_eq!(client.link.tx, GET_BLOCKS_REQUEST.to_vec());
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0], Detection::new(5, 0x50, 166, 136, 10, 8));
    }

    #[test]
    fn test_empty_response() {
        let mut client = PixyClient::new(MockLink::new(&response(&[])));

        assert!(client.get_blocks().unwrap().is_empty());
    }

    #[test]
    fn test_no_sync() {
        let mut client = PixyClient::new(MockLink::new(&[0x55; 64]));

        assert!(matches!(
            client.get_blocks(),
            Err(PixyClientError::SyncNotFound(SYNC_SEARCH_LIMIT))
        ));

        // Faults are reported as an empty batch
        let mut client = PixyClient::new(MockLink::new(&[0x55; 64]));
        assert!(client.poll().is_empty());
    }

    #[test]
    fn test_truncated_payload() {
        let mut rx = response(&[[0u8; BLOCK_LEN]]);
        rx.truncate(rx.len() - 3);
        let mut client = PixyClient::new(MockLink::new(&rx));

        assert!(matches!(
            client.get_blocks(),
            Err(PixyClientError::ShortRead { part: "payload", .. })
        ));
    }

    #[test]
    fn test_read_error() {
        let mut link = MockLink::new(&response(&[]));
        link.fail_read = true;
        let mut client = PixyClient::new(link);

        assert!(matches!(client.get_blocks(), Err(PixyClientError::ReadError(_))));
        assert!(client.poll().is_empty());
    }
}
