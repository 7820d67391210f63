use crate::frame::{self, FRAME_LEN};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("frame rejected: {0}")]
    Rejected(String),
    #[error("link error: {0}")]
    Link(String),
}

/// Outbound side of a sensor node. `transmit` blocks until the frame is handed off.
pub trait Transport {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).transmit(frame)
    }
}

/// Logs every frame and drops it.
#[derive(Debug, Default)]
pub struct LogTransport {
    transmitted: u64,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }
}

impl Transport for LogTransport {
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.transmitted += 1;
        match frame::decode(bytes) {
            Ok(decoded) => info!(
                src = decoded.frame.src_address(),
                dest = decoded.frame.dest_address(),
                data = decoded.frame.data(),
                "transmitting frame {:02x?}",
                bytes
            ),
            Err(_) => info!("transmitting {} raw bytes {:02x?}", bytes.len(), bytes),
        }
        Ok(())
    }
}

/// Keeps every transmitted frame, optionally failing selected calls.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    frames: Vec<Vec<u8>>,
    calls: usize,
    fail_on: Vec<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given zero-based call indices with [`TransportError::Rejected`].
    pub fn failing_on(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on: calls.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Transport for RecordingTransport {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let call = self.calls;
        self.calls += 1;

        if self.fail_on.contains(&call) {
            return Err(TransportError::Rejected(format!("scripted failure on call {}", call)));
        }
        if frame.len() != FRAME_LEN {
            return Err(TransportError::Rejected(format!("unexpected frame size {}", frame.len())));
        }

        self.frames.push(frame.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_transport_keeps_frames() {
        let mut transport = RecordingTransport::new();
        let bytes = frame::encode(frame::FLAG_DATA, 1, 2, 3).unwrap();
        transport.transmit(&bytes).unwrap();
        assert_eq!(transport.frames(), &[bytes.to_vec()]);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_scripted_failures() {
        let mut transport = RecordingTransport::failing_on([1]);
        let bytes = frame::encode(frame::FLAG_DATA, 1, 2, 3).unwrap();
        assert!(transport.transmit(&bytes).is_ok());
        assert!(matches!(transport.transmit(&bytes), Err(TransportError::Rejected(_))));
        assert!(transport.transmit(&bytes).is_ok());
        assert_eq!(transport.frames().len(), 2);
    }

    #[test]
    fn test_log_transport_counts() {
        let mut transport = LogTransport::new();
        transport.transmit(&[1, 2, 3]).unwrap();
        assert_eq!(transport.transmitted(), 1);
    }
}
