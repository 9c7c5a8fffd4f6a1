//! The byte-transport contract this codec is layered over.
//!
//! Transport selection, TLS/SOCKS/Tor negotiation, and authentication are
//! explicit external collaborators (see this crate's scope notes); all this
//! trait asks of them is a reliable, ordered, bidirectional byte stream.

/// A reliable, ordered, bidirectional byte transport.
///
/// [`crate::driver::ProtocolDriver`] only ever calls `write`; it is the
/// transport's job (and its surrounding event loop's) to call the driver's
/// `data_received`, `connection_made`, and `connection_lost` hooks in
/// response to actual I/O activity.
pub trait Transport {
    /// Writes `data` to the wire. Must preserve ordering with respect to
    /// prior `write` calls.
    ///
    /// # Errors
    /// Returns an I/O error if the write fails.
    fn write(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Requests an orderly shutdown of the connection.
    fn lose_connection(&mut self);
}

/// A trivial in-memory [`Transport`] that records everything written to
/// it instead of touching real I/O. Used by this crate's own tests and
/// exposed for downstream integration tests exercising
/// [`crate::driver::ProtocolDriver`] without a real socket.
pub mod test_support {
    use super::Transport;

    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        pub written: Vec<u8>,
        pub lost: bool,
    }

    impl Transport for RecordingTransport {
        fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn lose_connection(&mut self) {
            self.lost = true;
        }
    }
}
