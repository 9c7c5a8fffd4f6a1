//! The protocol driver: owns the transport, both stacks, the vocabulary
//! tables, and the keepalive/disconnect timers, and pumps bytes in both
//! directions.

use std::time::{Duration, Instant};

use bytes::BytesMut;

use crate::buffer::ReceiveBuffer;
use crate::error::BananaError;
use crate::scheduler::Scheduler;
use crate::slicer::builtins::slicer_for_value;
use crate::slicer::root::{RootSlicer, SlicerRegistry};
use crate::slicer::vocab::VocabAddSlicer;
use crate::slicer::SlicerStack;
use crate::token::{RawToken, TokenKind};
use crate::transport::Transport;
use crate::unslicer::root::RootUnslicer;
use crate::unslicer::{ProtocolObserver, UnslicerRegistry, UnslicerStack};
use crate::value::Value;
use crate::vocab::VocabularyTables;

/// Default interval between keepalive `PING`s when the connection is
/// otherwise idle.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
/// Default span of silence from the peer after which the connection is
/// considered dead.
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(120);

/// Owns one end of a Banana connection: the transport, the send/receive
/// stacks, the shared vocabulary tables, and the keepalive/disconnect
/// timer state.
pub struct ProtocolDriver<T: Transport, S: Scheduler, O: ProtocolObserver + 'static> {
    transport: T,
    scheduler: S,
    vocab: VocabularyTables,
    slicer_stack: SlicerStack,
    unslicer_stack: UnslicerStack,
    receive_buffer: ReceiveBuffer,
    keepalive_interval: Duration,
    disconnect_timeout: Duration,
    last_sent: Option<Instant>,
    last_received: Option<Instant>,
    next_ping_id: u64,
    _observer: std::marker::PhantomData<O>,
}

impl<T: Transport, S: Scheduler, O: ProtocolObserver + 'static> ProtocolDriver<T, S, O> {
    /// Builds a driver over `transport`, using `scheduler` for timing and
    /// forwarding completed objects to `observer`.
    pub fn new(transport: T, scheduler: S, observer: O) -> Self {
        let root_unslicer = Box::new(RootUnslicer::new(observer));
        Self {
            transport,
            scheduler,
            vocab: VocabularyTables::new(),
            slicer_stack: SlicerStack::new(Box::new(RootSlicer::new(SlicerRegistry::new()))),
            unslicer_stack: UnslicerStack::new(root_unslicer, UnslicerRegistry::new()),
            receive_buffer: ReceiveBuffer::new(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
            last_sent: None,
            last_received: None,
            next_ping_id: 0,
            _observer: std::marker::PhantomData,
        }
    }

    /// Overrides the default keepalive/disconnect durations.
    pub fn set_timers(&mut self, keepalive_interval: Duration, disconnect_timeout: Duration) {
        self.keepalive_interval = keepalive_interval;
        self.disconnect_timeout = disconnect_timeout;
    }

    /// Called once the transport is up; arms the timers.
    pub fn connection_made(&mut self) {
        let now = self.scheduler.now();
        self.last_sent = Some(now);
        self.last_received = Some(now);
    }

    /// Called when the transport goes away; drops any queued-but-unsent
    /// objects.
    pub fn connection_lost(&mut self) {
        self.last_sent = None;
        self.last_received = None;
        self.slicer_stack.drop_pending();
    }

    /// Queues `value` for sending and flushes whatever can be produced
    /// right now.
    ///
    /// # Errors
    /// Returns a [`BananaError`] if the send-side stack desyncs (a
    /// violation propagated past the root frame).
    pub fn send(&mut self, value: Value) -> Result<(), BananaError> {
        self.slicer_stack.push_top_level(slicer_for_value(value));
        self.flush_send()
    }

    /// Schedules `value` to be added to the outgoing vocabulary table and
    /// flushes whatever can be produced right now. The reservation made by
    /// [`VocabularyTables::add_to_outgoing`] only becomes visible to
    /// [`VocabularyTables::outgoing_index`] once the marker this pushes
    /// actually reaches the wire; scheduling the same `value` again before
    /// that point is a no-op (idempotent).
    ///
    /// # Errors
    /// Returns a [`BananaError`] if the send-side stack desyncs (a
    /// violation propagated past the root frame).
    pub fn schedule_vocab_add(&mut self, value: Vec<u8>) -> Result<(), BananaError> {
        let (index, fresh) = self.vocab.add_to_outgoing(value.clone());
        if fresh {
            self.slicer_stack
                .push_top_level(Box::new(VocabAddSlicer::new(index, value)));
        }
        self.flush_send()
    }

    fn flush_send(&mut self) -> Result<(), BananaError> {
        let tokens = self.slicer_stack.pump(&mut self.vocab)?;
        if tokens.is_empty() {
            return Ok(());
        }
        self.write_tokens(&tokens)?;
        self.last_sent = Some(self.scheduler.now());
        Ok(())
    }

    fn write_tokens(&mut self, tokens: &[RawToken]) -> Result<(), BananaError> {
        let mut buf = BytesMut::new();
        for token in tokens {
            token.encode_into(&mut buf);
        }
        self.transport.write(&buf)?;
        Ok(())
    }

    /// Feeds freshly-received bytes into the receive buffer and processes
    /// every complete token that can be parsed out of it.
    ///
    /// # Errors
    /// Returns a [`BananaError`] for any fatal framing or protocol error.
    pub fn data_received(&mut self, chunk: &[u8]) -> Result<(), BananaError> {
        self.receive_buffer.append(chunk);
        self.last_received = Some(self.scheduler.now());
        while let Some(raw) = self.try_parse_one_token()? {
            self.process_raw_token(raw)?;
        }
        Ok(())
    }

    fn try_parse_one_token(&mut self) -> Result<Option<RawToken>, BananaError> {
        let Some((header, header_len)) = self.receive_buffer.peek_header()? else {
            return Ok(None);
        };
        let Some(type_byte) = self.receive_buffer.peek_byte(header_len) else {
            return Ok(None);
        };
        let kind = TokenKind::from_u8(type_byte)?;

        if kind == TokenKind::Error && header > crate::SIZE_LIMIT {
            return Err(BananaError::OversizedError {
                len: header,
                limit: crate::SIZE_LIMIT,
            });
        }

        let body_len = if kind.has_length_prefixed_body() {
            header as usize
        } else if kind == TokenKind::Float {
            8
        } else {
            0
        };
        let total_needed = header_len + 1 + body_len;
        if self.receive_buffer.len() < total_needed {
            return Ok(None);
        }

        self.receive_buffer.advance(header_len + 1);
        let body = if body_len > 0 {
            self.receive_buffer.consume(body_len)
        } else {
            None
        };
        Ok(Some(RawToken { header, kind, body }))
    }

    fn process_raw_token(&mut self, raw: RawToken) -> Result<(), BananaError> {
        match raw.kind {
            TokenKind::Ping => {
                let pong = RawToken::header_only(raw.header, TokenKind::Pong);
                self.write_tokens(std::slice::from_ref(&pong))
            }
            TokenKind::Pong => Ok(()),
            _ => self.unslicer_stack.receive_token(&raw, &mut self.vocab),
        }
    }

    /// Grants test code access to the scheduler so it can advance a
    /// [`crate::scheduler::ManualClock`] between `poll_timers` calls.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Grants read access to the vocabulary tables, e.g. for test code to
    /// confirm a scheduled addition landed in the incoming table.
    pub fn vocab(&self) -> &VocabularyTables {
        &self.vocab
    }

    /// Sends a keepalive `PING` if due, and checks the disconnect deadline,
    /// both measured against `self.scheduler.now()`. Returns `true` if the
    /// connection was judged dead and [`Transport::lose_connection`] was
    /// called.
    ///
    /// # Errors
    /// Returns a [`BananaError`] if sending the `PING` fails.
    pub fn poll_timers(&mut self) -> Result<bool, BananaError> {
        let now = self.scheduler.now();
        if let Some(last_received) = self.last_received {
            if now.saturating_duration_since(last_received) >= self.disconnect_timeout {
                tracing::warn!("peer silent past disconnect timeout, closing connection");
                self.transport.lose_connection();
                return Ok(true);
            }
        }
        if let Some(last_sent) = self.last_sent {
            if now.saturating_duration_since(last_sent) >= self.keepalive_interval {
                let ping = RawToken::header_only(self.next_ping_id, TokenKind::Ping);
                self.next_ping_id += 1;
                self.write_tokens(std::slice::from_ref(&ping))?;
                self.last_sent = Some(now);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualClock;
    use crate::transport::test_support::RecordingTransport;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Collector(Rc<RefCell<Vec<Value>>>);
    impl ProtocolObserver for Collector {
        fn received_object(&mut self, value: Value) {
            self.0.borrow_mut().push(value);
        }
    }

    fn driver() -> ProtocolDriver<RecordingTransport, ManualClock, Collector> {
        ProtocolDriver::new(
            RecordingTransport::default(),
            ManualClock::new(Instant::now()),
            Collector::default(),
        )
    }

    fn driver_with_observer() -> (ProtocolDriver<RecordingTransport, ManualClock, Collector>, Rc<RefCell<Vec<Value>>>) {
        let received = Rc::new(RefCell::new(Vec::new()));
        let driver = ProtocolDriver::new(
            RecordingTransport::default(),
            ManualClock::new(Instant::now()),
            Collector(received.clone()),
        );
        (driver, received)
    }

    #[test]
    fn send_integer_writes_a_single_int_token_on_the_wire() {
        let mut driver = driver();
        driver.connection_made();
        driver.send(Value::from(42i64)).unwrap();
        assert_eq!(driver.transport.written, vec![42, TokenKind::Int.as_u8()]);
    }

    #[test]
    fn data_received_reassembles_a_token_split_across_two_chunks() {
        let (mut driver, received) = driver_with_observer();
        driver.connection_made();
        let mut wire = BytesMut::new();
        RawToken::header_only(5, TokenKind::Int).encode_into(&mut wire);
        driver.data_received(&wire[..1]).unwrap();
        driver.data_received(&wire[1..]).unwrap();
        assert_eq!(*received.borrow(), vec![Value::from(5i64)]);
    }

    #[test]
    fn ping_receipt_triggers_an_immediate_pong() {
        let mut driver = driver();
        driver.connection_made();
        let mut wire = BytesMut::new();
        RawToken::header_only(3, TokenKind::Ping).encode_into(&mut wire);
        driver.data_received(&wire).unwrap();
        assert_eq!(driver.transport.written, vec![3, TokenKind::Pong.as_u8()]);
    }

    #[test]
    fn poll_timers_sends_a_ping_after_the_keepalive_interval_elapses() {
        let mut driver = driver();
        driver.connection_made();
        driver.set_timers(Duration::from_secs(10), Duration::from_secs(1000));
        driver.scheduler.advance(Duration::from_secs(11));
        let dead = driver.poll_timers().unwrap();
        assert!(!dead);
        assert_eq!(driver.transport.written[1], TokenKind::Ping.as_u8());
    }

    #[test]
    fn poll_timers_closes_the_connection_past_the_disconnect_timeout() {
        let mut driver = driver();
        driver.connection_made();
        driver.set_timers(Duration::from_secs(10), Duration::from_secs(60));
        driver.scheduler.advance(Duration::from_secs(61));
        let dead = driver.poll_timers().unwrap();
        assert!(dead);
        assert!(driver.transport.lost);
    }
}
