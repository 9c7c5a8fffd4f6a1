//! End-to-end test of the in-band scheduled vocabulary addition: a driver
//! schedules an add, the marker compound travels the wire, and the peer's
//! incoming table is updated without the control message ever reaching its
//! `ProtocolObserver`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use banana::driver::ProtocolDriver;
use banana::scheduler::ManualClock;
use banana::transport::Transport;
use banana::unslicer::ProtocolObserver;
use banana::value::Value;

#[derive(Debug, Default)]
struct Recorder(Rc<RefCell<Vec<Value>>>);
impl ProtocolObserver for Recorder {
    fn received_object(&mut self, value: Value) {
        self.0.borrow_mut().push(value);
    }
}

#[derive(Debug, Default)]
struct Loopback(Rc<RefCell<Vec<u8>>>);
impl Transport for Loopback {
    fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.0.borrow_mut().extend_from_slice(data);
        Ok(())
    }
    fn lose_connection(&mut self) {}
}

#[test]
fn scheduled_addition_updates_the_peers_incoming_table_without_surfacing_an_object() {
    let outbox = Rc::new(RefCell::new(Vec::new()));
    let received = Rc::new(RefCell::new(Vec::new()));

    let mut sender = ProtocolDriver::new(Loopback(outbox.clone()), ManualClock::new(Instant::now()), Recorder::default());
    sender.connection_made();
    sender.schedule_vocab_add(b"widget".to_vec()).unwrap();

    let mut receiver = ProtocolDriver::new(Loopback::default(), ManualClock::new(Instant::now()), Recorder(received.clone()));
    receiver.connection_made();
    receiver.data_received(&outbox.borrow()[..]).unwrap();

    assert!(received.borrow().is_empty(), "a control message must never reach the observer");
    assert_eq!(receiver.vocab().incoming_value(0), Some(&b"widget"[..]));
}

#[test]
fn scheduling_the_same_addition_twice_before_it_reaches_the_wire_sends_only_one_marker() {
    let outbox = Rc::new(RefCell::new(Vec::new()));
    let mut sender = ProtocolDriver::new(Loopback(outbox.clone()), ManualClock::new(Instant::now()), Recorder::default());
    sender.connection_made();

    sender.schedule_vocab_add(b"gadget".to_vec()).unwrap();
    let after_first = outbox.borrow().len();
    sender.schedule_vocab_add(b"gadget".to_vec()).unwrap();
    let after_second = outbox.borrow().len();

    assert_eq!(after_first, after_second, "a duplicate schedule before flush must not put a second marker on the wire");
}

#[test]
fn after_the_addition_commits_a_subsequent_string_send_is_substituted_with_its_index() {
    let outbox = Rc::new(RefCell::new(Vec::new()));
    let received = Rc::new(RefCell::new(Vec::new()));

    let mut sender = ProtocolDriver::new(Loopback(outbox.clone()), ManualClock::new(Instant::now()), Recorder::default());
    sender.connection_made();
    sender.schedule_vocab_add(b"widget".to_vec()).unwrap();
    sender.send(Value::string("widget")).unwrap();

    let mut receiver = ProtocolDriver::new(Loopback::default(), ManualClock::new(Instant::now()), Recorder(received.clone()));
    receiver.connection_made();
    receiver.data_received(&outbox.borrow()[..]).unwrap();

    assert_eq!(received.borrow().as_slice(), [Value::string("widget")]);
}
