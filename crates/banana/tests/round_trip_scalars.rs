//! End-to-end scalar round trips through a full `ProtocolDriver` pair:
//! encode with one driver's send side, decode with another's receive side.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use banana::driver::ProtocolDriver;
use banana::scheduler::ManualClock;
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
struct LoopbackTransport {
    outbox: Rc<RefCell<Vec<u8>>>,
}

impl banana::transport::Transport for LoopbackTransport {
    fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.outbox.borrow_mut().extend_from_slice(data);
        Ok(())
    }

    fn lose_connection(&mut self) {}
}

fn round_trip(value: Value) -> Value {
    let outbox = Rc::new(RefCell::new(Vec::new()));
    let received = Rc::new(RefCell::new(Vec::new()));

    let mut sender = ProtocolDriver::new(
        LoopbackTransport {
            outbox: outbox.clone(),
        },
        ManualClock::new(Instant::now()),
        Recorder::default(),
    );
    sender.connection_made();
    sender.send(value).unwrap();

    let mut receiver = ProtocolDriver::new(
        LoopbackTransport::default(),
        ManualClock::new(Instant::now()),
        Recorder(received.clone()),
    );
    receiver.connection_made();
    receiver.data_received(&outbox.borrow()[..]).unwrap();

    received.borrow().first().cloned().expect("one object should have been decoded")
}

#[test]
fn small_positive_integer_round_trips() {
    assert_eq!(round_trip(Value::from(42i64)), Value::from(42i64));
}

#[test]
fn small_negative_integer_round_trips() {
    assert_eq!(round_trip(Value::from(-42i64)), Value::from(-42i64));
}

#[test]
fn integer_past_the_2_31_boundary_round_trips_as_longint() {
    let big = Value::integer(1i64 << 40);
    assert_eq!(round_trip(big.clone()), big);
}

#[test]
fn float_round_trips_exactly() {
    assert_eq!(
        round_trip(Value::from(std::f64::consts::PI)),
        Value::from(std::f64::consts::PI)
    );
}

#[test]
fn string_round_trips() {
    assert_eq!(round_trip(Value::string("hello, banana")), Value::string("hello, banana"));
}

#[test]
fn nested_list_round_trips() {
    let nested = Value::List(vec![
        Value::from(1i64),
        Value::List(vec![Value::from(2i64), Value::string("three")]),
    ]);
    assert_eq!(round_trip(nested.clone()), nested);
}
