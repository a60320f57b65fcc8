/// End-to-end session behavior against the in-memory transport: transaction
/// shapes (read-before-write, call counts), codec round trips through the
/// full address path, lock discipline under concurrency, and the settling
/// delay.
use std::sync::Arc;
use std::time::{Duration, Instant};

use chamberlink::protocol::address::Area;
use chamberlink::protocol::mock::{MockOp, MockState, MockTransport};
use chamberlink::{PlcError, PlcSession, Value, SETTLE_DELAY};

fn session_with_mock() -> (PlcSession, MockState) {
    let mock = MockTransport::new();
    let state = mock.state();
    (PlcSession::with_transport(Box::new(mock)), state)
}

#[test]
fn bool_write_sets_single_bit_with_one_read_one_write() {
    let (session, state) = session_with_mock();
    state.seed(Area::Marker, 0, 0, &[0x00]);

    session.write("VX0.0", Value::Bool(true)).unwrap();

    assert_eq!(state.bytes(Area::Marker, 0, 0, 1), vec![0x01]);
    assert_eq!(state.read_count(), 1);
    assert_eq!(state.write_count(), 1);
}

#[test]
fn bit_write_preserves_neighboring_bits() {
    let (session, state) = session_with_mock();
    state.seed(Area::Marker, 0, 1, &[0b1010_0101]);

    session.write("M1.1", Value::Bool(true)).unwrap();
    assert_eq!(state.bytes(Area::Marker, 0, 1, 1), vec![0b1010_0111]);

    session.write("M1.0", Value::Bool(false)).unwrap();
    assert_eq!(state.bytes(Area::Marker, 0, 1, 1), vec![0b1010_0110]);

    assert_eq!(session.read("M1.2").unwrap(), Value::Bool(true));
    assert_eq!(session.read("M1.3").unwrap(), Value::Bool(false));
}

#[test]
fn legacy_float_alias_round_trips_through_data_block_one() {
    let (session, state) = session_with_mock();

    session.write("VD100", Value::Real(3.14159)).unwrap();

    // The alias targets DB1.DBD100; the encoding is IEEE-754 big-endian.
    assert_eq!(
        state.bytes(Area::DataBlock, 1, 100, 4),
        vec![0x40, 0x49, 0x0F, 0xD0]
    );
    assert_eq!(session.read("VD100").unwrap(), Value::Real(3.14159));
    assert_eq!(session.read("DB1.DBD100").unwrap(), Value::Real(3.14159));
}

#[test]
fn word_and_dword_round_trips() {
    let (session, state) = session_with_mock();

    session.write("VW20", Value::Int(-1234)).unwrap();
    assert_eq!(session.read("DB1.DBW20").unwrap(), Value::Int(-1234));

    session.write("MD8", Value::DWord(0xDEAD_BEEF)).unwrap();
    assert_eq!(session.read("MD8").unwrap(), Value::DWord(0xDEAD_BEEF));
    assert_eq!(
        state.bytes(Area::Marker, 0, 8, 4),
        vec![0xDE, 0xAD, 0xBE, 0xEF]
    );
}

#[test]
fn byte_access_round_trip() {
    let (session, state) = session_with_mock();
    state.seed(Area::DataBlock, 1, 5, &[0x00]);

    session.write("DB1.DBB5", Value::Int(0x7F)).unwrap();
    assert_eq!(state.bytes(Area::DataBlock, 1, 5, 1), vec![0x7F]);
    assert_eq!(session.read("DB1.DBB5").unwrap(), Value::Int(0x7F));
}

#[test]
fn reads_issue_one_area_qualified_transaction() {
    let (session, state) = session_with_mock();
    state.seed(Area::DataBlock, 1, 504, &42.5f32.to_be_bytes());

    assert_eq!(session.read("VD504").unwrap(), Value::Real(42.5));
    assert_eq!(
        state.journal(),
        vec![MockOp::Read {
            area: Area::DataBlock,
            db_number: 1,
            byte_offset: 504,
            len: 4,
        }]
    );
}

#[test]
fn raw_reads_return_the_unmodified_buffer() {
    let (session, state) = session_with_mock();
    state.seed(Area::ProcessInput, 0, 2, &[0x12, 0x34]);

    assert_eq!(session.read_raw("AIW2").unwrap(), vec![0x12, 0x34]);
    assert_eq!(session.read("AIW2").unwrap(), Value::Int(0x1234));
}

#[test]
fn unknown_addresses_never_touch_the_transport() {
    let (session, state) = session_with_mock();

    for address in ["unknown", "xyz123"] {
        match session.read(address) {
            Err(PlcError::Classification { address: reported }) => {
                assert_eq!(reported, address);
            }
            other => panic!("expected classification error, got {other:?}"),
        }
        assert!(session.write(address, Value::Bool(true)).is_err());
    }

    assert!(state.journal().is_empty());
}

#[test]
fn mismatched_value_type_is_rejected_before_the_write_phase() {
    let (session, state) = session_with_mock();

    let err = session.write("VW20", Value::Bool(true)).unwrap_err();
    assert!(matches!(err, PlcError::ValueMismatch { .. }));
    // The read-before-write happened, but nothing was written back.
    assert_eq!(state.read_count(), 1);
    assert_eq!(state.write_count(), 0);
}

#[test]
fn transport_failures_propagate_without_retry() {
    let (session, state) = session_with_mock();
    state.fail_with("connection timed out");

    let err = session.read("VD100").unwrap_err();
    assert!(err.is_transport());
    assert!(state.journal().is_empty());
}

#[test]
fn concurrent_writers_never_interleave_device_calls() {
    let mock = MockTransport::new().with_op_delay(Duration::from_millis(2));
    let state = mock.state();
    let session = Arc::new(PlcSession::with_transport(Box::new(mock)));

    // Each writer owns its own byte, so the final memory contents are
    // deterministic even though the read-modify-write pairs of different
    // writers may interleave.
    let handles: Vec<_> = (0..4u32)
        .map(|byte| {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                for bit in 0..4u8 {
                    session
                        .write(&format!("MX{byte}.{bit}"), Value::Bool(true))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(!state.overlap_detected(), "device I/O overlapped");
    assert_eq!(state.bytes(Area::Marker, 0, 0, 4), vec![0x0F; 4]);
    assert_eq!(state.read_count(), 16);
    assert_eq!(state.write_count(), 16);
}

#[test]
fn writes_hold_the_settling_delay() {
    let (session, state) = session_with_mock();
    state.seed(Area::Marker, 0, 0, &[0x00]);

    let started = Instant::now();
    session.write("VX0.0", Value::Bool(true)).unwrap();
    assert!(started.elapsed() >= SETTLE_DELAY);
}

#[test]
fn disconnect_is_idempotent_and_later_transactions_fail() {
    let (session, _state) = session_with_mock();

    assert!(session.is_connected());
    session.disconnect().unwrap();
    session.disconnect().unwrap();
    assert!(!session.is_connected());

    let err = session.read("VD100").unwrap_err();
    assert!(err.is_transport());
}
