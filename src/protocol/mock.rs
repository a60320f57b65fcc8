/// In-memory transport used for offline simulation and tests.
///
/// Memory is a byte vector per (area, db) pair that grows on demand, so a
/// fresh mock reads as all zeroes. Every device call is journaled, and an
/// in-flight flag catches overlapping I/O from concurrent callers - the
/// session lock must make overlap impossible, and tests assert that it does.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::protocol::{address::Area, error::PlcError, transport::Transport};

/// One device call as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOp {
    Read {
        area: Area,
        db_number: u16,
        byte_offset: u32,
        len: usize,
    },
    Write {
        area: Area,
        db_number: u16,
        byte_offset: u32,
        data: Vec<u8>,
    },
}

#[derive(Default)]
struct MockInner {
    memory: HashMap<(Area, u16), Vec<u8>>,
    journal: Vec<MockOp>,
    in_flight: bool,
    overlap_detected: bool,
    fail_with: Option<String>,
}

/// Shared handle to the mock's state, kept by tests after the transport
/// itself is boxed into a session.
#[derive(Clone, Default)]
pub struct MockState(Arc<Mutex<MockInner>>);

impl MockState {
    /// Pre-load bytes at an offset, growing the area as needed.
    pub fn seed(&self, area: Area, db_number: u16, byte_offset: u32, bytes: &[u8]) {
        let mut inner = self.0.lock();
        let slot = inner.memory.entry((area, db_number)).or_default();
        let end = byte_offset as usize + bytes.len();
        if slot.len() < end {
            slot.resize(end, 0);
        }
        slot[byte_offset as usize..end].copy_from_slice(bytes);
    }

    /// Current bytes at an offset (zero-filled if never written).
    pub fn bytes(&self, area: Area, db_number: u16, byte_offset: u32, len: usize) -> Vec<u8> {
        let mut inner = self.0.lock();
        let slot = inner.memory.entry((area, db_number)).or_default();
        let end = byte_offset as usize + len;
        if slot.len() < end {
            slot.resize(end, 0);
        }
        slot[byte_offset as usize..end].to_vec()
    }

    pub fn journal(&self) -> Vec<MockOp> {
        self.0.lock().journal.clone()
    }

    pub fn read_count(&self) -> usize {
        self.0
            .lock()
            .journal
            .iter()
            .filter(|op| matches!(op, MockOp::Read { .. }))
            .count()
    }

    pub fn write_count(&self) -> usize {
        self.0
            .lock()
            .journal
            .iter()
            .filter(|op| matches!(op, MockOp::Write { .. }))
            .count()
    }

    /// True if two device calls ever overlapped in time.
    pub fn overlap_detected(&self) -> bool {
        self.0.lock().overlap_detected
    }

    /// Make every subsequent device call fail with a transport error.
    pub fn fail_with(&self, message: &str) {
        self.0.lock().fail_with = Some(message.to_string());
    }
}

pub struct MockTransport {
    state: MockState,
    connected: bool,
    /// Artificial per-call latency, widening the race window the in-flight
    /// flag watches for.
    op_delay: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: MockState::default(),
            connected: true,
            op_delay: Duration::ZERO,
        }
    }

    pub fn with_op_delay(mut self, delay: Duration) -> Self {
        self.op_delay = delay;
        self
    }

    pub fn state(&self) -> MockState {
        self.state.clone()
    }

    fn enter(&self) -> Result<(), PlcError> {
        let mut inner = self.state.0.lock();
        if let Some(message) = inner.fail_with.clone() {
            return Err(PlcError::transport(message));
        }
        if !self.connected {
            return Err(PlcError::transport("mock transport disconnected"));
        }
        if inner.in_flight {
            inner.overlap_detected = true;
        }
        inner.in_flight = true;
        Ok(())
    }

    fn leave(&self) {
        self.state.0.lock().in_flight = false;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn read_area(
        &mut self,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        len: usize,
    ) -> Result<Vec<u8>, PlcError> {
        self.enter()?;
        if !self.op_delay.is_zero() {
            std::thread::sleep(self.op_delay);
        }
        let bytes = self.state.bytes(area, db_number, byte_offset, len);
        self.state.0.lock().journal.push(MockOp::Read {
            area,
            db_number,
            byte_offset,
            len,
        });
        self.leave();
        Ok(bytes)
    }

    fn write_area(
        &mut self,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        data: &[u8],
    ) -> Result<(), PlcError> {
        self.enter()?;
        if !self.op_delay.is_zero() {
            std::thread::sleep(self.op_delay);
        }
        self.state.seed(area, db_number, byte_offset, data);
        self.state.0.lock().journal.push(MockOp::Write {
            area,
            db_number,
            byte_offset,
            data: data.to_vec(),
        });
        self.leave();
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), PlcError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
