/// Abstract device transport - the seam between the session API and the
/// wire protocol.
///
/// The production implementation is [`crate::protocol::s7::TcpTransport`];
/// [`crate::protocol::mock::MockTransport`] backs tests and offline
/// simulation. Implementations perform no retry and no reconnection; every
/// failure surfaces to the caller as [`PlcError::Transport`].
use crate::protocol::{address::Area, error::PlcError};

pub trait Transport: Send {
    /// Read exactly `len` bytes from the given area at `byte_offset`.
    fn read_area(
        &mut self,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        len: usize,
    ) -> Result<Vec<u8>, PlcError>;

    /// Write `data` back to the given area at `byte_offset`.
    fn write_area(
        &mut self,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        data: &[u8],
    ) -> Result<(), PlcError>;

    /// Release the transport session. Idempotent.
    fn disconnect(&mut self) -> Result<(), PlcError>;

    /// Observed connection state; operations on a disconnected transport
    /// are not blocked up front, they simply fail.
    fn is_connected(&self) -> bool;
}
