/// Session API for typed memory access against the controller.
///
/// `PlcSession` owns one live transport and the single mutual-exclusion
/// lock that totally orders all read/write transactions issued by this
/// process. Consumers (command handlers, monitoring loops) share one
/// session instance; the session itself is stateless apart from the
/// connection handle.
pub mod poll;

use parking_lot::Mutex;
use std::time::Duration;

use crate::core::{ConnectOptions, Value};
use crate::protocol::address::{resolve, ResolvedAddress, ValueKind};
use crate::protocol::s7::TcpTransport;
use crate::protocol::{codec, PlcError, Transport};

/// Fixed pause after each device write, before the lock is released, so the
/// controller can latch the value within its refresh cycle.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

pub struct PlcSession {
    transport: Mutex<Box<dyn Transport>>,
}

impl PlcSession {
    /// Establish the process-wide session.
    ///
    /// Never fails for the constructing caller: if the transport cannot be
    /// brought up the session is returned flagged not-connected and a
    /// warning is logged. Transactions on it fail individually until the
    /// lifecycle layer rebuilds the session.
    pub fn connect(opts: &ConnectOptions) -> Self {
        log::info!(
            "connecting to controller at {}:{} (local TSAP 0x{:04X}, remote TSAP 0x{:04X})",
            opts.host,
            opts.port,
            opts.local_tsap,
            opts.remote_tsap
        );
        match TcpTransport::connect(opts) {
            Ok(transport) => Self::with_transport(Box::new(transport)),
            Err(err) => {
                log::warn!(
                    "connection to {}:{} failed: {err}; session starts disconnected",
                    opts.host,
                    opts.port
                );
                Self::with_transport(Box::new(TcpTransport::disconnected(opts)))
            }
        }
    }

    /// Build a session over an injected transport (simulation, tests).
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Mutex::new(transport),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.lock().is_connected()
    }

    /// Read the decoded value at a symbolic address.
    pub fn read(&self, address: &str) -> Result<Value, PlcError> {
        let resolved = self.resolve_logged(address)?;
        let data = self.read_resolved(&resolved).map_err(|err| {
            log::error!("failed to read {address}: {err}");
            err
        })?;

        match resolved.kind {
            ValueKind::Bit => Ok(Value::Bool(codec::get_bit(&data, resolved.bit_offset)?)),
            ValueKind::Byte | ValueKind::Word => Ok(Value::Int(codec::get_int(&data)?)),
            ValueKind::Real => Ok(Value::Real(codec::get_real(&data)?)),
            ValueKind::DWord => Ok(Value::DWord(codec::get_dword(&data)?)),
        }
    }

    /// Read the raw byte range at a symbolic address.
    ///
    /// Used internally by [`PlcSession::write`] for read-modify-write and
    /// exposed for diagnostic passthrough.
    pub fn read_raw(&self, address: &str) -> Result<Vec<u8>, PlcError> {
        let resolved = self.resolve_logged(address)?;
        self.read_resolved(&resolved).map_err(|err| {
            log::error!("failed to read {address}: {err}");
            err
        })
    }

    /// Write a value to a symbolic address.
    ///
    /// The current byte range is read first so that bit-level and sub-word
    /// writes do not disturb neighboring bits within the same addressable
    /// unit; the mutated buffer is then written back under the lock with
    /// the settling delay held before release. The read and the write each
    /// take the lock once; no foreign in-process access can interleave with
    /// either device call, though the pair itself is not atomic against a
    /// second process sharing the device (accepted limitation).
    pub fn write(&self, address: &str, value: Value) -> Result<(), PlcError> {
        let resolved = self.resolve_logged(address)?;
        let mut data = self.read_resolved(&resolved).map_err(|err| {
            log::error!("failed to write {value} to {address}: {err}");
            err
        })?;

        match (resolved.kind, value) {
            (ValueKind::Bit, Value::Bool(v)) => codec::set_bit(&mut data, resolved.bit_offset, v)?,
            (ValueKind::Byte | ValueKind::Word, Value::Int(v)) => codec::set_int(&mut data, v)?,
            (ValueKind::Real, Value::Real(v)) => codec::set_real(&mut data, v)?,
            (ValueKind::DWord, Value::DWord(v)) => codec::set_dword(&mut data, v)?,
            (expected, _) => {
                let err = PlcError::ValueMismatch {
                    address: address.to_string(),
                    expected,
                };
                log::error!("{err}");
                return Err(err);
            }
        }

        let mut transport = self.transport.lock();
        let result = transport.write_area(
            resolved.area,
            resolved.db_number,
            resolved.byte_offset,
            &data,
        );
        if result.is_ok() {
            // Settle before releasing the lock so the next transaction sees
            // the device's post-refresh state.
            std::thread::sleep(SETTLE_DELAY);
        }
        drop(transport);

        result.map_err(|err| {
            log::error!("failed to write {value} to {address}: {err}");
            err
        })
    }

    /// Release the transport session. Idempotent; failures are surfaced,
    /// not retried.
    pub fn disconnect(&self) -> Result<(), PlcError> {
        log::info!("disconnecting from controller");
        match self.transport.lock().disconnect() {
            Ok(()) => {
                log::info!("disconnected");
                Ok(())
            }
            Err(err) => {
                log::error!("error during disconnect: {err}");
                Err(err)
            }
        }
    }

    fn resolve_logged(&self, address: &str) -> Result<ResolvedAddress, PlcError> {
        resolve(address).map_err(|err| {
            log::error!("address classification failed for '{address}'");
            err
        })
    }

    /// One area-qualified read of exactly `width` bytes, under the lock.
    fn read_resolved(&self, resolved: &ResolvedAddress) -> Result<Vec<u8>, PlcError> {
        let mut transport = self.transport.lock();
        transport.read_area(
            resolved.area,
            resolved.db_number,
            resolved.byte_offset,
            resolved.kind.width(),
        )
    }
}
