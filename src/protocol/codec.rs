/// Typed accessors over the raw byte buffers exchanged with the device.
///
/// All multi-byte values are big-endian, matching the controller's memory
/// convention. Buffers are exactly as wide as the addressable unit (1, 2 or
/// 4 bytes); a length mismatch is an invariant violation, not an expected
/// runtime condition.
use crate::protocol::error::PlcError;

fn ensure_len(buf: &[u8], expected: usize) -> Result<(), PlcError> {
    if buf.len() == expected {
        Ok(())
    } else {
        Err(PlcError::DecodeInvariant {
            expected,
            actual: buf.len(),
        })
    }
}

/// Extract a single bit from byte 0 of the buffer.
pub fn get_bit(buf: &[u8], bit: u8) -> Result<bool, PlcError> {
    ensure_len(buf, 1)?;
    Ok(buf[0] & (1 << bit) != 0)
}

/// Set or clear a single bit in byte 0, leaving the other bits untouched.
pub fn set_bit(buf: &mut [u8], bit: u8, value: bool) -> Result<(), PlcError> {
    ensure_len(buf, 1)?;
    if value {
        buf[0] |= 1 << bit;
    } else {
        buf[0] &= !(1 << bit);
    }
    Ok(())
}

/// Decode a 16-bit signed integer. One-byte buffers (byte access) decode as
/// the unsigned byte value.
pub fn get_int(buf: &[u8]) -> Result<i16, PlcError> {
    match buf.len() {
        1 => Ok(buf[0] as i16),
        2 => Ok(i16::from_be_bytes([buf[0], buf[1]])),
        actual => Err(PlcError::DecodeInvariant { expected: 2, actual }),
    }
}

/// Encode a 16-bit signed integer. One-byte buffers take the low byte.
pub fn set_int(buf: &mut [u8], value: i16) -> Result<(), PlcError> {
    match buf.len() {
        1 => {
            buf[0] = (value & 0xFF) as u8;
            Ok(())
        }
        2 => {
            buf.copy_from_slice(&value.to_be_bytes());
            Ok(())
        }
        actual => Err(PlcError::DecodeInvariant { expected: 2, actual }),
    }
}

/// Decode an IEEE-754 32-bit float.
pub fn get_real(buf: &[u8]) -> Result<f32, PlcError> {
    ensure_len(buf, 4)?;
    Ok(f32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Encode an IEEE-754 32-bit float.
pub fn set_real(buf: &mut [u8], value: f32) -> Result<(), PlcError> {
    ensure_len(buf, 4)?;
    buf.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Decode an unsigned 32-bit word.
pub fn get_dword(buf: &[u8]) -> Result<u32, PlcError> {
    ensure_len(buf, 4)?;
    Ok(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Encode an unsigned 32-bit word.
pub fn set_dword(buf: &mut [u8], value: u32) -> Result<(), PlcError> {
    ensure_len(buf, 4)?;
    buf.copy_from_slice(&value.to_be_bytes());
    Ok(())
}
