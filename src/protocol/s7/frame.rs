/// S7comm PDU construction and parsing over ISO-on-TCP (RFC 1006).
///
/// Only the subset the chamber backend needs is implemented: COTP
/// connection setup with configurable TSAPs, S7 communication setup
/// (PDU-length negotiation), and single-item ReadVar/WriteVar. Every
/// transaction reads or writes a whole byte range; bit extraction happens
/// in the codec layer, never on the wire.
use crate::protocol::error::PlcError;

/// TPKT header length (RFC 1006).
pub const TPKT_HEADER_LEN: usize = 4;
/// COTP data TPDU header: length indicator, DT code, EOT flag.
const COTP_DT: [u8; 3] = [0x02, 0xF0, 0x80];

const S7_PROTOCOL_ID: u8 = 0x32;
const ROSCTR_JOB: u8 = 0x01;
const ROSCTR_ACK_DATA: u8 = 0x03;

const FUNC_SETUP: u8 = 0xF0;
const FUNC_READ_VAR: u8 = 0x04;
const FUNC_WRITE_VAR: u8 = 0x05;

/// Transport size used in request items: untyped byte access.
const TRANSPORT_SIZE_BYTE: u8 = 0x02;
/// Transport size used in write data: bit-counted byte/word/dword payload.
const DATA_TRANSPORT_BYTE_WORD: u8 = 0x04;

const RET_SUCCESS: u8 = 0xFF;

/// PDU length requested during communication setup.
const REQUESTED_PDU_LEN: u16 = 480;

fn tpkt_wrap(body: &[u8]) -> Vec<u8> {
    let total = (TPKT_HEADER_LEN + body.len()) as u16;
    let mut frame = Vec::with_capacity(total as usize);
    frame.extend_from_slice(&[0x03, 0x00]);
    frame.extend_from_slice(&total.to_be_bytes());
    frame.extend_from_slice(body);
    frame
}

/// COTP connection request carrying the local and remote TSAP identifiers.
pub fn build_connection_request(local_tsap: u16, remote_tsap: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(18);
    body.push(0x11); // length indicator: 17 bytes follow
    body.push(0xE0); // CR TPDU
    body.extend_from_slice(&[0x00, 0x00]); // destination reference
    body.extend_from_slice(&[0x00, 0x01]); // source reference
    body.push(0x00); // class 0
    body.extend_from_slice(&[0xC0, 0x01, 0x0A]); // TPDU size: 1024
    body.push(0xC1);
    body.push(0x02);
    body.extend_from_slice(&local_tsap.to_be_bytes());
    body.push(0xC2);
    body.push(0x02);
    body.extend_from_slice(&remote_tsap.to_be_bytes());
    tpkt_wrap(&body)
}

/// Check a COTP connect confirm (payload excludes the TPKT header).
pub fn parse_connect_confirm(payload: &[u8]) -> Result<(), PlcError> {
    if payload.len() < 2 || payload[1] != 0xD0 {
        return Err(PlcError::transport(format!(
            "connection refused: expected COTP CC, got {:02X?}",
            payload.get(1)
        )));
    }
    Ok(())
}

fn s7_header(rosctr: u8, pdu_ref: u16, param_len: u16, data_len: u16) -> Vec<u8> {
    let mut header = Vec::with_capacity(10);
    header.push(S7_PROTOCOL_ID);
    header.push(rosctr);
    header.extend_from_slice(&[0x00, 0x00]); // reserved
    header.extend_from_slice(&pdu_ref.to_be_bytes());
    header.extend_from_slice(&param_len.to_be_bytes());
    header.extend_from_slice(&data_len.to_be_bytes());
    header
}

/// S7 communication setup request (negotiates the PDU length).
pub fn build_setup_request(pdu_ref: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(21);
    body.extend_from_slice(&COTP_DT);
    body.extend_from_slice(&s7_header(ROSCTR_JOB, pdu_ref, 8, 0));
    body.push(FUNC_SETUP);
    body.push(0x00);
    body.extend_from_slice(&1u16.to_be_bytes()); // max AMQ calling
    body.extend_from_slice(&1u16.to_be_bytes()); // max AMQ called
    body.extend_from_slice(&REQUESTED_PDU_LEN.to_be_bytes());
    tpkt_wrap(&body)
}

/// Extract the negotiated PDU length from a setup response payload.
pub fn parse_setup_response(payload: &[u8]) -> Result<u16, PlcError> {
    let params = ack_params(payload)?;
    if params.first() != Some(&FUNC_SETUP) || params.len() < 8 {
        return Err(PlcError::transport("malformed communication setup response"));
    }
    Ok(u16::from_be_bytes([params[6], params[7]]))
}

/// Request item addressing a contiguous byte range in one memory area.
fn build_item(area_code: u8, db_number: u16, byte_offset: u32, len: usize) -> Vec<u8> {
    let mut item = Vec::with_capacity(12);
    item.push(0x12); // variable specification
    item.push(0x0A); // remaining item length
    item.push(0x10); // syntax id: S7-Any
    item.push(TRANSPORT_SIZE_BYTE);
    item.extend_from_slice(&(len as u16).to_be_bytes());
    item.extend_from_slice(&db_number.to_be_bytes());
    item.push(area_code);
    // 3-byte bit address: byte offset shifted past the bit position.
    let bit_address = byte_offset << 3;
    item.extend_from_slice(&bit_address.to_be_bytes()[1..4]);
    item
}

/// Single-item ReadVar request for `len` bytes.
pub fn build_read_request(
    pdu_ref: u16,
    area_code: u8,
    db_number: u16,
    byte_offset: u32,
    len: usize,
) -> Vec<u8> {
    let item = build_item(area_code, db_number, byte_offset, len);
    let mut body = Vec::with_capacity(3 + 10 + 2 + item.len());
    body.extend_from_slice(&COTP_DT);
    body.extend_from_slice(&s7_header(ROSCTR_JOB, pdu_ref, (2 + item.len()) as u16, 0));
    body.push(FUNC_READ_VAR);
    body.push(0x01); // item count
    body.extend_from_slice(&item);
    tpkt_wrap(&body)
}

/// Single-item WriteVar request carrying `data` back to the same byte range.
pub fn build_write_request(
    pdu_ref: u16,
    area_code: u8,
    db_number: u16,
    byte_offset: u32,
    data: &[u8],
) -> Vec<u8> {
    let item = build_item(area_code, db_number, byte_offset, data.len());
    let data_len = (4 + data.len()) as u16;
    let mut body = Vec::with_capacity(3 + 10 + 2 + item.len() + data_len as usize);
    body.extend_from_slice(&COTP_DT);
    body.extend_from_slice(&s7_header(
        ROSCTR_JOB,
        pdu_ref,
        (2 + item.len()) as u16,
        data_len,
    ));
    body.push(FUNC_WRITE_VAR);
    body.push(0x01);
    body.extend_from_slice(&item);
    // Data item header: reserved, transport size, length in bits.
    body.push(0x00);
    body.push(DATA_TRANSPORT_BYTE_WORD);
    body.extend_from_slice(&((data.len() * 8) as u16).to_be_bytes());
    body.extend_from_slice(data);
    tpkt_wrap(&body)
}

/// Validate the COTP + S7 ack headers and return the parameter slice
/// (function code onward). Data, if any, follows the parameters.
fn ack_params(payload: &[u8]) -> Result<&[u8], PlcError> {
    if payload.len() < 15 || payload[1] != 0xF0 {
        return Err(PlcError::transport("truncated or non-data TPDU"));
    }
    let s7 = &payload[3..];
    if s7[0] != S7_PROTOCOL_ID || s7[1] != ROSCTR_ACK_DATA {
        return Err(PlcError::transport(format!(
            "unexpected S7 PDU type 0x{:02X}",
            s7[1]
        )));
    }
    let error_class = s7[10];
    let error_code = s7[11];
    if error_class != 0 || error_code != 0 {
        return Err(PlcError::transport(format!(
            "device rejected request: error class 0x{error_class:02X}, code 0x{error_code:02X}"
        )));
    }
    Ok(&s7[12..])
}

fn describe_return_code(code: u8) -> &'static str {
    match code {
        0x03 => "invalid size",
        0x05 => "address out of range",
        0x06 => "data type not supported",
        0x07 => "data type inconsistent",
        0x0A => "object does not exist",
        _ => "unknown return code",
    }
}

/// Extract the data bytes of a single-item ReadVar response.
pub fn parse_read_response(payload: &[u8], expected_len: usize) -> Result<Vec<u8>, PlcError> {
    let params = ack_params(payload)?;
    if params.len() < 2 || params[0] != FUNC_READ_VAR {
        return Err(PlcError::transport("malformed ReadVar response"));
    }
    let data = &params[2..];
    if data.len() < 4 {
        return Err(PlcError::transport("ReadVar response missing data item"));
    }
    if data[0] != RET_SUCCESS {
        return Err(PlcError::transport(format!(
            "read rejected: {} (0x{:02X})",
            describe_return_code(data[0]),
            data[0]
        )));
    }
    // Length field counts bits for byte/word transport sizes.
    let bit_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    let byte_len = bit_len / 8;
    let bytes = &data[4..];
    if byte_len != expected_len || bytes.len() < byte_len {
        return Err(PlcError::transport(format!(
            "short read: expected {expected_len} bytes, device returned {byte_len}"
        )));
    }
    Ok(bytes[..byte_len].to_vec())
}

/// Check the per-item return code of a WriteVar response.
pub fn parse_write_response(payload: &[u8]) -> Result<(), PlcError> {
    let params = ack_params(payload)?;
    if params.len() < 2 || params[0] != FUNC_WRITE_VAR {
        return Err(PlcError::transport("malformed WriteVar response"));
    }
    let data = &params[2..];
    match data.first() {
        Some(&RET_SUCCESS) => Ok(()),
        Some(&code) => Err(PlcError::transport(format!(
            "write rejected: {} (0x{code:02X})",
            describe_return_code(code)
        ))),
        None => Err(PlcError::transport("WriteVar response missing return code")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_request_layout() {
        let frame = build_connection_request(0x0100, 0x0200);
        assert_eq!(&frame[..4], &[0x03, 0x00, 0x00, 0x16]);
        assert_eq!(frame[5], 0xE0);
        // Local TSAP under parameter 0xC1, remote under 0xC2.
        assert_eq!(&frame[14..18], &[0xC1, 0x02, 0x01, 0x00]);
        assert_eq!(&frame[18..22], &[0xC2, 0x02, 0x02, 0x00]);
    }

    #[test]
    fn read_request_addresses_in_bits() {
        let frame = build_read_request(7, 0x84, 1, 100, 4);
        let body = &frame[4..];
        assert_eq!(&body[..3], &[0x02, 0xF0, 0x80]);
        assert_eq!(body[3], 0x32);
        assert_eq!(body[4], 0x01); // job
        assert_eq!(body[13], FUNC_READ_VAR);
        assert_eq!(body[14], 1);
        // length = 4 bytes, db = 1, area = 0x84, address = 100 * 8 = 800
        assert_eq!(
            &body[15..],
            &[0x12, 0x0A, 0x10, 0x02, 0x00, 0x04, 0x00, 0x01, 0x84, 0x00, 0x03, 0x20]
        );
    }

    #[test]
    fn write_request_carries_bit_counted_payload() {
        let frame = build_write_request(1, 0x83, 0, 1, &[0xAB]);
        let body = &frame[4..];
        // Data length: 4-byte item header + 1 data byte.
        assert_eq!(&body[11..13], &[0x00, 0x05]);
        let tail = &body[body.len() - 5..];
        assert_eq!(tail, &[0x00, 0x04, 0x00, 0x08, 0xAB]);
    }

    fn ack_frame(params_and_data: &[u8]) -> Vec<u8> {
        let mut payload = vec![0x02, 0xF0, 0x80, 0x32, 0x03, 0x00, 0x00, 0x00, 0x01];
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // param/data lengths (unchecked)
        payload.extend_from_slice(&[0x00, 0x00]); // error class + code
        payload.extend_from_slice(params_and_data);
        payload
    }

    #[test]
    fn read_response_happy_path() {
        let payload = ack_frame(&[0x04, 0x01, 0xFF, 0x04, 0x00, 0x20, 0xDE, 0xAD, 0xBE, 0xEF]);
        let data = parse_read_response(&payload, 4).unwrap();
        assert_eq!(data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn read_response_surfaces_device_return_code() {
        let payload = ack_frame(&[0x04, 0x01, 0x0A, 0x00, 0x00, 0x00]);
        let err = parse_read_response(&payload, 1).unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("object does not exist"));
    }

    #[test]
    fn header_error_class_is_a_transport_error() {
        let mut payload = ack_frame(&[0x04, 0x01]);
        payload[13] = 0x81; // error class
        assert!(parse_read_response(&payload, 1).unwrap_err().is_transport());
    }

    #[test]
    fn write_response_return_codes() {
        assert!(parse_write_response(&ack_frame(&[0x05, 0x01, 0xFF])).is_ok());
        let err = parse_write_response(&ack_frame(&[0x05, 0x01, 0x05])).unwrap_err();
        assert!(err.to_string().contains("address out of range"));
    }
}
