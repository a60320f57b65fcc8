/// ISO-on-TCP transport session to the controller.
///
/// One `TcpTransport` owns one TCP stream to port 102 (or whatever the
/// options say), performs the COTP connection handshake with the configured
/// TSAP pair and the S7 communication setup, and then serves ReadVar /
/// WriteVar exchanges. Timeouts are plain socket timeouts; there is no
/// internal retry and no reconnection - a dead session stays dead until the
/// lifecycle layer rebuilds it.
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::core::config::ConnectOptions;
use crate::protocol::address::Area;
use crate::protocol::error::PlcError;
use crate::protocol::s7::frame;
use crate::protocol::transport::Transport;

pub struct TcpTransport {
    stream: Option<TcpStream>,
    pdu_ref: u16,
    negotiated_pdu_len: u16,
    peer: String,
}

impl TcpTransport {
    /// Establish the session: TCP connect, COTP connection request with the
    /// local/remote TSAPs, S7 communication setup.
    pub fn connect(opts: &ConnectOptions) -> Result<Self, PlcError> {
        let peer = format!("{}:{}", opts.host, opts.port);
        let addr = peer
            .to_socket_addrs()
            .map_err(PlcError::from)?
            .next()
            .ok_or_else(|| PlcError::transport(format!("cannot resolve '{peer}'")))?;

        let timeout = Duration::from_millis(opts.timeout_ms);
        let mut stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let confirm = exchange(
            &mut stream,
            &frame::build_connection_request(opts.local_tsap, opts.remote_tsap),
        )?;
        frame::parse_connect_confirm(&confirm)?;

        let setup = exchange(&mut stream, &frame::build_setup_request(1))?;
        let negotiated_pdu_len = frame::parse_setup_response(&setup)?;
        log::info!("connected to {peer}, negotiated PDU length {negotiated_pdu_len}");

        Ok(Self {
            stream: Some(stream),
            pdu_ref: 1,
            negotiated_pdu_len,
            peer,
        })
    }

    /// A session shell that never connected. Construction of the process-wide
    /// session must not fail, so a failed connect degrades to this; every
    /// transaction on it returns a transport error.
    pub fn disconnected(opts: &ConnectOptions) -> Self {
        Self {
            stream: None,
            pdu_ref: 1,
            negotiated_pdu_len: 0,
            peer: format!("{}:{}", opts.host, opts.port),
        }
    }

    pub fn negotiated_pdu_len(&self) -> u16 {
        self.negotiated_pdu_len
    }

    fn next_ref(&mut self) -> u16 {
        self.pdu_ref = self.pdu_ref.wrapping_add(1);
        self.pdu_ref
    }

    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, PlcError> {
        let peer = self.peer.clone();
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| PlcError::transport(format!("not connected to {peer}")))?;
        exchange(stream, request)
    }
}

/// One request/response round trip: write the frame, then read a complete
/// TPKT-delimited reply.
fn exchange(stream: &mut TcpStream, request: &[u8]) -> Result<Vec<u8>, PlcError> {
    stream.write_all(request)?;
    stream.flush()?;

    let mut header = [0u8; frame::TPKT_HEADER_LEN];
    stream.read_exact(&mut header)?;
    if header[0] != 0x03 {
        return Err(PlcError::transport(format!(
            "bad TPKT version 0x{:02X}",
            header[0]
        )));
    }
    let total = u16::from_be_bytes([header[2], header[3]]) as usize;
    if total < frame::TPKT_HEADER_LEN {
        return Err(PlcError::transport("bad TPKT length"));
    }
    let mut payload = vec![0u8; total - frame::TPKT_HEADER_LEN];
    stream.read_exact(&mut payload)?;
    Ok(payload)
}

impl Transport for TcpTransport {
    fn read_area(
        &mut self,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        len: usize,
    ) -> Result<Vec<u8>, PlcError> {
        let pdu_ref = self.next_ref();
        let request = frame::build_read_request(pdu_ref, area.code(), db_number, byte_offset, len);
        let response = self.exchange(&request)?;
        frame::parse_read_response(&response, len)
    }

    fn write_area(
        &mut self,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        data: &[u8],
    ) -> Result<(), PlcError> {
        let pdu_ref = self.next_ref();
        let request =
            frame::build_write_request(pdu_ref, area.code(), db_number, byte_offset, data);
        let response = self.exchange(&request)?;
        frame::parse_write_response(&response)
    }

    fn disconnect(&mut self) -> Result<(), PlcError> {
        match self.stream.take() {
            Some(stream) => {
                stream
                    .shutdown(std::net::Shutdown::Both)
                    .map_err(PlcError::from)?;
                log::info!("disconnected from {}", self.peer);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
