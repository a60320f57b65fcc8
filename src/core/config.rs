use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Connect-time configuration for the controller session.
///
/// Supplied once at process startup and not changed thereafter except by
/// rebuilding the session. The TSAP pair identifies the local and remote
/// endpoints of the ISO-on-TCP connection (S7-200 Smart convention:
/// local 0x0100, remote 0x0200 for the first CPU).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectOptions {
    pub host: String,
    /// ISO-TSAP port.
    #[serde(default = "default_port")]
    pub port: u16,
    pub local_tsap: u16,
    pub remote_tsap: u16,
    /// Socket connect/read/write timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_port() -> u16 {
    102
}

fn default_timeout_ms() -> u64 {
    3000
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>, local_tsap: u16, remote_tsap: u16) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            local_tsap,
            remote_tsap,
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Read the connection parameters from the environment:
    /// `PLC_IP`, `PLC_LOCALTSAP`, `PLC_REMOTETSAP` (TSAPs in hex, with or
    /// without a `0x` prefix).
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("PLC_IP").context("PLC_IP is not set")?;
        let local_tsap = parse_tsap(
            &std::env::var("PLC_LOCALTSAP").context("PLC_LOCALTSAP is not set")?,
        )?;
        let remote_tsap = parse_tsap(
            &std::env::var("PLC_REMOTETSAP").context("PLC_REMOTETSAP is not set")?,
        )?;
        Ok(Self::new(host, local_tsap, remote_tsap))
    }
}

fn parse_tsap(raw: &str) -> Result<u16> {
    let digits = raw
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|_| anyhow!("invalid TSAP value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsap_parsing_accepts_hex_with_or_without_prefix() {
        assert_eq!(parse_tsap("0x0100").unwrap(), 0x0100);
        assert_eq!(parse_tsap("0200").unwrap(), 0x0200);
        assert_eq!(parse_tsap("2D01").unwrap(), 0x2D01);
        assert!(parse_tsap("garbage").is_err());
    }

    #[test]
    fn defaults() {
        let opts = ConnectOptions::new("192.168.2.1", 0x0100, 0x0200);
        assert_eq!(opts.port, 102);
        assert_eq!(opts.timeout_ms, 3000);
    }

    #[test]
    fn options_serialize_round_trip() {
        let opts = ConnectOptions::new("192.168.2.1", 0x0100, 0x0200);
        let json = serde_json::to_string(&opts).unwrap();
        let parsed: ConnectOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.host, "192.168.2.1");
        assert_eq!(parsed.remote_tsap, 0x0200);
    }
}
