//! Chamberlink — supervisory access layer for the S7-200 Smart controller
//! of a hyperbaric chamber.
//!
//! This crate provides the typed memory-access core used by the chamber's
//! backend services: symbolic address resolution (including the legacy
//! `M`/`VD`/`VW` shorthands from the chamber address sheets), big-endian
//! value codecs, an ISO-on-TCP transport speaking the S7 protocol, and a
//! lock-disciplined session API that serializes every read/write
//! transaction against the device. A background poll loop ships periodic
//! snapshots of named addresses for monitoring consumers.
//!
//! HTTP/WebSocket surfaces and session-history persistence are separate
//! services built on top of [`api::PlcSession`]; they are not part of this
//! crate.

pub mod api;
#[doc(hidden)]
pub mod cli;
pub mod core;
pub mod protocol;

pub use api::{PlcSession, SETTLE_DELAY};
pub use core::{ConnectOptions, Value};
pub use protocol::PlcError;
