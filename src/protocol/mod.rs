pub mod address;
pub mod codec;
pub mod error;
pub mod mock;
pub mod s7;
pub mod transport;

pub use address::{resolve, translate_alias, Area, ResolvedAddress, ValueKind};
pub use error::PlcError;
pub use transport::Transport;
