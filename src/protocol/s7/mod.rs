pub mod frame;
pub mod tcp;

pub use tcp::TcpTransport;
