/// UI-independent core types: connect-time configuration and the decoded
/// value representation shared by the session API and its consumers.
pub mod config;
pub mod value;

pub use config::ConnectOptions;
pub use value::Value;
