// Core modules for the StateDB key-value store
pub mod protocol; // RESP2 decoder/encoder + inline-command fallback
pub mod command; // typed Command model, arity/type validation
pub mod storage; // Dataspace: keyspace + expirations + Value
pub mod exec; // Executor: per-command handlers over the Dataspace
pub mod net; // ConnectionLoop: TCP accept loop, thread-per-connection
pub mod config; // CLI flag parsing

pub use command::*;
pub use config::*;
pub use exec::*;
pub use net::*;
pub use protocol::*;
pub use storage::*;

/// Default server listen address.
pub const DEFAULT_ADDR: &str = "127.0.0.1";
/// Default server listen port.
pub const DEFAULT_PORT: u16 = 8080;
