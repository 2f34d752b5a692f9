//! Serial monitor core: devices, sessions, the port registry and the bridge
//! between a session and one client channel.

pub mod bridge;
pub mod device;
pub mod line_buffer;
pub mod registry;
pub mod session;

pub use bridge::{BridgeExit, SerialBridge};
pub use device::{PortOpener, SerialDevice, SystemPortOpener, list_ports};
pub use line_buffer::LineBuffer;
pub use registry::SessionRegistry;
pub use session::{SerialSession, SessionConfig, SessionEvents};
