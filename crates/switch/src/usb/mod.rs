//! rusb-backed bus access
//!
//! Enumeration snapshots, the opened device session, and the vendor
//! control-transfer client that drives the handshake against real hardware.

pub mod bus;
pub mod session;

pub use bus::{AttachedDevice, BusError, BusSnapshot};
pub use session::{DeviceSession, negotiate_device};
