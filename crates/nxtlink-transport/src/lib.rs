//! Serial-profile link to a LEGO NXT brick.
//!
//! The brick speaks LCP over the Bluetooth serial port profile. On the host
//! side that profile surfaces as an ordinary serial device (`/dev/rfcomm0`,
//! `COM5`), so this crate opens it through `serialport` and hands out a
//! [`LinkStream`] implementing `Read + Write`.
//!
//! This is the lowest layer of nxtlink. Everything else builds on top of
//! the [`LinkStream`] type and the [`Connector`] seam provided here.

pub mod address;
pub mod error;
pub mod serial;
pub mod traits;

pub use address::{BtAddr, DeviceAddress, LEGO_OUI, SERIAL_PORT_SERVICE_UUID};
pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialConnector};
pub use traits::{Connector, LinkStream};
