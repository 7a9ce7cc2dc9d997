//! Control LEGO NXT bricks over the Bluetooth serial link.
//!
//! # Crate Structure
//!
//! - [`transport`]: Opening the serial-profile link to a brick
//! - [`frame`]: LCP telegrams and their length-prefixed framing
//! - [`channel`]: Connection lifecycle, intent queue and reply events
//! - [`upload`]: Serialized file uploads

/// Re-export transport types.
pub mod transport {
    pub use nxtlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use nxtlink_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use nxtlink_channel::*;
}

/// Re-export upload types.
pub mod upload {
    pub use nxtlink_upload::*;
}
