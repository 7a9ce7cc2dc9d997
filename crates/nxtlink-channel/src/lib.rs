//! Connection management for LEGO NXT bricks.
//!
//! [`Channel`] is the asynchronous controller-facing side: submit
//! [`Intent`]s (optionally delayed) and receive [`ChannelEvent`]s. [`Link`]
//! is the synchronous side used for request/reply sequences such as file
//! uploads.

pub mod channel;
pub mod config;
pub mod delay_queue;
pub mod error;
pub mod event;
pub mod intent;
pub mod link;

pub use channel::Channel;
pub use config::ChannelConfig;
pub use delay_queue::DelayQueue;
pub use error::{ChannelError, ConnectError, ReceiveError, Result, SendError};
pub use event::{ChannelEvent, ConnectionState};
pub use intent::{clamp_power, Intent};
pub use link::{Link, MessageLink};
