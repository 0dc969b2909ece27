//! Discord Rich Presence publishing.

mod activity;
mod ipc;
mod publisher;

pub use activity::{Activity, Assets, Button, LISTEN_BUTTON_LABEL, Timestamps, fit_text, song_url};
pub use ipc::{
    Connector, DiscordIpcClient, Opcode, Transport, encode_frame, open_transport, read_frame,
    write_frame,
};
pub use publisher::PresencePublisher;
#[cfg(test)]
pub(crate) use publisher::tests::{Call, RecordingClient};

use crate::error::Result;

/// Application id registered for the presence assets
pub const DEFAULT_CLIENT_ID: &str = "1045242932128645180";

/// Connection to a presence endpoint.
///
/// Implementations report a remote hang-up as `Error::ChannelClosed`.
pub trait PresenceClient {
    fn connect(&mut self) -> Result<()>;

    /// Show `activity` on behalf of process `pid`
    fn set_activity(&mut self, pid: u32, activity: &Activity) -> Result<()>;

    /// Remove the activity without closing the connection
    fn clear(&mut self, pid: u32) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
