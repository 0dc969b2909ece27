use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::presence::{Activity, PresenceClient};

/// Owns the presence connection and tracks whether anything is shown.
pub struct PresencePublisher {
    client: Box<dyn PresenceClient>,
    connected: bool,
    broadcasting: bool,
}

impl PresencePublisher {
    pub fn new(client: Box<dyn PresenceClient>) -> Self {
        Self {
            client,
            connected: false,
            broadcasting: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether an activity is currently shown
    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting
    }

    /// Connect unless already connected.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        self.client.connect()?;
        self.connected = true;
        info!("Connected to Discord");
        Ok(())
    }

    /// Push `activity`. A closed channel is reconnected and retried once.
    pub fn publish(&mut self, pid: u32, activity: &Activity) -> Result<()> {
        self.connect()?;

        match self.client.set_activity(pid, activity) {
            Ok(()) => {}
            Err(Error::ChannelClosed) => {
                warn!("Presence channel closed, reconnecting");
                self.connected = false;
                self.connect()?;
                if let Err(e) = self.client.set_activity(pid, activity) {
                    if matches!(e, Error::ChannelClosed) {
                        self.connected = false;
                    }
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }

        self.broadcasting = true;
        Ok(())
    }

    /// Remove the shown activity, keeping the connection open.
    pub fn clear(&mut self, pid: u32) -> Result<()> {
        if !self.connected || !self.broadcasting {
            return Ok(());
        }
        match self.client.clear(pid) {
            Ok(()) => {}
            Err(Error::ChannelClosed) => {
                // Closing the channel drops the activity too
                self.connected = false;
            }
            Err(e) => return Err(e),
        }
        self.broadcasting = false;
        debug!("Presence cleared");
        Ok(())
    }

    /// Close the connection. Returns `true` if there was one to close.
    pub fn disconnect(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        if let Err(e) = self.client.close() {
            debug!("Error while closing presence connection: {}", e);
        }
        self.connected = false;
        self.broadcasting = false;
        info!("Disconnected from Discord");
        true
    }
}

impl Drop for PresencePublisher {
    fn drop(&mut self) {
        self.disconnect();
    }
}
