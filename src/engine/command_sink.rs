use crossbeam_channel::Sender;
use log::warn;

/// Receives game commands emitted by the overlay, e.g. when a panel is clicked.
pub trait CommandSink: Send {
    /// Fire and forget.
    fn send_command(&self, command: String);
}

/// Forwards commands into a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelCommandSink {
    tx: Sender<String>,
}

impl ChannelCommandSink {
    pub fn new(tx: Sender<String>) -> Self {
        ChannelCommandSink { tx }
    }
}

impl CommandSink for ChannelCommandSink {
    fn send_command(&self, command: String) {
        if let Err(e) = self.tx.send(command) {
            warn!("dropping command `{}`, nobody is listening", e.0);
        }
    }
}
