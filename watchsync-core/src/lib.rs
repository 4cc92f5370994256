pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod timer;
pub mod transport;
pub mod widget;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{SessionEvent, SyncSession};
pub use transport::Transport;
pub use widget::{PlaybackWidget, PlayerState, WidgetNotification};
