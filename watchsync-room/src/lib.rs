//! Room-side collaborators of a watch session: the in-memory message hub, the
//! room controller that designates hosts, a [`watchsync_core::Transport`] over
//! them and a tokio driver for a single session.

pub mod driver;
pub mod error;
pub mod events;
pub mod hub;
pub mod registry;
pub mod transport;

pub use driver::{DriverHandle, DrivenSession, SessionDriver, SessionStatus, TokioClock, UserCommand};
pub use error::{Error, Result};
pub use events::{RoomEvent, Topic};
pub use hub::{ConnectionId, Delivery, RoomHub};
pub use registry::{Membership, RoomRegistry};
pub use transport::LocalTransport;
