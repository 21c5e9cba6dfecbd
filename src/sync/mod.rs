//! Client-side synchronization of a session view.

pub mod client;
pub mod cooldown;
pub mod message;

pub use self::client::{DropReason, PendingSend, SendOutcome, SyncClient, SyncSnapshot};
pub use self::message::{Message, MessageStatus};
