pub mod channel;
pub mod membership;
pub mod message;

pub use channel::Channel;
pub use membership::{Membership, Role};
pub use message::Message;
