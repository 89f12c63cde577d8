// Send pipeline. Covers what happens between "user pressed send" and the
// message store: rate gate, moderation, then dispatch.

pub mod send;
pub mod transport;

pub use send::{PendingMessage, SendError, SendPipeline};
pub use transport::{MemoryTransport, MessageTransport, OutgoingMessage};
