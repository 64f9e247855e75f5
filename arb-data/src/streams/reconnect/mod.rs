pub mod stream;

/// An item produced by a [`stream::ReconnectingStream`], tagged with whether it is ordinary
/// stream output or a marker that the underlying connection just reconnected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<Origin, T> {
    Item(T),
    Reconnecting(Origin),
}

pub use stream::{ReconnectingStream, ReconnectionBackoffPolicy, init_reconnecting_stream};
