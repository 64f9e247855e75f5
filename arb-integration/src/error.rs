use thiserror::Error;

/// Marks an error as either recoverable (the caller may retry / back off) or
/// unrecoverable (the caller should stop trying).
///
/// Every crate in this workspace builds its own error enum around this trait so that
/// supervisors and connection managers can make retry decisions without matching on
/// every concrete variant.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}

/// Low-level socket / transport error shared by every streaming and REST integration.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("sink error: {0}")]
    Sink(String),

    #[error("failed to deserialise: {error} from payload: {payload}")]
    Deserialise { error: serde_json::Error, payload: String },

    #[error("failed to deserialise binary message")]
    DeserialiseBinary {
        error: serde_json::Error,
        payload: Vec<u8>,
    },

    #[error("failed to serialise")]
    Serialise(#[source] serde_json::Error),

    #[error("failed to parse query params: {0}")]
    QueryParams(String),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("http request timed out")]
    HttpTimeout,

    #[error("http response with status {0}: {1}")]
    HttpResponse(u16, String),

    #[error("connection terminated: {0}")]
    Terminated(String),

    #[error("subscription error: {0}")]
    Subscribe(String),

    #[error("unsupported {entity}: {item}")]
    Unsupported { entity: &'static str, item: String },
}

impl Unrecoverable for SocketError {
    fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            SocketError::Unsupported { .. } | SocketError::Subscribe(_)
        )
    }
}
