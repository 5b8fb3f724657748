use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;

/// Errors observed while reading a request body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    /// The connection went away before the body was complete.
    #[error("connection closed before the request body was complete")]
    Aborted,
    /// The body framing was invalid (bad chunk, too large...).
    #[error("malformed request body")]
    Malformed,
}

pub(crate) enum BodyEvent {
    Chunk(Bytes),
    End,
    Error(BodyError),
}

/// The body of a request, delivered chunk by chunk as the connection
/// receives it.
#[derive(Debug)]
pub struct Body {
    rx: Option<mpsc::UnboundedReceiver<BodyEvent>>,
    done: bool,
}

/// The connection's side of a [`Body`].
pub(crate) struct BodySender {
    tx: mpsc::UnboundedSender<BodyEvent>,
}

impl Body {
    /// A body with no bytes.
    pub fn empty() -> Self {
        Self { rx: None, done: true }
    }

    pub(crate) fn channel() -> (BodySender, Body) {
        let (tx, rx) = mpsc::unbounded_channel();
        let body = Body {
            rx: Some(rx),
            done: false,
        };
        (BodySender { tx }, body)
    }

    /// Waits for the next chunk of the body.
    ///
    /// Returns `None` once the body is complete. If the connection dies
    /// first, yields `Some(Err(BodyError::Aborted))` once.
    pub async fn chunk(&mut self) -> Option<Result<Bytes, BodyError>> {
        if self.done {
            return None;
        }
        let rx = self.rx.as_mut()?;

        match rx.recv().await {
            Some(BodyEvent::Chunk(chunk)) => Some(Ok(chunk)),
            Some(BodyEvent::End) => {
                self.done = true;
                None
            }
            Some(BodyEvent::Error(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                Some(Err(BodyError::Aborted))
            }
        }
    }

    /// Reads the remaining body into a single buffer.
    pub async fn collect(&mut self) -> Result<Bytes, BodyError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    pub fn is_complete(&self) -> bool {
        self.done
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        let (tx, body) = Body::channel();
        if !data.is_empty() {
            tx.chunk(Bytes::from(data));
        }
        tx.finish();
        body
    }
}

impl BodySender {
    /// Forwards a chunk. A body nobody reads any more is silently discarded.
    pub(crate) fn chunk(&self, chunk: Bytes) {
        let _ = self.tx.send(BodyEvent::Chunk(chunk));
    }

    pub(crate) fn finish(self) {
        let _ = self.tx.send(BodyEvent::End);
    }

    pub(crate) fn fail(self, error: BodyError) {
        let _ = self.tx.send(BodyEvent::Error(error));
    }
}

impl std::fmt::Debug for BodyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyEvent::Chunk(chunk) => f.debug_tuple("Chunk").field(&chunk.len()).finish(),
            BodyEvent::End => f.write_str("End"),
            BodyEvent::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}
