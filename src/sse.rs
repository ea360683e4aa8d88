//! Server-sent event encoding for streaming completions.
//!
//! Each chunk is serialized to compact JSON and wrapped as a
//! `data: <json>\n\n` frame; once the chunk stream is exhausted a single
//! `data: [DONE]\n\n` frame closes the stream. Frames are produced one chunk
//! at a time, so transport backpressure propagates to the generation loop.

use std::convert::Infallible;

use bytes::Bytes;
use futures_util::future;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tracing::warn;

/// Terminal frame clients use to detect end of stream.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Serialize one payload into an SSE data frame.
pub fn frame<T: Serialize>(payload: &T) -> serde_json::Result<Bytes> {
    let json = serde_json::to_string(payload)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// Wrap a stream of chunk payloads into SSE wire frames, terminated by
/// exactly one `[DONE]` frame. A payload that fails to serialize is dropped
/// with a warning instead of tearing the connection down.
pub fn encode<S, T>(chunks: S) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    chunks
        .filter_map(|chunk| {
            future::ready(match frame(&chunk) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("failed to serialize stream chunk: {e}");
                    None
                }
            })
        })
        .chain(stream::once(future::ready(Bytes::from_static(
            DONE_FRAME.as_bytes(),
        ))))
        .map(Ok)
}
