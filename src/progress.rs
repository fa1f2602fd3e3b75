//! # Progress-Reporting Body Stream
//!
//! Wraps a response body so every chunk read also broadcasts a
//! [`RouterEvent::FetchProgress`]. Bytes pass through untouched.
//!
//! ```text
//! reqwest body ──chunk──▶ progress_stream ──chunk──▶ read_to_string
//!                              │
//!                              └──▶ FetchProgress { progress, received, length }
//! ```

use std::pin::pin;

use futures::{Stream, StreamExt};
use log::debug;
use reqwest::header::CONTENT_LENGTH;

use crate::error::RouterError;
use crate::events::{FetchProgress, Notifier, RouterEvent};

/// Progress figures after `received` bytes out of an optional total.
pub fn progress_for(received: u64, length: Option<u64>) -> FetchProgress {
    match length {
        Some(length) => FetchProgress {
            progress: received as f64 / length as f64 * 100.0,
            received,
            length,
        },
        None => FetchProgress {
            progress: f64::NAN,
            received,
            length: 0,
        },
    }
}

/// Forwards `source` unchanged, emitting one progress event per chunk.
///
/// The returned stream is fused: once the source is exhausted it stays
/// finished and emits nothing more.
pub fn progress_stream<S, B, E>(
    source: S,
    length: Option<u64>,
    notifier: Notifier,
) -> impl Stream<Item = Result<B, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut received: u64 = 0;
    source
        .map(move |chunk| {
            if let Ok(bytes) = &chunk {
                received += bytes.as_ref().len() as u64;
                notifier.emit(RouterEvent::FetchProgress(progress_for(received, length)));
            }
            chunk
        })
        .fuse()
}

/// Turns a response into a progress-reporting byte stream.
///
/// Fails before building anything if the status says there is no body.
/// Only 204 and 205 get here: other bodyless statuses are not 2xx and are
/// rejected by the caller first.
pub fn body_stream(
    response: reqwest::Response,
    notifier: Notifier,
) -> Result<impl Stream<Item = Result<impl AsRef<[u8]>, reqwest::Error>>, RouterError> {
    let status = response.status().as_u16();
    if matches!(status, 204 | 205) {
        return Err(RouterError::EmptyBody { status });
    }

    let length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    debug!("response body: status={status}, content-length={length:?}");

    Ok(progress_stream(response.bytes_stream(), length, notifier))
}

/// Drains `stream` and decodes it as UTF-8, replacing invalid sequences.
pub async fn read_to_string<S, B, E>(stream: S) -> Result<String, RouterError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<RouterError>,
{
    let mut stream = pin!(stream);
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(chunk.map_err(Into::into)?.as_ref());
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
