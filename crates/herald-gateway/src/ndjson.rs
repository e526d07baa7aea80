// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON responses for the streaming operations.
//!
//! Each item is one line. A failed item becomes a final
//! `{"error":{code,message}}` line and ends the response.

use std::convert::Infallible;

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::{Stream, StreamExt, stream};
use serde::Serialize;

use herald_core::HeraldError;

use crate::error::ErrorBody;

pub const CONTENT_TYPE: &str = "application/x-ndjson";

fn line<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(mut s) => {
            s.push('\n');
            s
        }
        Err(e) => {
            let err = HeraldError::Internal(format!("response encoding failed: {e}"));
            error_line(&err)
        }
    }
}

fn error_line(e: &HeraldError) -> String {
    let body = ErrorBody::from(e);
    // ErrorBody holds only strings.
    let mut s = serde_json::to_string(&body).unwrap_or_default();
    s.push('\n');
    s
}

/// Encode `items` as NDJSON lines, stopping after the first error.
pub fn lines<S, T>(items: S) -> impl Stream<Item = String> + Send + 'static
where
    S: Stream<Item = Result<T, HeraldError>> + Send + Unpin + 'static,
    T: Serialize + Send + 'static,
{
    stream::unfold(Some(items), |state| async move {
        let mut items = state?;
        match items.next().await? {
            Ok(item) => Some((line(&item), Some(items))),
            Err(e) => {
                tracing::debug!(error = %e, "stream ended with error");
                Some((error_line(&e), None))
            }
        }
    })
}

/// Stream `items` to the client as NDJSON.
pub fn response<S, T>(items: S) -> Response
where
    S: Stream<Item = Result<T, HeraldError>> + Send + Unpin + 'static,
    T: Serialize + Send + 'static,
{
    let body = Body::from_stream(lines(items).map(Ok::<_, Infallible>));
    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_line_ends_stream() {
        let items = stream::iter(vec![
            Ok(1u32),
            Err(HeraldError::Overloaded("pool full".into())),
            Ok(3u32),
        ]);
        let out: Vec<String> = lines(items).collect().await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], "1\n");
        let err: serde_json::Value = serde_json::from_str(out[1].trim()).unwrap();
        assert_eq!(err["error"]["code"], "resource_exhausted");
    }

    #[tokio::test]
    async fn empty_stream_has_no_lines() {
        let items = stream::iter(Vec::<Result<u32, HeraldError>>::new());
        assert!(lines(items).collect::<Vec<_>>().await.is_empty());
    }
}
