// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded result streams for the streaming operations.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use herald_core::HeraldError;

/// Build a stream holding at most `buffer` undelivered items.
pub fn result_channel<T>(buffer: usize) -> (ResultSink<T>, ResultStream<T>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (ResultSink { tx }, ResultStream { rx })
}

/// Producer half. The stream ends once every sink is dropped.
pub struct ResultSink<T> {
    tx: mpsc::Sender<Result<T, HeraldError>>,
}

impl<T> Clone for ResultSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> ResultSink<T> {
    /// Deliver one item; `false` once the consumer has gone away.
    pub async fn send(&self, item: Result<T, HeraldError>) -> bool {
        self.tx.send(item).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, a [`Stream`] of per-item results.
pub struct ResultStream<T> {
    rx: mpsc::Receiver<Result<T, HeraldError>>,
}

impl<T> ResultStream<T> {
    /// A stream that yields `items` and ends.
    pub fn from_vec(items: Vec<Result<T, HeraldError>>) -> Self {
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // Capacity covers every item.
            let _ = tx.try_send(item);
        }
        Self { rx }
    }

    /// Drain the stream, failing on the first error item.
    pub async fn collect_all(mut self) -> Result<Vec<T>, HeraldError> {
        let mut out = Vec::new();
        while let Some(item) = self.rx.recv().await {
            out.push(item?);
        }
        Ok(out)
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = Result<T, HeraldError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
