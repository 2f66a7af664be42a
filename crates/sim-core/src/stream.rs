//! Adapts a snapshot `broadcast` receiver into a plain [`Stream`], dropping
//! the lag-error variant: a subscriber slow enough to miss buffered
//! snapshots simply resumes from the next one, rather than seeing an error
//! item interleaved with snapshots.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::snapshot::Snapshot;

pub struct SnapshotStream {
    inner: BroadcastStream<Snapshot>,
}

impl SnapshotStream {
    pub fn new(rx: broadcast::Receiver<Snapshot>) -> Self {
        SnapshotStream {
            inner: BroadcastStream::new(rx),
        }
    }
}

impl Stream for SnapshotStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            return match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(snapshot))) => Poll::Ready(Some(snapshot)),
                Poll::Ready(Some(Err(_lagged))) => continue,
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            };
        }
    }
}
