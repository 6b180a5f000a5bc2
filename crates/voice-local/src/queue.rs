//! Bounded hand-off between a capture callback and the frame reader.
//!
//! The callback never blocks: once the queue is full new chunks are counted
//! as overruns and dropped. The reader notices the overrun on its next
//! receive and skips the stale backlog, so a slow consumer catches up with
//! live audio instead of falling further behind.

use crate::{Result, VoiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use tracing::warn;

/// Callback buffers held before the producer starts dropping. Typical
/// hosts deliver 10 ms buffers, so this is a few seconds of audio.
pub const CAPTURE_QUEUE_CHUNKS: usize = 256;

/// Producer half, moved into the capture callback.
#[derive(Clone)]
pub struct ChunkSender {
    tx: SyncSender<Vec<i16>>,
    overruns: Arc<AtomicUsize>,
}

impl ChunkSender {
    pub fn send(&self, chunk: Vec<i16>) {
        match self.tx.try_send(chunk) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                self.overruns.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Consumer half, owned by the frame reader.
pub struct ChunkQueue {
    rx: Receiver<Vec<i16>>,
    overruns: Arc<AtomicUsize>,
}

pub fn chunk_queue(capacity: usize) -> (ChunkSender, ChunkQueue) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let overruns = Arc::new(AtomicUsize::new(0));
    (
        ChunkSender {
            tx,
            overruns: overruns.clone(),
        },
        ChunkQueue { rx, overruns },
    )
}

impl ChunkQueue {
    /// Block until the next chunk arrives. After an overrun everything but
    /// the newest queued chunk is discarded first.
    pub fn recv(&mut self) -> Result<Vec<i16>> {
        let dropped = self.overruns.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            let backlog = self.take_queued()?;
            warn!(
                dropped,
                skipped = backlog.len().saturating_sub(1),
                "capture fell behind, skipping to live audio"
            );
            if let Some(newest) = backlog.into_iter().last() {
                return Ok(newest);
            }
        }
        self.rx
            .recv()
            .map_err(|_| VoiceError::Capture("input stream closed".into()))
    }

    /// Every chunk already queued, oldest first, without blocking.
    pub fn take_queued(&mut self) -> Result<Vec<Vec<i16>>> {
        let mut chunks = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => chunks.push(chunk),
                Err(TryRecvError::Empty) => return Ok(chunks),
                Err(TryRecvError::Disconnected) if !chunks.is_empty() => return Ok(chunks),
                Err(TryRecvError::Disconnected) => {
                    return Err(VoiceError::Capture("input stream closed".into()))
                }
            }
        }
    }
}
