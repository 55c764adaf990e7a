//! # Continuous Position Feed
//!
//! Speed samples arrive as a long-lived stream of [`PositionFix`] ticks.
//! A subscription is a [`PositionWatch`]: a receiver plus a [`WatchHandle`]
//! that stops the producer. Cancelling is explicit and idempotent, and
//! dropping the handle cancels too, so a watcher cannot outlive its owner.

use crate::error::ContextError;
use log::{debug, warn};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the tick channel between producer and consumer.
const TICK_BUFFER: usize = 32;

static NEXT_WATCH_ID: AtomicU64 = AtomicU64::new(1);

/// One sample from the position provider.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionFix {
    /// Instantaneous speed in m/s; `None` when the provider has no value.
    pub speed_mps: Option<f64>,
}

/// Convert a raw m/s reading to whole km/h.
///
/// Missing, negative and non-finite readings count as standing still.
#[must_use]
pub fn speed_kmh(speed_mps: Option<f64>) -> u32 {
    match speed_mps {
        Some(mps) if mps.is_finite() && mps > 0.0 => {
            let kmh = (mps * 3.6).round();
            if kmh >= f64::from(u32::MAX) {
                u32::MAX
            } else {
                // non-negative and in range after the checks above
                kmh as u32
            }
        }
        _ => 0,
    }
}

/// Per-tick result delivered to the consumer.
pub type PositionTick = Result<PositionFix, ContextError>;

/// Opaque subscription handle.
#[derive(Debug)]
pub struct WatchHandle {
    id: u64,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    fn new(task: Option<JoinHandle<()>>) -> Self {
        Self {
            id: NEXT_WATCH_ID.fetch_add(1, Ordering::Relaxed),
            task,
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Stop the producer. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Cancelling position watch {}", self.id);
            task.abort();
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A live subscription.
#[derive(Debug)]
pub struct PositionWatch {
    pub ticks: mpsc::Receiver<PositionTick>,
    pub handle: WatchHandle,
}

/// Subscription API for continuous position updates.
pub trait PositionSource: Send + Sync {
    /// Start a new subscription.
    ///
    /// # Errors
    ///
    /// [`ContextError::AcquisitionFailure`] when the source cannot be watched
    /// at all (no capability, feed unavailable).
    fn watch(&self) -> Result<PositionWatch, ContextError>;
}

/// No position capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPositionSource;

impl PositionSource for NoPositionSource {
    fn watch(&self) -> Result<PositionWatch, ContextError> {
        Err(ContextError::AcquisitionFailure(
            "geolocation not supported".to_string(),
        ))
    }
}

/// Ticks pushed by the embedding application through a channel.
///
/// Each `watch()` creates a fresh channel; the sender for the latest
/// subscription is handed out through [`ChannelPositionSource::feeder`].
#[derive(Debug, Default)]
pub struct ChannelPositionSource {
    feeder: std::sync::Mutex<Option<mpsc::Sender<PositionTick>>>,
}

impl ChannelPositionSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender for the most recent subscription, if any.
    #[must_use]
    pub fn feeder(&self) -> Option<mpsc::Sender<PositionTick>> {
        self.feeder.lock().ok().and_then(|guard| guard.clone())
    }
}

impl PositionSource for ChannelPositionSource {
    fn watch(&self) -> Result<PositionWatch, ContextError> {
        let (tx, rx) = mpsc::channel(TICK_BUFFER);
        let mut slot = self
            .feeder
            .lock()
            .map_err(|_| ContextError::AcquisitionFailure("position feeder poisoned".to_string()))?;
        *slot = Some(tx);

        Ok(PositionWatch {
            ticks: rx,
            handle: WatchHandle::new(None),
        })
    }
}

/// Where a line feed reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedInput {
    Stdin,
    File(PathBuf),
}

/// Reads one speed sample (m/s) per line.
///
/// Blank lines and `null` are samples without a value; anything else that
/// does not parse as a number becomes a [`ContextError::StreamFailure`]
/// tick. Must be called inside a tokio runtime.
///
/// Stdin is read on a detached OS thread. Cancelling the watch returns
/// immediately even while that thread is blocked in a read, and the process
/// can exit without waiting for another line.
#[derive(Debug, Clone)]
pub struct LineFeedPositionSource {
    input: FeedInput,
}

impl LineFeedPositionSource {
    #[must_use]
    pub fn new(input: FeedInput) -> Self {
        Self { input }
    }
}

impl PositionSource for LineFeedPositionSource {
    fn watch(&self) -> Result<PositionWatch, ContextError> {
        let (tx, rx) = mpsc::channel(TICK_BUFFER);

        let task = match &self.input {
            FeedInput::Stdin => {
                let reader = std::io::BufReader::new(std::io::stdin());
                spawn_blocking_feed(reader, tx).map_err(|e| {
                    ContextError::AcquisitionFailure(format!("cannot read speed feed: {e}"))
                })?
            }
            FeedInput::File(path) => {
                let file = std::fs::File::open(path).map_err(|e| {
                    ContextError::AcquisitionFailure(format!(
                        "cannot open speed feed {}: {e}",
                        path.display()
                    ))
                })?;
                let reader = BufReader::new(tokio::fs::File::from_std(file));
                tokio::spawn(pump_lines(reader, tx))
            }
        };

        Ok(PositionWatch {
            ticks: rx,
            handle: WatchHandle::new(Some(task)),
        })
    }
}

/// Parse a single feed line.
pub fn parse_fix(line: &str) -> PositionTick {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Ok(PositionFix { speed_mps: None });
    }

    trimmed
        .parse::<f64>()
        .map(|mps| PositionFix {
            speed_mps: Some(mps),
        })
        .map_err(|e| ContextError::StreamFailure(format!("bad speed sample '{trimmed}': {e}")))
}

async fn pump_lines<R>(reader: R, tx: mpsc::Sender<PositionTick>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let tick = match lines.next_line().await {
            Ok(Some(line)) => parse_fix(&line),
            Ok(None) => {
                debug!("Speed feed reached end of input");
                break;
            }
            Err(e) => {
                warn!("Speed feed read error: {e}");
                Err(ContextError::StreamFailure(e.to_string()))
            }
        };

        if tx.send(tick).await.is_err() {
            break;
        }
    }
}

/// Read lines on a detached thread and forward them to a cancellable task.
///
/// Aborting the returned task drops the line channel, so the reader thread
/// stops after its current read.
fn spawn_blocking_feed<R>(
    reader: R,
    tx: mpsc::Sender<PositionTick>,
) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    let (line_tx, mut line_rx) = mpsc::channel::<std::io::Result<String>>(TICK_BUFFER);

    std::thread::Builder::new()
        .name("speed-feed".to_string())
        .spawn(move || {
            for line in reader.lines() {
                if line_tx.blocking_send(line).is_err() {
                    return;
                }
            }
        })?;

    Ok(tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            let tick = match line {
                Ok(line) => parse_fix(&line),
                Err(e) => {
                    warn!("Speed feed read error: {e}");
                    Err(ContextError::StreamFailure(e.to_string()))
                }
            };
            if tx.send(tick).await.is_err() {
                return;
            }
        }
        debug!("Speed feed reached end of input");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_speed_conversion() {
        assert_eq!(speed_kmh(None), 0);
        assert_eq!(speed_kmh(Some(-3.0)), 0);
        assert_eq!(speed_kmh(Some(f64::NAN)), 0);
        assert_eq!(speed_kmh(Some(0.0)), 0);
        assert_eq!(speed_kmh(Some(10.0)), 36);
        // 25.1 m/s = 90.36 km/h
        assert_eq!(speed_kmh(Some(25.1)), 90);
        // 25.2 m/s = 90.72 km/h
        assert_eq!(speed_kmh(Some(25.2)), 91);
        assert_eq!(speed_kmh(Some(f64::INFINITY)), 0);
    }

    #[test]
    fn test_parse_fix() {
        assert_eq!(parse_fix("12.5").unwrap().speed_mps, Some(12.5));
        assert_eq!(parse_fix("  ").unwrap().speed_mps, None);
        assert_eq!(parse_fix("NULL").unwrap().speed_mps, None);
        assert!(matches!(parse_fix("fast"), Err(ContextError::StreamFailure(_))));
    }

    #[test]
    fn test_no_position_source_fails() {
        assert!(NoPositionSource.watch().is_err());
    }

    #[tokio::test]
    async fn test_channel_source_delivers_ticks() {
        let source = ChannelPositionSource::new();
        let mut watch = source.watch().unwrap();
        let feeder = source.feeder().unwrap();

        feeder
            .send(Ok(PositionFix {
                speed_mps: Some(20.0),
            }))
            .await
            .unwrap();

        let tick = watch.ticks.recv().await.unwrap().unwrap();
        assert_eq!(tick.speed_mps, Some(20.0));
    }

    #[tokio::test]
    async fn test_line_feed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10").unwrap();
        writeln!(file, "oops").unwrap();
        writeln!(file, "null").unwrap();

        let source = LineFeedPositionSource::new(FeedInput::File(file.path().to_path_buf()));
        let mut watch = source.watch().unwrap();

        let first = watch.ticks.recv().await.unwrap();
        let second = watch.ticks.recv().await.unwrap();
        let third = watch.ticks.recv().await.unwrap();

        assert_eq!(first.unwrap().speed_mps, Some(10.0));
        assert!(second.is_err());
        assert_eq!(third.unwrap().speed_mps, None);
        assert!(watch.ticks.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_feed_file_is_acquisition_failure() {
        let source = LineFeedPositionSource::new(FeedInput::File(PathBuf::from(
            "/definitely/not/here.txt",
        )));
        assert!(matches!(
            source.watch(),
            Err(ContextError::AcquisitionFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_stops_producer() {
        let (_tx, rx) = mpsc::channel::<PositionTick>(1);
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        let mut watch = PositionWatch {
            ticks: rx,
            handle: WatchHandle::new(Some(task)),
        };

        assert!(watch.handle.is_active());
        watch.handle.cancel();
        watch.handle.cancel();
        assert!(!watch.handle.is_active());
    }

    /// Reader whose reads block until the test hands it bytes.
    struct StalledReader(std::sync::mpsc::Receiver<Vec<u8>>);

    impl std::io::Read for StalledReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.recv() {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[tokio::test]
    async fn test_blocking_feed_forwards_lines() {
        let reader = std::io::Cursor::new(b"5\nnope\n".to_vec());
        let (tx, mut rx) = mpsc::channel(TICK_BUFFER);
        let _task = spawn_blocking_feed(reader, tx).unwrap();

        assert_eq!(rx.recv().await.unwrap().unwrap().speed_mps, Some(5.0));
        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_does_not_wait_for_blocked_read() {
        let (bytes_tx, bytes_rx) = std::sync::mpsc::channel::<Vec<u8>>();
        let reader = std::io::BufReader::new(StalledReader(bytes_rx));
        let (tx, ticks) = mpsc::channel(TICK_BUFFER);
        let task = spawn_blocking_feed(reader, tx).unwrap();
        let mut watch = PositionWatch {
            ticks,
            handle: WatchHandle::new(Some(task)),
        };

        watch.handle.cancel();

        // the reader thread is still parked in read(); the consumer side closes anyway
        let closed = tokio::time::timeout(std::time::Duration::from_secs(5), watch.ticks.recv())
            .await
            .expect("watch closed without waiting for input");
        assert!(closed.is_none());
        drop(bytes_tx);
    }

    #[test]
    fn test_watch_ids_are_unique() {
        let a = WatchHandle::new(None);
        let b = WatchHandle::new(None);
        assert_ne!(a.id(), b.id());
    }
}
