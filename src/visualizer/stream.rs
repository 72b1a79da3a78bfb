//! The read, reduce, smooth, render, pace cycle.

use super::demux::decode_samples;
use super::reducer::reduce_columns;
use super::state::CancelToken;
use super::Visualizer;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// How a stream loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// `stop()` was called or a newer run replaced this one.
    Cancelled,
}

impl Visualizer {
    /// Runs the stream loop over `reader` until `cancel` fires or a hard error occurs.
    ///
    /// Short reads and end-of-stream are treated as upstream stalls: the
    /// partial chunk is dropped and the read retried after one frame interval.
    pub(crate) async fn process_stream<R>(&self, reader: R, cancel: &CancelToken) -> Result<StreamOutcome>
    where
        R: AsyncRead + Unpin,
    {
        let config = &self.config;
        let frame_interval = config.frame_interval();

        let mut reader = BufReader::with_capacity(config.chunk_bytes() * 2, reader);
        let mut raw = vec![0u8; config.chunk_bytes()];
        let mut samples = vec![0i16; config.chunk_size()];
        let mut profile = vec![0.0; config.width()];
        let mut frames: u64 = 0;
        let mut stalls: u64 = 0;

        tracing::debug!(
            "Stream loop started: {} samples/chunk, {} columns, {:?} per frame",
            config.chunk_size(),
            config.width(),
            frame_interval
        );

        loop {
            if cancel.is_cancelled() {
                return Ok(cancelled(frames));
            }

            let started = Instant::now();

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(cancelled(frames)),
                read = reader.read_exact(&mut raw) => read,
            };

            match read {
                Ok(_) => stalls = 0,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    stalls += 1;
                    if stalls == 1 {
                        tracing::debug!("Audio source stalled, retrying");
                    }
                    if sleep_or_cancel(cancel, frame_interval).await {
                        return Ok(cancelled(frames));
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!("Audio stream read failed: {}", e);
                    return Err(e).context("Failed to read audio stream");
                }
            }

            let decoded = decode_samples(&raw, &mut samples);
            debug_assert_eq!(decoded, config.chunk_size());
            reduce_columns(&samples, &mut profile);
            self.state.apply_profile(&profile);

            let prefix = self.terminal.frame_prefix();
            let frame = self.render();
            self.write_output(&[prefix.as_str(), frame.as_str()])?;
            frames += 1;

            let elapsed = started.elapsed();
            tracing::trace!("Frame {} took {:?}", frames, elapsed);

            if let Some(remaining) = frame_interval.checked_sub(elapsed) {
                if sleep_or_cancel(cancel, remaining).await {
                    return Ok(cancelled(frames));
                }
            }
        }
    }
}

fn cancelled(frames: u64) -> StreamOutcome {
    tracing::info!("Stream loop cancelled after {} frames", frames);
    StreamOutcome::Cancelled
}

/// Sleeps for `duration`; returns `true` if cancelled first.
async fn sleep_or_cancel(cancel: &CancelToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::tests::SharedBuffer;
    use crate::visualizer::{PlainTerminal, VisualizerConfig};
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context as TaskContext, Poll};
    use tokio::io::{AsyncWriteExt, ReadBuf};

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn small_visualizer(buffer: &SharedBuffer) -> Arc<Visualizer> {
        let config = VisualizerConfig::builder()
            .width(4)
            .height(4)
            .chunk_size(8)
            .smooth_factor(1.0)
            .amplify(1.0)
            .fps(100)
            .show_status(false)
            .build()
            .unwrap();
        Arc::new(
            Visualizer::new(config)
                .with_output(buffer.clone())
                .with_terminal(PlainTerminal),
        )
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(ErrorKind::BrokenPipe, "pipe closed")))
        }
    }

    #[tokio::test]
    async fn test_end_to_end_profile() {
        let buffer = SharedBuffer::default();
        let vis = small_visualizer(&buffer);
        let chunk = pcm(&[0, 0, 0, 0, 32767, 32767, 32767, 32767]);

        let task = tokio::spawn({
            let vis = Arc::clone(&vis);
            async move { vis.start_from_reader(std::io::Cursor::new(chunk)).await }
        });

        wait_until(|| vis.waveform()[3] > 0.0).await;
        let profile = vis.waveform();
        assert_eq!(profile.len(), 4);
        assert_eq!(profile[0], 0.0);
        assert_eq!(profile[1], 0.0);
        assert!((profile[2] - 1.0).abs() < 1e-4);
        assert!((profile[3] - 1.0).abs() < 1e-4);

        // The source is exhausted; the loop keeps retrying until stopped.
        assert!(vis.is_running());
        vis.stop();
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert!(!vis.is_running());

        let output = buffer.contents();
        let first_frame: Vec<&str> = output.lines().take(4).collect();
        assert_eq!(first_frame.len(), 4);
        assert!(first_frame.iter().all(|row| row.len() == 4));
    }

    #[tokio::test]
    async fn test_cancel_before_first_read() {
        let vis = small_visualizer(&SharedBuffer::default());
        let (_writer, reader) = tokio::io::duplex(64);

        let task = tokio::spawn({
            let vis = Arc::clone(&vis);
            async move { vis.start_from_reader(reader).await }
        });

        wait_until(|| vis.is_running()).await;
        vis.stop();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.unwrap(), StreamOutcome::Cancelled);
        assert!(!vis.is_running());
        assert_eq!(vis.waveform(), vec![0.0; 4]);
    }

    #[tokio::test]
    async fn test_partial_chunk_is_retried() {
        let buffer = SharedBuffer::default();
        let vis = small_visualizer(&buffer);
        let (mut writer, reader) = tokio::io::duplex(64);

        let task = tokio::spawn({
            let vis = Arc::clone(&vis);
            async move { vis.start_from_reader(reader).await }
        });

        writer.write_all(&pcm(&[32767; 8])).await.unwrap();
        wait_until(|| vis.waveform()[0] > 0.0).await;

        // Half a chunk, then end of stream.
        writer.write_all(&pcm(&[0; 4])).await.unwrap();
        drop(writer);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(vis.is_running());
        assert!((vis.waveform()[0] - 1.0).abs() < 1e-4);

        vis.stop();
        assert_eq!(task.await.unwrap().unwrap(), StreamOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_hard_read_error_ends_loop() {
        let vis = small_visualizer(&SharedBuffer::default());

        let result = vis.start_from_reader(FailingReader).await;

        assert!(result.is_err());
        assert!(!vis.is_running());
    }

    struct FailingWriter;

    impl std::io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "terminal gone"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_output_write_error_ends_loop() {
        let config = VisualizerConfig::builder()
            .width(4)
            .height(4)
            .chunk_size(8)
            .build()
            .unwrap();
        let vis = Visualizer::new(config)
            .with_output(FailingWriter)
            .with_terminal(PlainTerminal);

        let result = vis
            .start_from_reader(std::io::Cursor::new(pcm(&[1000; 8])))
            .await;

        assert!(result.is_err());
        assert!(!vis.is_running());
    }

    #[tokio::test]
    async fn test_frames_are_paced() {
        let buffer = SharedBuffer::default();
        let config = VisualizerConfig::builder()
            .width(4)
            .height(2)
            .chunk_size(8)
            .fps(20)
            .show_status(false)
            .build()
            .unwrap();
        let vis = Arc::new(
            Visualizer::new(config)
                .with_output(buffer.clone())
                .with_terminal(PlainTerminal),
        );
        let data = pcm(&[1000; 8 * 5]);

        let started = Instant::now();
        let task = tokio::spawn({
            let vis = Arc::clone(&vis);
            async move { vis.start_from_reader(std::io::Cursor::new(data)).await }
        });

        // Five frames at 20 FPS need at least four full frame intervals.
        wait_until(|| buffer.contents().matches('\n').count() >= 10).await;
        assert!(started.elapsed() >= Duration::from_millis(200));

        vis.stop();
        task.await.unwrap().unwrap();
    }
}
