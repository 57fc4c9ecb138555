//! Microphone capture via cpal
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated thread
//! that forwards buffers into a bounded channel. The stream callback uses
//! `try_send` only; if the consumer falls behind, frames are dropped rather
//! than blocking the audio thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioCapture, AudioFrame, CaptureError, CaptureEvent};

/// Events the session consumes per frame arrive roughly every 10-50ms
/// depending on the device buffer size; 64 slots is over a second of slack.
const CHANNEL_CAPACITY: usize = 64;

pub struct MicrophoneCapture {
    capturing: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneCapture {
    pub fn new() -> Self {
        Self {
            capturing: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl Default for MicrophoneCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        // The capture thread polls this flag; clearing it makes the thread
        // drop the stream and exit even when stop() was never called.
        self.capturing.store(false, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl AudioCapture for MicrophoneCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::Backend("capture already running".into()));
        }

        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let capturing = Arc::clone(&self.capturing);

        let thread = std::thread::spawn(move || {
            run_capture_thread(event_tx, ready_tx, capturing);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.thread = Some(thread);
                Ok(event_rx)
            }
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                Err(CaptureError::Backend("capture thread exited early".into()))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            // Joining guarantees the stream is dropped and no callback can
            // fire after stop() returns.
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

fn run_capture_thread(
    event_tx: mpsc::Sender<CaptureEvent>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    capturing: Arc<AtomicBool>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable));
            return;
        }
    };

    let input_config = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::Backend(e.to_string())));
            return;
        }
    };

    let stream_config: StreamConfig = input_config.clone().into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;
    let sample_format = input_config.sample_format();

    info!(
        "Opening input device {:?}: {}Hz, {} channels, {:?}",
        device.name().unwrap_or_else(|_| "<unknown>".into()),
        sample_rate,
        channels,
        sample_format
    );

    let err_tx = event_tx.clone();
    let err_fn = move |err: cpal::StreamError| {
        warn!("Input stream error: {}", err);
        let lost = match err {
            cpal::StreamError::DeviceNotAvailable => CaptureError::DeviceLost,
            other => CaptureError::Backend(other.to_string()),
        };
        let _ = err_tx.try_send(CaptureEvent::Error(lost));
    };

    let stream = match sample_format {
        SampleFormat::F32 => {
            let tx = event_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _| forward_frame(data.to_vec(), sample_rate, channels, &tx),
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let tx = event_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let scale = 1.0 / i16::MAX as f32;
                    let samples = data.iter().map(|s| *s as f32 * scale).collect();
                    forward_frame(samples, sample_rate, channels, &tx)
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let tx = event_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _| {
                    const MIDPOINT: f32 = 32768.0;
                    let samples = data.iter().map(|s| (*s as f32 - MIDPOINT) / MIDPOINT).collect();
                    forward_frame(samples, sample_rate, channels, &tx)
                },
                err_fn,
                None,
            )
        }
        other => {
            let _ = ready_tx.send(Err(CaptureError::Backend(format!(
                "unsupported input sample format {:?}",
                other
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(cpal::BuildStreamError::DeviceNotAvailable) => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable));
            return;
        }
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::Backend(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::Backend(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    while capturing.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    // Dropping the stream stops the callbacks; dropping event_tx afterwards
    // closes the channel so the consumer sees end-of-stream.
    drop(stream);
    info!("Microphone capture stopped");
}

fn forward_frame(
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    tx: &mpsc::Sender<CaptureEvent>,
) {
    let frame = AudioFrame {
        samples,
        sample_rate,
        channels,
    };
    // Drop on backpressure: never block the audio callback.
    let _ = tx.try_send(CaptureEvent::Frame(frame));
}
