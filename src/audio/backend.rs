use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the capture backend
///
/// `PermissionDenied` and `DeviceUnavailable` are fatal to starting a
/// session; `DeviceLost` is fatal to a running one and forces the same
/// teardown as an explicit stop.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("no usable audio input device")]
    DeviceUnavailable,
    #[error("audio input device lost")]
    DeviceLost,
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// One buffer of captured audio (interleaved f32 samples at the device's
/// native sample rate and channel count)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFrame {
    /// Wall-clock duration of this buffer in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Root-mean-square level of this buffer, for UI metering
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f32).sqrt()
    }
}

/// What the capture backend pushes into its channel
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Frame(AudioFrame),
    /// Terminal failure of the input device; no frames follow
    Error(CaptureError),
}

/// Audio capture backend trait
///
/// `start` activates the platform input and returns a bounded channel of
/// capture events; the backend is the producer and must never block on a
/// slow consumer (frames are dropped instead). `stop` guarantees that no
/// further events are delivered after it returns.
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError>;

    async fn stop(&mut self) -> Result<(), CaptureError>;

    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}
