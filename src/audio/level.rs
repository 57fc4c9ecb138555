use tokio::sync::watch;

use super::backend::AudioFrame;

/// Publishes the RMS level of the most recent buffer for UI metering.
///
/// This is a side channel only; nothing in the recording path depends on it.
pub struct LevelMeter {
    tx: watch::Sender<f32>,
}

impl LevelMeter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0.0);
        Self { tx }
    }

    pub fn update(&self, frame: &AudioFrame) {
        let _ = self.tx.send(frame.rms());
    }

    pub fn clear(&self) {
        let _ = self.tx.send(0.0);
    }

    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.tx.subscribe()
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}
