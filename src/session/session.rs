use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use crate::audio::{AudioCapture, CaptureEvent, ChunkConfig, ChunkSegmenter, LevelMeter};
use crate::models::{Recording, Transcript};
use crate::secrets::SecretStore;
use crate::store::ObjectStore;
use crate::transcribe::StreamingTranscriber;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level state machine for one recording at a time: Idle -> Recording ->
/// Idle, no resume from pause.
///
/// While recording, each captured buffer is fed to the segmenter (durable
/// storage) and to the transcriber (live transcription) independently; a
/// failure of one never aborts the other. Explicit stop and device loss
/// funnel through the same teardown path in the distribution loop.
pub struct RecordingSession {
    config: SessionConfig,
    store: Arc<ObjectStore>,
    secrets: Arc<dyn SecretStore>,
    transcriber: Arc<StreamingTranscriber>,
    is_recording: Arc<AtomicBool>,
    level: Arc<LevelMeter>,
    elapsed_tx: Arc<watch::Sender<f64>>,
    backend: Option<Box<dyn AudioCapture>>,
    loop_handle: Option<JoinHandle<Uuid>>,
}

impl RecordingSession {
    pub fn new(
        config: SessionConfig,
        store: Arc<ObjectStore>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        let transcriber = Arc::new(StreamingTranscriber::new(config.transcribe.clone()));
        let (elapsed_tx, _) = watch::channel(0.0);

        Self {
            config,
            store,
            secrets,
            transcriber,
            is_recording: Arc::new(AtomicBool::new(false)),
            level: Arc::new(LevelMeter::new()),
            elapsed_tx: Arc::new(elapsed_tx),
            backend: None,
            loop_handle: None,
        }
    }

    /// Start recording with the given capture backend.
    ///
    /// Capture activation errors propagate to the caller; a transcription
    /// connect failure degrades gracefully and the recording proceeds
    /// without live transcription.
    pub async fn start(&mut self, mut backend: Box<dyn AudioCapture>) -> Result<()> {
        if self.is_recording.load(Ordering::SeqCst) {
            warn!("Recording already in progress");
            return Ok(());
        }

        let recording = Recording::new(Recording::default_title());

        // Prepare chunk storage before activating capture so a storage
        // failure cannot leave the microphone running.
        let segmenter = ChunkSegmenter::new(ChunkConfig {
            chunk_duration: self.config.chunk_duration,
            output_dir: self.config.output_dir.clone(),
            recording_id: recording.id,
        })
        .context("Failed to prepare chunk storage")?;

        let events = backend
            .start()
            .await
            .context("Failed to activate audio capture")?;

        info!("Recording started: {} ({})", recording.title, recording.id);

        self.transcriber.reset();
        if self.config.transcription_enabled {
            self.connect_transcriber().await;
        }

        self.is_recording.store(true, Ordering::SeqCst);
        let _ = self.elapsed_tx.send(0.0);

        let handle = tokio::spawn(run_distribution_loop(
            events,
            segmenter,
            recording,
            self.config.language.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.transcriber),
            Arc::clone(&self.is_recording),
            Arc::clone(&self.level),
            Arc::clone(&self.elapsed_tx),
        ));

        self.backend = Some(backend);
        self.loop_handle = Some(handle);

        Ok(())
    }

    async fn connect_transcriber(&self) {
        let credential = match self.secrets.get(&self.config.credential_key) {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                warn!("No transcription credential; recording without live transcription");
                return;
            }
            Err(e) => {
                warn!("Secret store failure: {:#}; recording without live transcription", e);
                return;
            }
        };

        match tokio::time::timeout(CONNECT_TIMEOUT, self.transcriber.connect(&credential)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Transcription connect failed: {}; recording continues", e);
            }
            Err(_) => {
                warn!("Transcription connect timed out; recording continues");
            }
        }
    }

    /// Stop the session: deactivate capture, wait for the distribution loop
    /// to finalize chunks and persist, and return the stored recording.
    /// Returns `None` when no recording was active.
    pub async fn stop(&mut self) -> Result<Option<Recording>> {
        let Some(handle) = self.loop_handle.take() else {
            warn!("No active recording to stop");
            return Ok(None);
        };

        self.is_recording.store(false, Ordering::SeqCst);

        // Stopping the backend guarantees no further frames are delivered
        // and closes the event channel, which ends the distribution loop.
        if let Some(mut backend) = self.backend.take() {
            backend
                .stop()
                .await
                .context("Failed to deactivate audio capture")?;
        }

        let recording_id = handle.await.context("Distribution loop panicked")?;
        info!("Recording stopped: {}", recording_id);

        Ok(self.store.recording(recording_id))
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    /// RMS level of the most recent buffer, for UI metering
    pub fn audio_level(&self) -> watch::Receiver<f32> {
        self.level.subscribe()
    }

    /// Monotonic recording time in seconds, advanced once per buffer
    pub fn recording_time(&self) -> watch::Receiver<f64> {
        self.elapsed_tx.subscribe()
    }

    /// The current, possibly interim, live transcript
    pub fn current_transcript(&self) -> String {
        self.transcriber.current_transcript()
    }
}

/// Runs once per delivered buffer while the session is active, then performs
/// the single teardown path: finalize chunks, stamp duration, persist, and
/// disconnect transcription. Reached both by explicit stop (channel closed)
/// and by a terminal capture error.
#[allow(clippy::too_many_arguments)]
async fn run_distribution_loop(
    mut events: mpsc::Receiver<CaptureEvent>,
    mut segmenter: ChunkSegmenter,
    mut recording: Recording,
    language: String,
    store: Arc<ObjectStore>,
    transcriber: Arc<StreamingTranscriber>,
    is_recording: Arc<AtomicBool>,
    level: Arc<LevelMeter>,
    elapsed_tx: Arc<watch::Sender<f64>>,
) -> Uuid {
    while let Some(event) = events.recv().await {
        match event {
            CaptureEvent::Frame(frame) => {
                level.update(&frame);

                // Best effort: NotConnected means this frame simply isn't
                // transcribed.
                let _ = transcriber.send(&frame);

                segmenter.write_frame(&frame);
                let _ = elapsed_tx.send(segmenter.elapsed_secs());
            }
            CaptureEvent::Error(e) => {
                error!("Capture engine failed: {}; stopping session", e);
                break;
            }
        }
    }

    let elapsed = segmenter.elapsed_secs();
    let chunks = segmenter.finish();

    recording.duration_secs = elapsed;
    recording.chunks = chunks;

    let final_text = transcriber.final_transcript();
    if !final_text.is_empty() {
        recording.transcript = Some(Transcript::new(final_text, language));
    }

    let recording_id = recording.id;
    info!(
        "Finalizing recording {}: {:.1}s, {} chunks, transcript: {}",
        recording_id,
        recording.duration_secs,
        recording.chunks.len(),
        recording.transcript.is_some()
    );

    store.upsert_recording(recording);
    if let Err(e) = store.save() {
        error!("Failed to persist recording {}: {:#}", recording_id, e);
    }

    transcriber.disconnect();
    level.clear();
    is_recording.store(false, Ordering::SeqCst);

    recording_id
}
