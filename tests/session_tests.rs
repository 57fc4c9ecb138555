// Integration tests for the recording session controller
//
// A scripted capture backend stands in for the microphone so the tests can
// drive the buffer-distribution loop deterministically.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use voxnotes::audio::{AudioCapture, AudioFrame, CaptureError, CaptureEvent};
use voxnotes::secrets::MemorySecretStore;
use voxnotes::session::{RecordingSession, SessionConfig};
use voxnotes::store::ObjectStore;
use voxnotes::transcribe::TranscribeOptions;

/// Capture backend that delivers a scripted event sequence.
///
/// When `hold_open` is set the event channel stays open after the script so
/// the distribution loop keeps waiting, as a live device would.
struct ScriptedCapture {
    events: Vec<CaptureEvent>,
    hold_open: bool,
    capturing: Arc<AtomicBool>,
    keepalive: Option<mpsc::Sender<CaptureEvent>>,
}

impl ScriptedCapture {
    fn new(events: Vec<CaptureEvent>, hold_open: bool) -> Self {
        Self {
            events,
            hold_open,
            capturing: Arc::new(AtomicBool::new(false)),
            keepalive: None,
        }
    }

    /// Shared flag that mirrors whether the backend has been activated,
    /// observable after the backend is handed to the session
    fn activation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.capturing)
    }

    fn frames(count: usize) -> Vec<CaptureEvent> {
        (0..count)
            .map(|_| {
                CaptureEvent::Frame(AudioFrame {
                    samples: vec![0.05; 1600], // 100ms at 16kHz mono
                    sample_rate: 16000,
                    channels: 1,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl AudioCapture for ScriptedCapture {
    async fn start(&mut self) -> std::result::Result<mpsc::Receiver<CaptureEvent>, CaptureError> {
        let (tx, rx) = mpsc::channel(self.events.len() + 1);
        for event in self.events.drain(..) {
            let _ = tx.send(event).await;
        }
        if self.hold_open {
            self.keepalive = Some(tx);
        }
        self.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> std::result::Result<(), CaptureError> {
        self.keepalive = None;
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn session_config(dir: &TempDir) -> SessionConfig {
    SessionConfig {
        output_dir: dir.path().join("recordings"),
        chunk_duration: Duration::from_secs(1),
        language: "en".to_string(),
        transcription_enabled: false,
        transcribe: TranscribeOptions {
            endpoint: "wss://example.invalid/v1/listen".to_string(),
            model: "nova-2".to_string(),
            language: "en".to_string(),
            endpointing_ms: 300,
        },
        credential_key: "deepgram".to_string(),
    }
}

fn make_session(dir: &TempDir) -> (RecordingSession, Arc<ObjectStore>) {
    let store = Arc::new(
        ObjectStore::open(dir.path().join("store.json")).expect("store should open"),
    );
    let secrets = Arc::new(MemorySecretStore::default());
    let session = RecordingSession::new(session_config(dir), Arc::clone(&store), secrets);
    (session, store)
}

#[tokio::test]
async fn recording_is_persisted_with_duration_from_buffer_count() -> Result<()> {
    let dir = TempDir::new()?;
    let (mut session, store) = make_session(&dir);

    // 25 buffers of 100ms -> 2.5s, chunk length 1s -> 3 chunks
    let backend = ScriptedCapture::new(ScriptedCapture::frames(25), true);
    session.start(Box::new(backend)).await?;
    assert!(session.is_recording());

    let recording = session.stop().await?.expect("a recording was made");
    assert!(!session.is_recording());

    assert!((recording.duration_secs - 2.5).abs() < 0.11);
    assert_eq!(recording.chunks.len(), 3);

    let chunk_total: f64 = recording.chunks.iter().map(|c| c.duration_secs).sum();
    assert!((chunk_total - recording.duration_secs).abs() < 0.11);

    let indices: Vec<u32> = recording.chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    // Transcriber was never connected: no transcript entity is created
    assert!(recording.transcript.is_none());

    // The graph survives a restart
    let reloaded = ObjectStore::open(dir.path().join("store.json"))?;
    assert!(reloaded.recording(recording.id).is_some());

    Ok(())
}

#[tokio::test]
async fn capture_failure_forces_teardown_like_explicit_stop() -> Result<()> {
    let dir = TempDir::new()?;
    let (mut session, store) = make_session(&dir);

    let mut events = ScriptedCapture::frames(5);
    events.push(CaptureEvent::Error(CaptureError::DeviceLost));
    let backend = ScriptedCapture::new(events, true);

    session.start(Box::new(backend)).await?;

    // The loop tears down on the device error without an explicit stop;
    // stop() then just collects the already-persisted result.
    let recording = session.stop().await?.expect("a recording was made");
    assert!((recording.duration_secs - 0.5).abs() < 0.11);
    assert_eq!(store.recordings().len(), 1);

    Ok(())
}

#[tokio::test]
async fn starting_twice_is_a_no_op() -> Result<()> {
    let dir = TempDir::new()?;
    let (mut session, store) = make_session(&dir);

    session
        .start(Box::new(ScriptedCapture::new(
            ScriptedCapture::frames(10),
            true,
        )))
        .await?;
    assert!(session.is_recording());

    // Second start while recording: no new session begins
    session
        .start(Box::new(ScriptedCapture::new(
            ScriptedCapture::frames(10),
            true,
        )))
        .await?;

    session.stop().await?;
    assert_eq!(store.recordings().len(), 1);

    Ok(())
}

#[tokio::test]
async fn storage_failure_at_start_never_activates_capture() -> Result<()> {
    let dir = TempDir::new()?;

    // A plain file where the recordings directory should go makes chunk
    // storage preparation fail regardless of process privileges.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory")?;

    let mut config = session_config(&dir);
    config.output_dir = blocker.join("recordings");

    let store = Arc::new(ObjectStore::open(dir.path().join("store.json"))?);
    let secrets = Arc::new(MemorySecretStore::default());
    let mut session = RecordingSession::new(config, store, secrets);

    let backend = ScriptedCapture::new(ScriptedCapture::frames(5), true);
    let activated = backend.activation_flag();

    assert!(session.start(Box::new(backend)).await.is_err());
    assert!(
        !activated.load(Ordering::SeqCst),
        "capture backend must stay inactive when storage setup fails"
    );
    assert!(!session.is_recording());

    Ok(())
}

#[tokio::test]
async fn recording_time_resets_for_a_new_session() -> Result<()> {
    let dir = TempDir::new()?;
    let (mut session, _store) = make_session(&dir);

    session
        .start(Box::new(ScriptedCapture::new(
            ScriptedCapture::frames(25),
            true,
        )))
        .await?;
    session.stop().await?;
    assert!((*session.recording_time().borrow() - 2.5).abs() < 0.11);

    // A fresh session starts from zero before any buffer arrives
    session
        .start(Box::new(ScriptedCapture::new(Vec::new(), true)))
        .await?;
    assert_eq!(*session.recording_time().borrow(), 0.0);
    session.stop().await?;

    Ok(())
}

#[tokio::test]
async fn stop_without_start_returns_none() -> Result<()> {
    let dir = TempDir::new()?;
    let (mut session, store) = make_session(&dir);

    assert!(session.stop().await?.is_none());
    assert!(store.recordings().is_empty());

    Ok(())
}

#[tokio::test]
async fn chunk_files_exist_after_stop() -> Result<()> {
    let dir = TempDir::new()?;
    let (mut session, _store) = make_session(&dir);

    let backend = ScriptedCapture::new(ScriptedCapture::frames(12), true);
    session.start(Box::new(backend)).await?;
    let recording = session.stop().await?.expect("a recording was made");

    for chunk in &recording.chunks {
        assert!(chunk.file_path.exists(), "chunk file {:?} missing", chunk.file_path);
    }

    Ok(())
}
