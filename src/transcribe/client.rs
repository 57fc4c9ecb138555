use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::state::TranscriptState;
use crate::audio::backend::AudioFrame;
use crate::audio::resample;

/// Outbound frames are small (tens of milliseconds of 16 kHz mono PCM);
/// a full queue means the connection has stalled and frames are dropped.
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("transcription API key is missing")]
    MissingCredential,
    #[error("transcription transport error: {0}")]
    Transport(String),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum SendError {
    /// Non-fatal: the caller skips transcription for this frame and keeps
    /// recording.
    #[error("not connected to the transcription service")]
    NotConnected,
}

/// Fixed session parameters passed on connect
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub endpoint: String,
    pub model: String,
    pub language: String,
    /// Endpointing silence threshold in milliseconds
    pub endpointing_ms: u32,
}

impl TranscribeOptions {
    pub fn from_config(config: &crate::config::TranscriptionConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
            endpointing_ms: config.endpointing_ms,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}?encoding=linear16&sample_rate={}&channels=1&model={}&language={}\
             &smart_format=true&punctuate=true&interim_results=true&endpointing={}",
            self.endpoint,
            resample::TARGET_SAMPLE_RATE,
            self.model,
            self.language,
            self.endpointing_ms
        )
    }
}

/// Persistent duplex connection to the transcription service
///
/// State machine: Disconnected -> Connecting -> Connected -> Disconnected.
/// A transport error degrades silently back to Disconnected; the recording
/// path observes it only as `NotConnected` on the next send. Inbound
/// envelopes are applied in arrival order with no deduplication, so
/// duplicate text is possible if the provider retransmits.
pub struct StreamingTranscriber {
    options: TranscribeOptions,
    connected: Arc<AtomicBool>,
    outbound: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    state: Arc<Mutex<TranscriptState>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    dropped_frames: AtomicUsize,
}

impl StreamingTranscriber {
    pub fn new(options: TranscribeOptions) -> Self {
        Self {
            options,
            connected: Arc::new(AtomicBool::new(false)),
            outbound: Mutex::new(None),
            state: Arc::new(Mutex::new(TranscriptState::new())),
            reader_task: Mutex::new(None),
            dropped_frames: AtomicUsize::new(0),
        }
    }

    /// Open the duplex stream and start the send/receive loops
    pub async fn connect(&self, credential: &str) -> Result<(), ConnectError> {
        if credential.is_empty() {
            return Err(ConnectError::MissingCredential);
        }
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut request = self
            .options
            .url()
            .into_client_request()
            .map_err(|e| ConnectError::Transport(e.to_string()))?;
        let auth = format!("Token {}", credential)
            .parse()
            .map_err(|_| ConnectError::MissingCredential)?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (ws, _) = connect_async(request)
            .await
            .map_err(|e| ConnectError::Transport(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        info!(
            "Transcription stream connected: model={}, language={}",
            self.options.model, self.options.language
        );

        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_CAPACITY);
        self.connected.store(true, Ordering::SeqCst);
        *self.outbound.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);

        // The writer is not tracked: it ends on its own once the sender is
        // dropped, after delivering a close frame so the service can flush
        // its final results.
        let connected = Arc::clone(&self.connected);
        tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                if let Err(e) = sink.send(Message::Binary(bytes)).await {
                    warn!("Transcription send failed: {}", e);
                    connected.store(false, Ordering::SeqCst);
                    return;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        });

        let connected = Arc::clone(&self.connected);
        let state = Arc::clone(&self.state);
        let reader = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        state.lock().unwrap_or_else(|e| e.into_inner()).apply(&text);
                    }
                    Ok(Message::Binary(bytes)) => {
                        if let Ok(text) = String::from_utf8(bytes) {
                            state.lock().unwrap_or_else(|e| e.into_inner()).apply(&text);
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Transcription stream terminated: {}", e);
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
        });

        *self.reader_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(reader);

        Ok(())
    }

    /// Resample a captured buffer to mono 16 kHz 16-bit PCM and queue it for
    /// transmission. Fire-and-forget: a full outbound queue drops the frame
    /// rather than stalling capture.
    pub fn send(&self, frame: &AudioFrame) -> Result<(), SendError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SendError::NotConnected);
        }

        let bytes = resample::to_wire_pcm(frame);

        let guard = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = guard.as_ref() else {
            return Err(SendError::NotConnected);
        };

        match tx.try_send(bytes) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Outbound transcription queue full; {} frames dropped", dropped);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(SendError::NotConnected)
            }
        }
    }

    /// Close the duplex stream. Idempotent. Clears the interim transcript
    /// and leaves the accumulated final transcript for retrieval.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);

        // Dropping the sender ends the writer loop, which delivers a close
        // frame and releases the socket.
        *self.outbound.lock().unwrap_or_else(|e| e.into_inner()) = None;

        // Inbound messages after disconnect are discarded.
        if let Some(task) = self
            .reader_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }

        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear_current();
    }

    /// Clear both transcript buffers for a new session reusing this client
    pub fn reset(&self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).reset();
        self.dropped_frames.store(0, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn current_transcript(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current()
            .to_string()
    }

    pub fn final_transcript(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .final_text()
            .to_string()
    }

    pub fn confidence(&self) -> f32 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .confidence()
    }

    /// Test hook: apply a raw inbound envelope as if it arrived on the wire
    #[cfg(test)]
    pub(crate) fn apply_raw(&self, raw: &str) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).apply(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> TranscribeOptions {
        TranscribeOptions {
            endpoint: "wss://example.invalid/v1/listen".to_string(),
            model: "nova-2".to_string(),
            language: "en".to_string(),
            endpointing_ms: 300,
        }
    }

    #[test]
    fn url_carries_fixed_session_parameters() {
        let url = options().url();
        assert!(url.starts_with("wss://example.invalid/v1/listen?"));
        assert!(url.contains("encoding=linear16"));
        assert!(url.contains("sample_rate=16000"));
        assert!(url.contains("channels=1"));
        assert!(url.contains("interim_results=true"));
        assert!(url.contains("endpointing=300"));
    }

    #[test]
    fn send_before_connect_is_not_connected() {
        let client = StreamingTranscriber::new(options());
        let frame = AudioFrame {
            samples: vec![0.0; 160],
            sample_rate: 16000,
            channels: 1,
        };
        assert_eq!(client.send(&frame), Err(SendError::NotConnected));
    }

    #[tokio::test]
    async fn connect_without_credential_fails() {
        let client = StreamingTranscriber::new(options());
        assert!(matches!(
            client.connect("").await,
            Err(ConnectError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn disconnect_delivers_close_frame_to_the_service() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("local addr");

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept connection");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("websocket handshake");
            let mut saw_close = false;
            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Close(_)) => {
                        saw_close = true;
                        break;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
            let _ = done_tx.send(saw_close);
        });

        let client = StreamingTranscriber::new(TranscribeOptions {
            endpoint: format!("ws://{}/v1/listen", addr),
            model: "nova-2".to_string(),
            language: "en".to_string(),
            endpointing_ms: 300,
        });
        client.connect("key").await.expect("connect to loopback");

        let frame = AudioFrame {
            samples: vec![0.0; 160],
            sample_rate: 16000,
            channels: 1,
        };
        client.send(&frame).expect("send while connected");
        client.disconnect();

        let saw_close =
            tokio::time::timeout(std::time::Duration::from_secs(5), done_rx)
                .await
                .expect("server observed the stream end")
                .expect("server task completed");
        assert!(saw_close, "service should receive a close frame");
    }

    #[test]
    fn disconnect_is_idempotent_and_keeps_final_text() {
        let client = StreamingTranscriber::new(options());
        client.apply_raw(
            r#"{"type":"Results","is_final":true,"channel":{"alternatives":[{"transcript":"hello","confidence":0.9}]}}"#,
        );
        client.disconnect();
        client.disconnect();
        assert_eq!(client.current_transcript(), "");
        assert_eq!(client.final_transcript(), "hello");
    }

    #[test]
    fn reset_clears_accumulated_transcripts() {
        let client = StreamingTranscriber::new(options());
        client.apply_raw(
            r#"{"type":"Results","is_final":true,"channel":{"alternatives":[{"transcript":"hello","confidence":0.9}]}}"#,
        );
        client.reset();
        assert_eq!(client.current_transcript(), "");
        assert_eq!(client.final_transcript(), "");
    }
}
