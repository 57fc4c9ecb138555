//! Chunk segmenter
//!
//! Converts the continuous buffer stream into fixed-duration WAV chunk
//! files. Every delivered buffer is written to the currently open chunk
//! before rollover is evaluated, so rollover happens strictly at buffer
//! boundaries and no sample is dropped or duplicated between chunks.
//!
//! Write failures never abort the session: the chunk is marked failed and
//! segmentation continues, so already-written chunks stay playable.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::backend::AudioFrame;
use crate::models::{AudioChunk, ChunkStatus};

#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Duration of each chunk (default: 30 seconds)
    pub chunk_duration: Duration,
    /// Output directory for chunk files
    pub output_dir: PathBuf,
    /// Recording id, used for chunk filenames
    pub recording_id: Uuid,
}

impl ChunkConfig {
    pub fn new(recording_id: Uuid, output_dir: PathBuf) -> Self {
        Self {
            chunk_duration: Duration::from_secs(30),
            output_dir,
            recording_id,
        }
    }
}

pub struct ChunkSegmenter {
    config: ChunkConfig,
    current: Option<ChunkWriter>,
    completed: Vec<AudioChunk>,
    next_index: u32,
    /// Recording time accrued so far, advanced once per delivered buffer
    elapsed_secs: f64,
}

impl ChunkSegmenter {
    pub fn new(config: ChunkConfig) -> Result<Self> {
        fs::create_dir_all(&config.output_dir)
            .context("Failed to create recordings directory")?;

        info!(
            "Segmenter ready for recording {} ({}s chunks)",
            config.recording_id,
            config.chunk_duration.as_secs_f64()
        );

        Ok(Self {
            config,
            current: None,
            completed: Vec::new(),
            next_index: 0,
            elapsed_secs: 0.0,
        })
    }

    /// Recording time advanced so far, in seconds. Buffer-count driven, so
    /// total duration is reproducible from buffer count x buffer duration.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    /// Write one buffer to the open chunk, then evaluate rollover
    pub fn write_frame(&mut self, frame: &AudioFrame) {
        if self.current.is_none() {
            self.open_chunk(frame.sample_rate, frame.channels);
        }

        if let Some(chunk) = &mut self.current {
            chunk.write(frame);
        }

        self.elapsed_secs += frame.duration_secs();

        let accrued = self
            .current
            .as_ref()
            .map(|c| self.elapsed_secs - c.entity.start_secs)
            .unwrap_or(0.0);

        if accrued >= self.config.chunk_duration.as_secs_f64() {
            self.finalize_current();
            // Open the next chunk eagerly so the rollover boundary is owned
            // by the chunk sequence even if the session stops right here.
            self.open_chunk(frame.sample_rate, frame.channels);
        }
    }

    fn open_chunk(&mut self, sample_rate: u32, channels: u16) {
        let index = self.next_index;
        let path = self.config.output_dir.join(format!(
            "{}-chunk-{:03}.wav",
            self.config.recording_id, index
        ));

        self.next_index += 1;
        self.current = Some(ChunkWriter::new(
            path,
            index,
            self.elapsed_secs,
            sample_rate,
            channels,
        ));
    }

    fn finalize_current(&mut self) {
        if let Some(writer) = self.current.take() {
            let chunk = writer.finish(self.elapsed_secs);
            info!(
                "Chunk {} finalized: {:.1}s - {:.1}s ({:?})",
                chunk.index,
                chunk.start_secs,
                chunk.start_secs + chunk.duration_secs,
                chunk.status
            );
            self.completed.push(chunk);
        }
    }

    /// Finalize the in-flight chunk with whatever duration it has accrued
    /// and return every chunk in creation order. Zero-length trailing chunks
    /// are possible when the session stops exactly on a rollover boundary.
    pub fn finish(mut self) -> Vec<AudioChunk> {
        self.finalize_current();
        info!("Segmentation complete: {} chunks", self.completed.len());
        self.completed
    }
}

/// Writes a single chunk to disk as 16-bit WAV
struct ChunkWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    entity: AudioChunk,
    failed: bool,
}

impl ChunkWriter {
    fn new(path: PathBuf, index: u32, start_secs: f64, sample_rate: u32, channels: u16) -> Self {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let entity = AudioChunk::new(index, start_secs, path.clone());

        let writer = match hound::WavWriter::create(&path, spec) {
            Ok(writer) => Some(writer),
            Err(e) => {
                warn!("Failed to create chunk file {:?}: {}", path, e);
                None
            }
        };
        let failed = writer.is_none();

        Self {
            writer,
            entity,
            failed,
        }
    }

    fn write(&mut self, frame: &AudioFrame) {
        let Some(writer) = &mut self.writer else {
            return;
        };

        for &sample in &frame.samples {
            let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            if let Err(e) = writer.write_sample(amplitude) {
                warn!(
                    "Failed to write to chunk {}: {}; chunk marked failed",
                    self.entity.index, e
                );
                self.failed = true;
                self.writer = None;
                return;
            }
        }
    }

    fn finish(mut self, elapsed_secs: f64) -> AudioChunk {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize chunk {}: {}", self.entity.index, e);
                self.failed = true;
            }
        }

        let mut entity = self.entity;
        entity.duration_secs = (elapsed_secs - entity.start_secs).max(0.0);
        entity.status = if self.failed {
            ChunkStatus::Failed
        } else {
            ChunkStatus::Completed
        };
        entity
    }
}
