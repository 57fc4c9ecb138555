// Integration tests for the chunk segmenter
//
// These verify that the continuous buffer stream is split into
// fixed-duration WAV chunks with contiguous indices and that chunk
// durations reconstruct the recording duration.

use anyhow::Result;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use voxnotes::audio::{AudioChunkFile, AudioFrame, ChunkConfig, ChunkSegmenter};
use voxnotes::models::ChunkStatus;

/// 100ms of 16kHz mono audio
fn frame() -> AudioFrame {
    AudioFrame {
        samples: vec![0.1; 1600],
        sample_rate: 16000,
        channels: 1,
    }
}

fn config(dir: &TempDir, chunk_secs: u64) -> ChunkConfig {
    ChunkConfig {
        chunk_duration: Duration::from_secs(chunk_secs),
        output_dir: dir.path().to_path_buf(),
        recording_id: Uuid::new_v4(),
    }
}

#[test]
fn short_recording_produces_single_chunk() -> Result<()> {
    let dir = TempDir::new()?;
    let mut segmenter = ChunkSegmenter::new(config(&dir, 30))?;

    for _ in 0..50 {
        segmenter.write_frame(&frame()); // 5 seconds total
    }
    let chunks = segmenter.finish();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].index, 0);
    assert_eq!(chunks[0].start_secs, 0.0);
    assert!((chunks[0].duration_secs - 5.0).abs() < 0.1);
    assert_eq!(chunks[0].status, ChunkStatus::Completed);
    assert!(chunks[0].file_path.exists());

    Ok(())
}

#[test]
fn ninety_five_seconds_makes_four_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    let mut segmenter = ChunkSegmenter::new(config(&dir, 30))?;

    for _ in 0..950 {
        segmenter.write_frame(&frame()); // 95 seconds total
    }
    let chunks = segmenter.finish();

    assert_eq!(chunks.len(), 4);
    let indices: Vec<u32> = chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    // Rollover happens at buffer boundaries, so each duration is exact to
    // within one buffer duration.
    let expected = [30.0, 30.0, 30.0, 5.0];
    for (chunk, want) in chunks.iter().zip(expected) {
        assert!(
            (chunk.duration_secs - want).abs() < 0.11,
            "chunk {} duration {} != {}",
            chunk.index,
            chunk.duration_secs,
            want
        );
    }

    Ok(())
}

#[test]
fn chunk_durations_sum_to_recording_duration() -> Result<()> {
    let dir = TempDir::new()?;
    let mut segmenter = ChunkSegmenter::new(config(&dir, 7))?;

    for _ in 0..173 {
        segmenter.write_frame(&frame()); // 17.3 seconds
    }
    let elapsed = segmenter.elapsed_secs();
    let chunks = segmenter.finish();

    let total: f64 = chunks.iter().map(|c| c.duration_secs).sum();
    assert!((total - elapsed).abs() < 0.1);

    // Indices contiguous from 0, start offsets monotonically increasing
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index as usize, i);
    }
    for pair in chunks.windows(2) {
        assert!(pair[1].start_secs >= pair[0].start_secs);
    }

    Ok(())
}

#[test]
fn stop_on_rollover_boundary_leaves_zero_length_trailing_chunk() -> Result<()> {
    let dir = TempDir::new()?;
    let mut segmenter = ChunkSegmenter::new(config(&dir, 1))?;

    for _ in 0..10 {
        segmenter.write_frame(&frame()); // exactly one chunk duration
    }
    let chunks = segmenter.finish();

    assert_eq!(chunks.len(), 2);
    assert!((chunks[0].duration_secs - 1.0).abs() < 0.11);
    assert!(chunks[1].duration_secs < 0.11);

    // Zero-length chunks must still be well-formed for downstream readers
    let trailing = AudioChunkFile::open(&chunks[1].file_path)?;
    assert_eq!(trailing.samples.len(), 0);

    Ok(())
}

#[test]
fn chunk_files_are_independently_readable() -> Result<()> {
    let dir = TempDir::new()?;
    let mut segmenter = ChunkSegmenter::new(config(&dir, 2))?;

    for _ in 0..50 {
        segmenter.write_frame(&frame()); // 5 seconds -> 3 chunks
    }
    let chunks = segmenter.finish();
    assert_eq!(chunks.len(), 3);

    for chunk in &chunks {
        let file = AudioChunkFile::open(&chunk.file_path)?;
        assert_eq!(file.sample_rate, 16000);
        assert_eq!(file.channels, 1);
        assert!((file.duration_seconds - chunk.duration_secs).abs() < 0.11);
    }

    Ok(())
}

#[cfg(unix)]
#[test]
fn failed_chunk_does_not_stop_later_chunks() -> Result<()> {
    use std::fs;

    let dir = TempDir::new()?;
    let out = dir.path().join("out");
    let parked = dir.path().join("parked");
    let mut segmenter = ChunkSegmenter::new(ChunkConfig {
        chunk_duration: Duration::from_secs(1),
        output_dir: out.clone(),
        recording_id: Uuid::new_v4(),
    })?;

    // Chunk 0 written normally
    for _ in 0..9 {
        segmenter.write_frame(&frame());
    }

    // Park the output directory so chunk 1's file can't be created at the
    // next rollover; chunk 0's already-open handle is unaffected.
    fs::rename(&out, &parked)?;
    segmenter.write_frame(&frame());

    // Restore the directory before chunk 2 opens at the second rollover
    fs::rename(&parked, &out)?;
    for _ in 0..10 {
        segmenter.write_frame(&frame());
    }
    for _ in 0..9 {
        segmenter.write_frame(&frame());
    }

    let chunks = segmenter.finish();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].status, ChunkStatus::Completed);
    assert_eq!(chunks[1].status, ChunkStatus::Failed);
    assert_eq!(chunks[2].status, ChunkStatus::Completed);

    // The failed chunk still accrued its duration
    assert!((chunks[1].duration_secs - 1.0).abs() < 0.11);

    // Chunks around the failure stay readable
    assert!(AudioChunkFile::open(&chunks[0].file_path).is_ok());
    assert!(AudioChunkFile::open(&chunks[2].file_path).is_ok());

    Ok(())
}
