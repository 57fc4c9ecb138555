//! Conversion of captured buffers to the transcription wire format
//! (mono, 16 kHz, 16-bit little-endian PCM).

use super::backend::AudioFrame;

pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Downmix interleaved multi-channel samples to mono by averaging channels
pub fn downmix_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / channels);
    for frame in samples.chunks_exact(channels) {
        let sum: f32 = frame.iter().sum();
        mono.push(sum / channels as f32);
    }
    mono
}

/// Linear-interpolation resample. Decimation alone can't handle the common
/// 44.1 kHz -> 16 kHz case, which is not an integer ratio.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let a = samples[idx];
        let b = if idx + 1 < samples.len() {
            samples[idx + 1]
        } else {
            a
        };
        out.push(a + (b - a) * frac);
    }

    out
}

/// Convert an arbitrary-rate multi-channel frame to the fixed mono 16 kHz
/// 16-bit little-endian format the transcription service requires.
pub fn to_wire_pcm(frame: &AudioFrame) -> Vec<u8> {
    let mono = downmix_mono(&frame.samples, frame.channels);
    let resampled = resample_linear(&mono, frame.sample_rate, TARGET_SAMPLE_RATE);

    let mut bytes = Vec::with_capacity(resampled.len() * 2);
    for sample in resampled {
        let clipped = sample.clamp(-1.0, 1.0);
        let amplitude = (clipped * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&amplitude.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_mono(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_mono(&samples, 1), samples);
    }

    #[test]
    fn resample_48k_to_16k_reduces_by_three() {
        let input = vec![0.0; 4800];
        let output = resample_linear(&input, 48000, 16000);
        assert_eq!(output.len(), 1600);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let input = vec![0.1, -0.2, 0.3];
        assert_eq!(resample_linear(&input, 16000, 16000), input);
    }

    #[test]
    fn wire_pcm_is_16bit_le_mono() {
        let frame = AudioFrame {
            samples: vec![0.0, 1.0, -1.0, 0.0, 0.0, 0.0],
            sample_rate: 16000,
            channels: 1,
        };
        let bytes = to_wire_pcm(&frame);
        assert_eq!(bytes.len(), frame.samples.len() * 2);
        assert_eq!(&bytes[0..2], &0i16.to_le_bytes());
        assert_eq!(&bytes[2..4], &i16::MAX.to_le_bytes());
    }

    #[test]
    fn wire_pcm_halves_stereo_48k() {
        let frame = AudioFrame {
            samples: vec![0.0; 9600], // 100ms stereo at 48kHz
            sample_rate: 48000,
            channels: 2,
        };
        let bytes = to_wire_pcm(&frame);
        // 100ms of mono 16kHz i16: 1600 samples, 3200 bytes
        assert_eq!(bytes.len(), 3200);
    }
}
