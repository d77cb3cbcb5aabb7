//! Waveform helpers: fades, silence trimming, gaps and WAV I/O.
//!
//! All audio is mono `f32` in `[-1.0, 1.0]` at [`SAMPLE_RATE`].

use std::{io::Cursor, path::Path};

use crate::error::Result;

/// Sample rate of every waveform handled by the crate.
pub const SAMPLE_RATE: u32 = 24_000;

fn seconds_to_samples(seconds: f32) -> usize {
    (seconds.max(0.0) * SAMPLE_RATE as f32) as usize
}

/// Linear fade-in and fade-out of `fade_secs`, capped at half the clip.
pub fn apply_fade(audio: &mut [f32], fade_secs: f32) {
    let fade = seconds_to_samples(fade_secs).min(audio.len() / 2);
    if fade == 0 {
        return;
    }
    let len = audio.len();
    let denom = (fade - 1).max(1) as f32;
    for i in 0..fade {
        let gain = i as f32 / denom;
        audio[i] *= gain;
        audio[len - 1 - i] *= gain;
    }
}

/// Cut leading and trailing samples at or below `threshold`, keeping
/// `padding_secs` of context on both sides. All-silent audio is returned as is.
pub fn trim_silence(audio: &[f32], threshold: f32, padding_secs: f32) -> Vec<f32> {
    let first = audio.iter().position(|s| s.abs() > threshold);
    let last = audio.iter().rposition(|s| s.abs() > threshold);
    let (Some(first), Some(last)) = (first, last) else {
        return audio.to_vec();
    };
    let pad = seconds_to_samples(padding_secs);
    let start = first.saturating_sub(pad);
    let end = (last + pad).min(audio.len());
    audio[start..end].to_vec()
}

/// `seconds` of digital silence.
pub fn silence(seconds: f32) -> Vec<f32> {
    vec![0.0; seconds_to_samples(seconds)]
}

/// Largest absolute sample value.
pub fn peak(audio: &[f32]) -> f32 {
    audio.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Duration of a WAV file in seconds.
pub fn read_wav_duration(path: &Path) -> Result<f32> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let frames = reader.duration();
    Ok(frames as f32 / spec.sample_rate as f32)
}

fn wav_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn to_i16(s: f32) -> i16 {
    (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Write `audio` to a 16-bit PCM WAV file.
pub fn write_wav(audio: &[f32], path: &Path) -> Result<()> {
    let mut writer = hound::WavWriter::create(path, wav_spec())?;
    for &s in audio {
        writer.write_sample(to_i16(s))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Encode `audio` as an in-memory 16-bit PCM WAV file.
pub fn encode_wav(audio: &[f32]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec())?;
        for &s in audio {
            writer.write_sample(to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_edges() {
        let mut audio = vec![1.0f32; 24_000];
        apply_fade(&mut audio, 0.02);
        assert_eq!(audio[0], 0.0);
        assert_eq!(*audio.last().unwrap(), 0.0);
        assert_eq!(audio[12_000], 1.0);
    }

    #[test]
    fn test_fade_short_clip() {
        let mut audio = vec![1.0f32; 4];
        apply_fade(&mut audio, 1.0);
        assert_eq!(audio[0], 0.0);
        assert_eq!(audio[3], 0.0);

        let mut empty: Vec<f32> = Vec::new();
        apply_fade(&mut empty, 0.02);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_trim_silence() {
        let mut audio = vec![0.0f32; 10_000];
        audio[5_000] = 0.5;
        let trimmed = trim_silence(&audio, 0.005, 0.001);
        // 24 samples of padding on each side
        assert_eq!(trimmed.len(), 48);
        assert!(trimmed.iter().any(|&s| s == 0.5));
    }

    #[test]
    fn test_trim_all_silent_is_noop() {
        let audio = vec![0.001f32; 100];
        assert_eq!(trim_silence(&audio, 0.005, 0.02), audio);
    }

    #[test]
    fn test_silence_length() {
        assert_eq!(silence(0.1).len(), 2_400);
        assert!(silence(0.1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_wav_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("round_trip.wav");
        let audio: Vec<f32> = (0..2_400).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        write_wav(&audio, &path).unwrap();
        assert!((read_wav_duration(&path).unwrap() - 0.1).abs() < 1e-4);
        let back: Vec<i16> = hound::WavReader::open(&path)
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(back.len(), audio.len());
        let got = back[100] as f32 / i16::MAX as f32;
        assert!((got - audio[100]).abs() < 1e-3, "got: {}", got);
    }

    #[test]
    fn test_encode_wav_header() {
        let bytes = encode_wav(&[0.0, 0.5, -0.5]).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}
