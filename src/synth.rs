//! Synthesis orchestration on top of an opaque speech engine.
//!
//! The engine itself (a diffusion TTS model, a remote service, …) lives behind
//! [`SpeechEngine`]. This module decides what text it sees, how long it may
//! speak for short segments, and how per-segment clips are stitched together.

use std::{
    collections::HashMap,
    f32::consts::PI,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    audio::{apply_fade, peak, read_wav_duration, silence, trim_silence, SAMPLE_RATE},
    frontend::FrontEnd,
};

// ─────────────────────────────────────────────────────────────────────────────
// Engine seam
// ─────────────────────────────────────────────────────────────────────────────

/// One inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferRequest {
    /// Reference voice recording.
    pub ref_audio: PathBuf,
    /// Transcript of `ref_audio`.
    pub ref_text: String,
    /// Text to speak.
    pub gen_text: String,
    /// Diffusion steps.
    pub step: u32,
    pub speed: f32,
    /// Classifier-free guidance strength.
    pub cfg: f32,
    /// Total output duration in seconds, reference included. `None` lets the
    /// engine estimate it.
    pub fix_duration: Option<f32>,
}

/// A text-to-speech backend producing mono audio at [`SAMPLE_RATE`].
pub trait SpeechEngine: Send + Sync {
    fn infer(&self, request: &InferRequest) -> Result<Vec<f32>>;
}

/// Placeholder engine: a quiet sine tone whose length follows the request.
///
/// Used when no real model is embedded so the rest of the pipeline can run.
#[derive(Debug, Clone)]
pub struct ToneEngine {
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for ToneEngine {
    fn default() -> Self {
        Self { frequency: 220.0, amplitude: 0.1 }
    }
}

impl ToneEngine {
    /// Seconds of audio produced for `request`.
    pub fn duration(request: &InferRequest) -> f32 {
        if let Some(d) = request.fix_duration {
            return d;
        }
        let speed = if request.speed > 0.0 { request.speed } else { 1.0 };
        let chars = request.gen_text.chars().count() as f32;
        (chars * 0.1 / speed).max(0.5)
    }
}

impl SpeechEngine for ToneEngine {
    fn infer(&self, request: &InferRequest) -> Result<Vec<f32>> {
        let n = (Self::duration(request) * SAMPLE_RATE as f32) as usize;
        let step = 2.0 * PI * self.frequency / SAMPLE_RATE as f32;
        Ok((0..n).map(|i| (i as f32 * step).sin() * self.amplitude).collect())
    }
}

type EngineLoader = dyn Fn(&str) -> Result<Arc<dyn SpeechEngine>> + Send + Sync;

/// Loaded engines keyed by model version. Each version is loaded at most once.
pub struct EngineCache {
    loader: Box<EngineLoader>,
    engines: Mutex<HashMap<String, Arc<dyn SpeechEngine>>>,
}

impl EngineCache {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn SpeechEngine>> + Send + Sync + 'static,
    {
        Self { loader: Box::new(loader), engines: Mutex::new(HashMap::new()) }
    }

    /// Every version resolves to a [`ToneEngine`].
    pub fn tone() -> Self {
        Self::new(|_| Ok(Arc::new(ToneEngine::default()) as Arc<dyn SpeechEngine>))
    }

    /// Cached engine for `version`, loading it on first use.
    pub fn get(&self, version: &str) -> Result<Arc<dyn SpeechEngine>> {
        let mut engines = self.engines.lock();
        if let Some(engine) = engines.get(version) {
            return Ok(engine.clone());
        }
        info!(version, "Loading speech engine");
        let engine = (self.loader)(version)
            .with_context(|| format!("cannot load speech engine {}", version))?;
        engines.insert(version.to_string(), engine.clone());
        Ok(engine)
    }

    pub fn len(&self) -> usize {
        self.engines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every loaded engine.
    pub fn clear(&self) {
        self.engines.lock().clear();
    }
}

impl std::fmt::Debug for EngineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let versions: Vec<String> = self.engines.lock().keys().cloned().collect();
        f.debug_struct("EngineCache").field("versions", &versions).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Audio post-processing and duration heuristics.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Fade applied to a single-shot (unsplit) output.
    pub fade_duration: f32,
    /// Fade applied to each segment clip.
    pub clip_fade_duration: f32,
    /// Fade applied to each inter-segment pause.
    pub pause_fade_duration: f32,
    pub silence_threshold: f32,
    /// Context kept around trimmed clips, in seconds.
    pub silence_padding: f32,
    pub min_pause: f32,
    pub max_pause: f32,
    /// Segments with fewer chars get a forced duration.
    pub short_text_chars: usize,
    /// Added to the reference duration for short segments.
    pub short_text_extra: f32,
    /// Added to the reference duration when retrying a silent clip.
    pub retry_extra: f32,
    /// Clips whose peak stays below this are considered silent.
    pub silent_peak: f32,
    /// Used when the reference audio duration cannot be read.
    pub fallback_ref_duration: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            fade_duration: 0.02,
            clip_fade_duration: 0.05,
            pause_fade_duration: 0.02,
            silence_threshold: 0.005,
            silence_padding: 0.02,
            min_pause: 0.07,
            max_pause: 0.14,
            short_text_chars: 15,
            short_text_extra: 2.0,
            retry_extra: 6.0,
            silent_peak: 0.01,
            fallback_ref_duration: 5.0,
        }
    }
}

impl SynthesisConfig {
    /// Pause length before clip `index + 1`, spread over `[min_pause, max_pause]`.
    pub fn pause_duration(&self, index: usize) -> f32 {
        // golden-ratio low-discrepancy sequence
        let frac = (index as f32 * 0.618_034).fract();
        self.min_pause + (self.max_pause - self.min_pause).max(0.0) * frac
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters of one synthesis job.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub ref_text: String,
    pub ref_audio: PathBuf,
    /// Normalise numbers, times and lexicon words before synthesis.
    pub use_norm: bool,
    /// Split into segments and synthesise them one by one.
    pub use_auto_split: bool,
    pub step: u32,
    pub speed: f32,
    pub cfg: f32,
}

/// Drives a [`SpeechEngine`] with text from a [`FrontEnd`].
#[derive(Debug, Clone)]
pub struct Synthesizer {
    front_end: Arc<FrontEnd>,
    config: SynthesisConfig,
}

impl Synthesizer {
    pub fn new(front_end: Arc<FrontEnd>, config: SynthesisConfig) -> Self {
        Self { front_end, config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn front_end(&self) -> &Arc<FrontEnd> {
        &self.front_end
    }

    fn ref_duration(&self, path: &Path) -> f32 {
        match read_wav_duration(path) {
            Ok(d) => {
                debug!(seconds = d, "Reference duration");
                d
            }
            Err(e) => {
                warn!("Could not read reference duration of {}: {}", path.display(), e);
                self.config.fallback_ref_duration
            }
        }
    }

    fn infer_request(&self, request: &SynthesisRequest, gen_text: String, fix_duration: Option<f32>) -> InferRequest {
        InferRequest {
            ref_audio: request.ref_audio.clone(),
            ref_text: request.ref_text.clone(),
            gen_text,
            step: request.step,
            speed: request.speed,
            cfg: request.cfg,
            fix_duration,
        }
    }

    /// Synthesise `request` into a single mono waveform at [`SAMPLE_RATE`].
    pub fn synthesize(&self, engine: &dyn SpeechEngine, request: &SynthesisRequest) -> Result<Vec<f32>> {
        if request.use_auto_split {
            self.synthesize_segments(engine, request)
        } else {
            self.synthesize_single(engine, request)
        }
    }

    fn synthesize_single(&self, engine: &dyn SpeechEngine, request: &SynthesisRequest) -> Result<Vec<f32>> {
        let gen_text = if request.use_norm {
            self.front_end.normalize(&request.text).text
        } else {
            request.text.clone()
        };
        info!("Generating: {}", preview(&gen_text));

        let mut audio = engine
            .infer(&self.infer_request(request, gen_text, None))
            .context("speech engine failed")?;
        apply_fade(&mut audio, self.config.fade_duration);
        Ok(audio)
    }

    fn synthesize_segments(&self, engine: &dyn SpeechEngine, request: &SynthesisRequest) -> Result<Vec<f32>> {
        let cfg = &self.config;
        let ref_duration = self.ref_duration(&request.ref_audio);
        let segments = self.front_end.intelligent_split(&request.text);
        info!(segments = segments.len(), "Split input");

        let mut output: Vec<f32> = Vec::new();
        let mut clips = 0usize;
        for (i, segment) in segments.iter().enumerate() {
            let gen_text = if request.use_norm {
                self.front_end.normalize(segment).text
            } else {
                segment.clone()
            };
            if gen_text.trim().is_empty() {
                continue;
            }
            debug!("[{}/{}] Generating: {}", i + 1, segments.len(), gen_text);

            let is_short = gen_text.chars().count() < cfg.short_text_chars;
            let forced = is_short.then(|| ref_duration + cfg.short_text_extra);
            if let Some(d) = forced {
                debug!(seconds = d, "Short segment, forcing duration");
            }

            let mut wav = engine
                .infer(&self.infer_request(request, gen_text.clone(), forced))
                .with_context(|| format!("speech engine failed on segment {}", i + 1))?;

            if peak(&wav) < cfg.silent_peak {
                warn!("Silent output for segment {}, retrying with longer duration", i + 1);
                wav = engine
                    .infer(&self.infer_request(request, gen_text, Some(ref_duration + cfg.retry_extra)))
                    .with_context(|| format!("speech engine failed on segment {} retry", i + 1))?;
            }

            let original_len = wav.len();
            let mut wav = trim_silence(&wav, cfg.silence_threshold, cfg.silence_padding);
            if wav.len() < original_len {
                debug!("Trimmed: {} -> {} samples", original_len, wav.len());
            }
            apply_fade(&mut wav, cfg.clip_fade_duration);

            if clips > 0 {
                let mut pause = silence(cfg.pause_duration(clips - 1));
                apply_fade(&mut pause, cfg.pause_fade_duration);
                output.extend(pause);
            }
            output.extend(wav);
            clips += 1;
        }

        if clips == 0 {
            bail!("No audio generated from segments");
        }
        Ok(output)
    }
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(50).collect();
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns `len` samples of 0.5; the first call may return silence.
    struct ScriptedEngine {
        len: usize,
        silent_first: bool,
        calls: Mutex<Vec<InferRequest>>,
    }

    impl ScriptedEngine {
        fn new(len: usize, silent_first: bool) -> Self {
            Self { len, silent_first, calls: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> Vec<InferRequest> {
            self.calls.lock().clone()
        }
    }

    impl SpeechEngine for ScriptedEngine {
        fn infer(&self, request: &InferRequest) -> Result<Vec<f32>> {
            let mut calls = self.calls.lock();
            calls.push(request.clone());
            if self.silent_first && calls.len() == 1 {
                return Ok(vec![0.0; self.len]);
            }
            Ok(vec![0.5; self.len])
        }
    }

    struct FailingEngine;

    impl SpeechEngine for FailingEngine {
        fn infer(&self, _request: &InferRequest) -> Result<Vec<f32>> {
            bail!("model exploded")
        }
    }

    fn synthesizer() -> Synthesizer {
        Synthesizer::new(Arc::new(FrontEnd::bundled().unwrap()), SynthesisConfig::default())
    }

    fn request(text: &str, use_auto_split: bool) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            ref_text: "สวัสดีครับ".to_string(),
            // missing file: the fallback reference duration (5 s) applies
            ref_audio: PathBuf::from("/nonexistent/thaitts-reference.wav"),
            use_norm: true,
            use_auto_split,
            step: 32,
            speed: 1.0,
            cfg: 2.0,
        }
    }

    #[test]
    fn test_single_shot_normalizes() {
        let engine = ScriptedEngine::new(2_400, false);
        let audio = synthesizer().synthesize(&engine, &request("5", false)).unwrap();
        assert_eq!(audio.len(), 2_400);
        assert_eq!(audio[0], 0.0); // faded in

        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].gen_text, "ห้า");
        assert_eq!(calls[0].fix_duration, None);
    }

    #[test]
    fn test_single_shot_without_norm_passes_raw_text() {
        let engine = ScriptedEngine::new(100, false);
        let mut req = request("5", false);
        req.use_norm = false;
        synthesizer().synthesize(&engine, &req).unwrap();
        assert_eq!(engine.calls()[0].gen_text, "5");
    }

    #[test]
    fn test_short_segment_forces_duration() {
        let engine = ScriptedEngine::new(2_400, false);
        synthesizer().synthesize(&engine, &request("สวัสดี", true)).unwrap();
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].fix_duration, Some(7.0));
    }

    #[test]
    fn test_long_segment_not_forced() {
        let engine = ScriptedEngine::new(2_400, false);
        synthesizer()
            .synthesize(&engine, &request("สวัสดีครับยินดีต้อนรับขอบคุณ", true))
            .unwrap();
        assert_eq!(engine.calls()[0].fix_duration, None);
    }

    #[test]
    fn test_silent_output_is_retried() {
        let engine = ScriptedEngine::new(2_400, true);
        let audio = synthesizer().synthesize(&engine, &request("สวัสดี", true)).unwrap();
        let calls = engine.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].fix_duration, Some(11.0));
        assert!(peak(&audio) > 0.4, "got: {}", peak(&audio));
    }

    #[test]
    fn test_pause_between_segments() {
        let engine = ScriptedEngine::new(2_400, false);
        let audio = synthesizer().synthesize(&engine, &request("หนึ่ง สอง", true)).unwrap();
        assert_eq!(engine.calls().len(), 2);
        // first pause is min_pause: 0.07 s = 1 680 samples
        assert_eq!(audio.len(), 2_400 + 1_680 + 2_400);
        assert!(audio[2_400..2_400 + 1_680].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let engine = ScriptedEngine::new(2_400, false);
        let audio = synthesizer().synthesize(&engine, &request("สวัสดี น.", true)).unwrap();
        assert_eq!(engine.calls().len(), 1);
        assert_eq!(audio.len(), 2_400);
    }

    #[test]
    fn test_no_segments_is_error() {
        let engine = ScriptedEngine::new(2_400, false);
        assert!(synthesizer().synthesize(&engine, &request("   ", true)).is_err());
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_engine_error_propagates() {
        let err = synthesizer().synthesize(&FailingEngine, &request("สวัสดี", true)).unwrap_err();
        assert!(format!("{:#}", err).contains("model exploded"), "got: {:#}", err);
    }

    #[test]
    fn test_pause_duration_in_range() {
        let cfg = SynthesisConfig::default();
        for i in 0..50 {
            let d = cfg.pause_duration(i);
            assert!((cfg.min_pause..=cfg.max_pause).contains(&d), "got: {}", d);
        }
        assert_eq!(cfg.pause_duration(3), cfg.pause_duration(3));
    }

    #[test]
    fn test_tone_engine_duration() {
        let mut req = InferRequest {
            ref_audio: PathBuf::new(),
            ref_text: String::new(),
            gen_text: "ก".repeat(20),
            step: 32,
            speed: 1.0,
            cfg: 2.0,
            fix_duration: None,
        };
        assert!((ToneEngine::duration(&req) - 2.0).abs() < 1e-6);
        req.gen_text = "ก".into();
        assert_eq!(ToneEngine::duration(&req), 0.5);
        req.fix_duration = Some(3.0);
        let audio = ToneEngine::default().infer(&req).unwrap();
        assert_eq!(audio.len(), 72_000);
        assert!(peak(&audio) <= 0.1 + 1e-6);
    }

    #[test]
    fn test_engine_cache_loads_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let cache = EngineCache::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ToneEngine::default()) as Arc<dyn SpeechEngine>)
        });
        cache.get("v1").unwrap();
        cache.get("v1").unwrap();
        cache.get("v2").unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_engine_cache_load_error() {
        let cache = EngineCache::new(|v| bail!("no such model {}", v));
        assert!(cache.get("v9").is_err());
        assert!(cache.is_empty());
    }
}
