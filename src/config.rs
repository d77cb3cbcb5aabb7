//! Server settings from CLI flags with environment-variable fallbacks.

use std::path::PathBuf;

use clap::Parser;

use crate::{frontend::FrontEndConfig, synth::SynthesisConfig};

/// Thai TTS HTTP server.
#[derive(Debug, Clone, Parser)]
#[command(name = "thaitts-server", version, about)]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Root of the data directory.
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Where saved results go [default: $DATA_DIR/test_results].
    #[arg(long, env = "RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Custom pronunciation lexicon [default: $DATA_DIR/stations_600.json].
    #[arg(long, env = "LEXICON_PATH")]
    pub lexicon_path: Option<PathBuf>,

    /// Word list for segmentation; the bundled list is used when unset.
    #[arg(long, env = "VOCABULARY_PATH")]
    pub vocabulary_path: Option<PathBuf>,

    /// Reference voice used when a request uploads none [default: $DATA_DIR/reference.wav].
    #[arg(long, env = "DEFAULT_REF_AUDIO_PATH")]
    pub default_ref_audio_path: Option<PathBuf>,

    /// Engine version preloaded at startup.
    #[arg(long, env = "CURRENT_MODEL_VERSION", default_value = "v2")]
    pub model_version: String,

    #[arg(long, env = "DEFAULT_STEPS", default_value_t = 32)]
    pub default_steps: u32,

    #[arg(long, env = "DEFAULT_SPEED", default_value_t = 1.0)]
    pub default_speed: f32,

    #[arg(long, env = "DEFAULT_CFG", default_value_t = 2.0)]
    pub default_cfg: f32,

    #[arg(long, env = "FADE_DURATION", default_value_t = 0.02)]
    pub fade_duration: f32,

    #[arg(long, env = "SILENCE_THRESHOLD", default_value_t = 0.005)]
    pub silence_threshold: f32,

    #[arg(long, env = "SILENCE_PADDING", default_value_t = 0.02)]
    pub silence_padding: f32,

    #[arg(long, env = "MIN_PAUSE_DURATION", default_value_t = 0.07)]
    pub min_pause: f32,

    #[arg(long, env = "MAX_PAUSE_DURATION", default_value_t = 0.14)]
    pub max_pause: f32,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn results_dir(&self) -> PathBuf {
        self.results_dir.clone().unwrap_or_else(|| self.data_dir.join("test_results"))
    }

    pub fn results_audio_dir(&self) -> PathBuf {
        self.results_dir().join("audio")
    }

    pub fn results_csv_path(&self) -> PathBuf {
        self.results_dir().join("results.csv")
    }

    /// Scratch space for uploaded reference audio.
    pub fn temp_dir(&self) -> PathBuf {
        self.data_dir.join("temp")
    }

    pub fn lexicon_path(&self) -> PathBuf {
        self.lexicon_path.clone().unwrap_or_else(|| self.data_dir.join("stations_600.json"))
    }

    pub fn default_ref_audio_path(&self) -> PathBuf {
        self.default_ref_audio_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("reference.wav"))
    }

    pub fn front_end_config(&self) -> FrontEndConfig {
        FrontEndConfig {
            lexicon_path: Some(self.lexicon_path()),
            vocabulary_path: self.vocabulary_path.clone(),
        }
    }

    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            fade_duration: self.fade_duration,
            silence_threshold: self.silence_threshold,
            silence_padding: self.silence_padding,
            min_pause: self.min_pause,
            max_pause: self.max_pause,
            ..SynthesisConfig::default()
        }
    }

    /// Default tracing filter directive.
    pub fn log_filter(&self) -> String {
        format!("thaitts={lvl},tower_http={lvl}", lvl = self.log_level)
    }
}
