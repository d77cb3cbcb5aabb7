//! Basic thaitts example: normalise, plan segments and synthesise with the
//! placeholder tone engine.
//!
//! Usage:
//!   cargo run --example basic
//!   cargo run --example basic -- --text "ขบวนรถออกเวลา 18.45 น." --output out.wav
//!
//! Set `LEXICON_PATH` to a JSON/CSV lexicon to try custom pronunciations.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use thaitts::{
    audio::write_wav,
    synth::{SynthesisConfig, SynthesisRequest, Synthesizer, ToneEngine},
    FrontEnd, FrontEndConfig,
};

fn main() -> anyhow::Result<()> {
    // ── Parse simple CLI arguments ───────────────────────────────────────────
    let mut args = std::env::args().skip(1);

    let mut text = "รถไฟฟ้าสถานี 5 ออกเวลา 5:30 น. วันที่ 18/12/2567".to_string();
    let mut output = "output.wav".to_string();
    let mut reference = "data/reference.wav".to_string();
    let mut split = true;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--text"      => { if let Some(v) = args.next() { text      = v; } }
            "--output"    => { if let Some(v) = args.next() { output    = v; } }
            "--reference" => { if let Some(v) = args.next() { reference = v; } }
            "--no-split"  => { split = false; }
            "--help"      => {
                println!("Usage: basic [--text TEXT] [--output FILE] [--reference WAV] [--no-split]");
                return Ok(());
            }
            _ => {}
        }
    }

    // ── Text front end ───────────────────────────────────────────────────────
    let front_end = Arc::new(
        FrontEnd::load(FrontEndConfig::from_env()).context("cannot load dictionary")?,
    );
    println!("Lexicon entries : {}", front_end.lexicon_len());
    println!("Text            : {:?}", text);

    let normalized = front_end.normalize(&text);
    println!("Normalized      : {:?}", normalized.text);
    println!("Tokens          : {:?}", normalized.tokens);

    println!("Segments:");
    for (i, segment) in front_end.intelligent_split(&text).iter().enumerate() {
        println!("  [{}] {}", i + 1, segment);
    }

    // ── Synthesis ────────────────────────────────────────────────────────────
    let synthesizer = Synthesizer::new(front_end, SynthesisConfig::default());
    let request = SynthesisRequest {
        text,
        ref_text: String::new(),
        ref_audio: PathBuf::from(reference),
        use_norm: true,
        use_auto_split: split,
        step: 32,
        speed: 1.0,
        cfg: 2.0,
    };
    let audio = synthesizer.synthesize(&ToneEngine::default(), &request)?;
    write_wav(&audio, std::path::Path::new(&output))?;

    println!(
        "\nWrote {:.2}s of audio to {}",
        audio.len() as f32 / thaitts::SAMPLE_RATE as f32,
        output
    );
    Ok(())
}
