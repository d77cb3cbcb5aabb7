//! Saved listening-test results: a WAV per utterance plus one CSV log.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::info;

/// Column order of `results.csv`.
pub const CSV_HEADER: [&str; 8] = [
    "timestamp", "text", "model", "speed", "step", "cfg", "gen_time", "filename",
];

/// Metadata recorded with a saved utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub text: String,
    pub model_version: String,
    pub speed: f32,
    pub step: u32,
    pub cfg: f32,
    /// Generation time reported by the client, in seconds.
    pub gen_time: f32,
}

/// `<results>/audio/*.wav` plus `<results>/results.csv`.
#[derive(Debug)]
pub struct ResultStore {
    audio_dir: PathBuf,
    csv_path: PathBuf,
    // serialises appends to the CSV log
    lock: Mutex<()>,
}

impl ResultStore {
    pub fn new(results_dir: &Path) -> Self {
        Self {
            audio_dir: results_dir.join("audio"),
            csv_path: results_dir.join("results.csv"),
            lock: Mutex::new(()),
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Store `audio` as `<YYYYmmdd_HHMMSS>_<ID>.wav` and log `record`.
    /// Returns the file name.
    pub fn save(&self, record: &ResultRecord, audio: &[u8]) -> Result<String> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let id = utterance_id();
        let filename = format!("{}_{}.wav", timestamp, id);

        fs::create_dir_all(&self.audio_dir)
            .with_context(|| format!("cannot create {}", self.audio_dir.display()))?;
        let path = self.audio_dir.join(&filename);
        fs::write(&path, audio).with_context(|| format!("cannot write {}", path.display()))?;

        let row = [
            timestamp,
            record.text.clone(),
            record.model_version.clone(),
            record.speed.to_string(),
            record.step.to_string(),
            record.cfg.to_string(),
            format!("{:.2}", record.gen_time),
            filename.clone(),
        ];
        self.append_row(&row)?;

        info!("Saved result: {}", filename);
        Ok(filename)
    }

    fn append_row(&self, row: &[String]) -> Result<()> {
        let _guard = self.lock.lock();
        let exists = self.csv_path.is_file();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("cannot open {}", self.csv_path.display()))?;

        let mut buf = Vec::new();
        if !exists {
            write_csv_row(&mut buf, CSV_HEADER.iter().copied())?;
        }
        write_csv_row(&mut buf, row.iter().map(String::as_str))?;
        file.write_all(&buf)?;
        Ok(())
    }
}

/// Six uppercase hex chars from a random UUID.
fn utterance_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(6);
    id.to_uppercase()
}

/// Write one CSV cell, quoting only when needed.
fn quote_csv_cell<W: Write>(mut wtr: W, mut data: &[u8]) -> std::io::Result<()> {
    let mut output = [0; 4096];
    let mut writer = csv_core::Writer::new();
    loop {
        let (result, nin, nout) = writer.field(data, &mut output);
        wtr.write_all(&output[..nout])?;
        if result == csv_core::WriteResult::InputEmpty {
            break;
        }
        data = &data[nin..];
    }
    let (_, nout) = writer.finish(&mut output);
    wtr.write_all(&output[..nout])
}

fn write_csv_row<'a, W, I>(mut wtr: W, cells: I) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            wtr.write_all(b",")?;
        }
        quote_csv_cell(&mut wtr, cell.as_bytes())?;
    }
    wtr.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> ResultRecord {
        ResultRecord {
            text: text.to_string(),
            model_version: "v2".to_string(),
            speed: 1.0,
            step: 32,
            cfg: 2.0,
            gen_time: 1.234,
        }
    }

    #[test]
    fn test_csv_quoting() {
        let mut buf = Vec::new();
        write_csv_row(&mut buf, ["สถานี, 5", "a\"b", "plain"]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "\"สถานี, 5\",\"a\"\"b\",plain\n");
    }

    #[test]
    fn test_utterance_id_shape() {
        let id = utterance_id();
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()), "got: {}", id);
    }

    #[test]
    fn test_save_writes_audio_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(&dir.path().join("test_results"));

        let first = store.save(&record("สวัสดี"), b"RIFF-one").unwrap();
        let second = store.save(&record("ชานชาลา 2"), b"RIFF-two").unwrap();

        assert!(first.ends_with(".wav"));
        assert_eq!(fs::read(store.audio_dir().join(&first)).unwrap(), b"RIFF-one");
        assert_eq!(fs::read(store.audio_dir().join(&second)).unwrap(), b"RIFF-two");

        let log = fs::read_to_string(store.csv_path()).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 3, "got: {}", log);
        assert_eq!(lines[0], "timestamp,text,model,speed,step,cfg,gen_time,filename");
        assert!(lines[1].contains(",สวัสดี,v2,1,32,2,1.23,"), "got: {}", lines[1]);
        assert!(lines[2].ends_with(&second));
    }
}
