use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use modan_analysis::AnalysisSettings;
use modan_formats::{ImportOptions, ImportedDataset};
use modan_shape::Dataset;
use serde::Serialize;

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn save_text(text: &str, output_path: Option<PathBuf>) -> anyhow::Result<()> {
        let mut output = Output::from_output_path(output_path)?;
        output
            .write_all(text.as_bytes())
            .with_context(|| format!("Failed to write to {}", output.display_path()))?;
        output
            .flush()
            .with_context(|| format!("Failed to flush output to {}", output.display_path()))?;
        Ok(())
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        if let Output::File { path, .. } = self {
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Loads analysis settings from a JSON file, or the defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<AnalysisSettings> {
    match path {
        Some(path) => read_json_file("settings", path),
        None => Ok(AnalysisSettings::default()),
    }
}

/// Reads a landmark file, detecting its format from the extension.
pub fn read_landmark_file(
    path: &Path,
    settings: &AnalysisSettings,
) -> anyhow::Result<ImportedDataset> {
    let options = ImportOptions {
        dataset_name: None,
        invert_y: settings.invert_y,
    };
    modan_formats::read_path(path, &options)
        .with_context(|| format!("Failed to read landmark file: {}", path.display()))
}

/// Reads a landmark file into a validated dataset.
pub fn load_dataset(path: &Path, settings: &AnalysisSettings) -> anyhow::Result<Dataset> {
    let imported = read_landmark_file(path, settings)?;
    Dataset::from_imported(imported)
        .with_context(|| format!("Invalid landmark data in {}", path.display()))
}

/// Command result tagged with its source file and creation time.
#[derive(Debug, Serialize)]
pub struct Stamped<'a, T> {
    pub source: &'a Path,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: T,
}

impl<'a, T> Stamped<'a, T> {
    pub fn new(source: &'a Path, result: T) -> Self {
        Self {
            source,
            created_at: Utc::now(),
            result,
        }
    }
}
