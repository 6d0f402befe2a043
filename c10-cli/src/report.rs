//! Output sinks for search results
//!
//! Two streams exist: the result sink (stdout or a user-chosen file) receives
//! each scanned file's path followed by its correlated timestamps; the report
//! stream (stdout) receives raw values and ARINC-429 dumps. Every write is a
//! whole line (or whole block) under the stream's lock, so parallel scans
//! never interleave partial lines.

use crate::search::MatchRecord;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Indentation of match lines under a file heading
const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

type Sink = Mutex<Box<dyn Write + Send>>;

pub struct Output {
    results: Sink,
    report: Sink,
    format: OutputFormat,
}

impl Output {
    pub fn new(
        results: Box<dyn Write + Send>,
        report: Box<dyn Write + Send>,
        format: OutputFormat,
    ) -> Self {
        Self {
            results: Mutex::new(results),
            report: Mutex::new(report),
            format,
        }
    }

    /// Results and report both go to standard output
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stdout()), format)
    }

    /// Results go to `path`; refuses to touch an existing file unless `force`
    pub fn to_file(path: &Path, force: bool, format: OutputFormat) -> Result<Self> {
        let file = open_result_file(path, force)?;
        Ok(Self::new(Box::new(file), Box::new(io::stdout()), format))
    }

    /// Start one file's output
    ///
    /// In text format the file's path heads its block in the result sink;
    /// JSON records name their file instead. Without `grouped`, lines are
    /// written as they arrive. With `grouped`, the heading and lines are held
    /// back and written as one block by [`FileWriter::finish`], so concurrent
    /// scans never mix their lines.
    pub fn begin_file<'a>(&'a self, path: &'a Path, grouped: bool) -> io::Result<FileWriter<'a>> {
        let mut writer = FileWriter {
            output: self,
            path,
            block: grouped.then(Block::default),
        };
        if self.format == OutputFormat::Txt {
            let heading = format!("{}\n", path.display());
            match &mut writer.block {
                Some(block) => block.results.extend_from_slice(heading.as_bytes()),
                None => write_locked(&self.results, heading.as_bytes())?,
            }
        }
        Ok(writer)
    }

    fn result_line(&self, path: &Path, record: &MatchRecord) -> io::Result<String> {
        Ok(match self.format {
            OutputFormat::Txt => format!("{}{}\n", INDENT, record.to_text()),
            OutputFormat::Json => format!("{}\n", to_json(path, record)?),
        })
    }

    fn report_line(&self, path: &Path, record: &MatchRecord) -> io::Result<String> {
        Ok(match self.format {
            OutputFormat::Txt => format!("{}\n", record.to_text()),
            OutputFormat::Json => format!("{}\n", to_json(path, record)?),
        })
    }
}

#[derive(Default)]
struct Block {
    results: Vec<u8>,
    report: Vec<u8>,
}

/// Writes the output of one scanned file
pub struct FileWriter<'a> {
    output: &'a Output,
    path: &'a Path,
    block: Option<Block>,
}

impl FileWriter<'_> {
    /// Write a match line under the file's heading in the result sink
    pub fn result(&mut self, record: &MatchRecord) -> io::Result<()> {
        let line = self.output.result_line(self.path, record)?;
        match &mut self.block {
            Some(block) => block.results.extend_from_slice(line.as_bytes()),
            None => write_locked(&self.output.results, line.as_bytes())?,
        }
        Ok(())
    }

    /// Write a record to the report stream
    pub fn report(&mut self, record: &MatchRecord) -> io::Result<()> {
        let line = self.output.report_line(self.path, record)?;
        match &mut self.block {
            Some(block) => block.report.extend_from_slice(line.as_bytes()),
            None => write_locked(&self.output.report, line.as_bytes())?,
        }
        Ok(())
    }

    /// Write any held-back block
    ///
    /// Both sinks are locked (results first) for the whole block, so when
    /// they share a terminal the report lines stay under their heading.
    pub fn finish(self) -> io::Result<()> {
        let Some(block) = self.block else {
            return Ok(());
        };
        let mut results = lock(&self.output.results)?;
        results.write_all(&block.results)?;
        results.flush()?;
        if !block.report.is_empty() {
            let mut report = lock(&self.output.report)?;
            report.write_all(&block.report)?;
            report.flush()?;
        }
        Ok(())
    }
}

fn lock(sink: &Sink) -> io::Result<MutexGuard<'_, Box<dyn Write + Send>>> {
    sink.lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "output lock poisoned"))
}

fn write_locked(sink: &Sink, bytes: &[u8]) -> io::Result<()> {
    let mut writer = lock(sink)?;
    writer.write_all(bytes)?;
    writer.flush()
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    file: &'a Path,
    #[serde(flatten)]
    record: &'a MatchRecord,
}

fn to_json(path: &Path, record: &MatchRecord) -> io::Result<String> {
    serde_json::to_string(&JsonRecord { file: path, record }).map_err(io::Error::from)
}

/// Open the result file, enforcing the overwrite rule
///
/// An existing file is only accepted with `force`, and is then truncated.
pub fn open_result_file(path: &Path, force: bool) -> Result<File> {
    if path.exists() && !force {
        bail!("Output file exists, use -f to overwrite: {}", path.display());
    }
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open output file: {}", path.display()))
}
