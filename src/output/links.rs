//! Discovered-link sinks

use crate::output::traits::{LinkSink, OutputError, OutputResult};
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use url::Url;

/// Appends one discovered URL per line to a file
///
/// The file is opened in append mode so a resumed crawl keeps extending the
/// same list.
pub struct FileLinkSink {
    writer: Mutex<LineWriter<File>>,
}

impl FileLinkSink {
    /// Opens (or creates) the output file for appending
    pub fn open(path: &Path) -> OutputResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(LineWriter::new(file)),
        })
    }
}

impl LinkSink for FileLinkSink {
    fn record(&self, url: &Url) -> OutputResult<()> {
        let mut writer = self.writer.lock().map_err(|_| OutputError::Poisoned)?;
        writeln!(writer, "{}", url)?;
        Ok(())
    }

    fn flush(&self) -> OutputResult<()> {
        let mut writer = self.writer.lock().map_err(|_| OutputError::Poisoned)?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps discovered URLs in memory
#[derive(Debug, Default)]
pub struct MemoryLinkSink {
    urls: Mutex<Vec<String>>,
}

impl MemoryLinkSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything recorded so far, in recording order
    pub fn urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LinkSink for MemoryLinkSink {
    fn record(&self, url: &Url) -> OutputResult<()> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        Ok(())
    }
}
