use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::expand_path;
use crate::error::{EmitterError, Result};

/// Append-only NDJSON file
#[derive(Debug)]
pub struct FileTransport {
    path: PathBuf,
    file: File,
}

impl FileTransport {
    /// Create missing parent directories, then open for append
    pub fn open(path: &Path) -> Result<Self> {
        let path = expand_path(path);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| EmitterError::File {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| EmitterError::File {
                path: path.clone(),
                source,
            })?;

        log::info!("File transport appending to {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Payload and newline go out in one write
    pub fn send(&mut self, payload: &str) -> io::Result<()> {
        let mut line = String::with_capacity(payload.len() + 1);
        line.push_str(payload);
        line.push('\n');
        self.file.write_all(line.as_bytes())
    }
}
