//! File operations on the board's filesystem.
//!
//! Pre-conditions (`NotFound`, `AlreadyExists`, `InvalidPath`) are checked on
//! the host before any command that changes the remote filesystem is sent.

use std::io::{Read, Write};

use picox_protocol::{
    encode_upload, is_safe_remote_path, listing_command, normalize_download, parse_listing,
    split_remote_path, Command,
};
use tracing::{debug, info};

use crate::commands::{CREATE_DIR, DELETE_PATH, DOWNLOAD_FILE, UPLOAD_FILE};
use crate::error::{Result, SessionError};
use crate::session::Session;

/// Reject paths that cannot be substituted into a command template.
pub(crate) fn validate_remote_path(path: &str) -> Result<()> {
    if is_safe_remote_path(path) {
        Ok(())
    } else {
        Err(SessionError::InvalidPath(path.to_string()))
    }
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl Session {
    /// List a directory on the board, the current directory when `None`.
    pub fn list_dir(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        if let Some(path) = path {
            validate_remote_path(path)?;
        }
        // A missing directory raises in the REPL and prints a traceback.
        let output = self.run_python(&listing_command(path), false)?;
        Ok(parse_listing(&output)?)
    }

    /// Check whether a file or directory exists, using its parent's listing.
    ///
    /// A missing parent directory means the path does not exist either.
    pub fn exists(&mut self, path: &str) -> Result<bool> {
        validate_remote_path(path)?;
        let (parent, name) = split_remote_path(path);
        let listing = match self.list_dir(parent) {
            Ok(listing) => listing,
            Err(SessionError::Remote(e)) if parent.is_some() && e.is_missing_path() => {
                debug!(parent: self.transport.span(), "parent of {} does not exist", path);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        Ok(listing.iter().any(|entry| entry == name))
    }

    /// Download a text file into `sink`, with line endings normalised to `\n`.
    ///
    /// Returns the number of bytes written to the sink.
    pub fn download<W: Write>(&mut self, remote: &str, sink: &mut W) -> Result<usize> {
        if !self.exists(remote)? {
            return Err(SessionError::NotFound(remote.to_string()));
        }
        debug!(parent: self.transport.span(), "downloading {}", remote);
        let output = self.run(&Command::new(DOWNLOAD_FILE.render(&[remote])?))?;
        let text = normalize_download(&output);
        sink.write_all(text.as_bytes())?;
        sink.flush()?;
        Ok(text.len())
    }

    /// Upload bytes to `remote`.
    ///
    /// An existing target is only replaced when `overwrite` is set; otherwise
    /// the call fails with `AlreadyExists` and nothing is sent.
    pub fn upload(&mut self, data: &[u8], remote: &str, overwrite: bool) -> Result<()> {
        if self.exists(remote)? {
            if !overwrite {
                return Err(SessionError::AlreadyExists(remote.to_string()));
            }
            self.remove(remote, false)?;
        }
        info!(parent: self.transport.span(), "uploading {} bytes to {}", data.len(), remote);
        let command = UPLOAD_FILE.render(&[&encode_upload(data), remote])?;
        self.run(&Command::new(command))?;
        Ok(())
    }

    /// Upload everything `source` yields to `remote`.
    pub fn upload_from<R: Read>(&mut self, mut source: R, remote: &str, overwrite: bool) -> Result<()> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        self.upload(&data, remote, overwrite)
    }

    /// Create a directory.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        validate_remote_path(path)?;
        self.run(&Command::new(CREATE_DIR.render(&[path])?))?;
        Ok(())
    }

    /// Delete a file or directory.
    ///
    /// A non-empty directory needs `recursive`, which removes everything
    /// below it deepest first before removing the directory itself.
    pub fn delete(&mut self, path: &str, recursive: bool) -> Result<()> {
        if !self.exists(path)? {
            return Err(SessionError::NotFound(path.to_string()));
        }
        self.remove(path, recursive)
    }

    fn remove(&mut self, path: &str, recursive: bool) -> Result<()> {
        debug!(parent: self.transport.span(), "deleting {} (recursive: {})", path, recursive);
        let command = DELETE_PATH.render(&[path, python_bool(recursive)])?;
        self.run(&Command::new(command))?;
        Ok(())
    }
}
