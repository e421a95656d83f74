use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{render, render_instance, render_props, INPUTS_FILE, PROPS_FILE};
use crate::discovery::dedup::DedupOutcome;
use crate::discovery::types::ResolvedInstance;
use crate::error::{PilotError, PilotResult};

/// Filesystem operations used to publish the configuration
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
    fn append(&self, path: &Path, contents: &str) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn append(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(contents.as_bytes())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// How the output directory is updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the directory with freshly generated files
    Fresh,
    /// Keep the directory and append stanzas for instances not yet listed.
    /// Used when some instance could not be resolved, so that its existing
    /// stanzas survive.
    Append,
}

impl WriteMode {
    /// Append as soon as any instance (before dedup) lacks a valid log path
    pub fn for_instances(resolved: &[ResolvedInstance]) -> Self {
        if resolved.iter().all(|r| r.has_valid_log_path) {
            WriteMode::Fresh
        } else {
            WriteMode::Append
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub mode: WriteMode,
    pub directory: PathBuf,
    /// Instances whose stanzas were written
    pub written: Vec<String>,
    /// Instances already present in an existing inputs.conf (append mode)
    pub already_present: Vec<String>,
}

/// Publishes inputs.conf and props.conf into one directory
pub struct ConfigWriter {
    fs: Arc<dyn FileSystem>,
    directory: PathBuf,
}

impl ConfigWriter {
    pub fn new(fs: Arc<dyn FileSystem>, directory: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write the configuration for the instances `outcome` kept. `all` is the
    /// resolved list that was deduplicated, position for position; it selects
    /// the mode and drives append decisions.
    pub fn write(
        &self,
        all: &[ResolvedInstance],
        outcome: &DedupOutcome,
        index: &str,
        sourcetype: &str,
    ) -> PilotResult<WriteSummary> {
        match WriteMode::for_instances(all) {
            WriteMode::Fresh => self.write_fresh(&outcome.kept, index, sourcetype),
            WriteMode::Append => {
                warn!(
                    "Not every instance has a log path; keeping {} and appending new stanzas only",
                    self.directory.display()
                );
                self.write_append(all, outcome, index, sourcetype)
            }
        }
    }

    /// Stage both files next to the target, then swap the directories
    fn write_fresh(&self, kept: &[ResolvedInstance], index: &str, sourcetype: &str) -> PilotResult<WriteSummary> {
        let rendered = render(kept, index, sourcetype);
        let staging = self.sibling("staging");
        let previous = self.sibling("previous");

        if self.fs.exists(&staging) {
            self.fs
                .remove_dir_all(&staging)
                .map_err(|e| self.directory_error(e))?;
        }

        let staged = self
            .fs
            .create_dir_all(&staging)
            .and_then(|_| self.fs.write(&staging.join(PROPS_FILE), &rendered.props))
            .and_then(|_| self.fs.write(&staging.join(INPUTS_FILE), &rendered.inputs));
        if let Err(e) = staged {
            self.discard(&staging);
            return Err(self.directory_error(e));
        }

        let had_previous = self.fs.exists(&self.directory);
        if had_previous {
            if self.fs.exists(&previous) {
                if let Err(e) = self.fs.remove_dir_all(&previous) {
                    self.discard(&staging);
                    return Err(self.directory_error(e));
                }
            }
            if let Err(e) = self.fs.rename(&self.directory, &previous) {
                self.discard(&staging);
                return Err(self.directory_error(e));
            }
        }

        if let Err(e) = self.fs.rename(&staging, &self.directory) {
            if had_previous {
                if let Err(restore) = self.fs.rename(&previous, &self.directory) {
                    error!(
                        "Could not restore {} from {}: {}",
                        self.directory.display(),
                        previous.display(),
                        restore
                    );
                }
            }
            self.discard(&staging);
            return Err(self.directory_error(e));
        }

        if had_previous {
            self.discard(&previous);
        }

        info!("Wrote {} and {} to {}", PROPS_FILE, INPUTS_FILE, self.directory.display());
        Ok(WriteSummary {
            mode: WriteMode::Fresh,
            directory: self.directory.clone(),
            written: kept.iter().map(|k| k.name().to_string()).collect(),
            already_present: Vec::new(),
        })
    }

    /// Append stanzas for instances whose name does not occur in the current
    /// inputs.conf. The check is a plain substring match, so `INST1` also
    /// matches an existing `INST10` stanza.
    fn write_append(
        &self,
        all: &[ResolvedInstance],
        outcome: &DedupOutcome,
        index: &str,
        sourcetype: &str,
    ) -> PilotResult<WriteSummary> {
        let inputs_path = self.directory.join(INPUTS_FILE);
        let props_path = self.directory.join(PROPS_FILE);

        let existing_inputs = self.read_existing(&inputs_path)?;
        let existing_props = self.read_existing(&props_path)?;

        let mut inputs_addition = String::new();
        let mut written = Vec::new();
        let mut already_present = Vec::new();

        for (position, resolved) in all.iter().enumerate() {
            let name = resolved.name();
            if existing_inputs.contains(name) {
                debug!("{} already listed in {}", name, INPUTS_FILE);
                already_present.push(name.to_string());
                continue;
            }
            if !resolved.has_valid_log_path {
                error!("{} has no log path and no existing stanza", resolved.instance.full_name);
                return Err(PilotError::MissingLogPath {
                    instance: resolved.instance.full_name.clone(),
                });
            }
            if outcome.is_kept(position) {
                inputs_addition.push_str(&render_instance(resolved, index, sourcetype));
                written.push(name.to_string());
            }
        }

        let props_header = format!("[{}]", sourcetype);
        let props_addition = if existing_props.contains(&props_header) {
            String::new()
        } else {
            render_props(sourcetype)
        };

        self.fs
            .create_dir_all(&self.directory)
            .map_err(|e| self.directory_error(e))?;
        if !inputs_addition.is_empty() {
            self.fs
                .append(&inputs_path, &with_separator(&existing_inputs, &inputs_addition))?;
        }
        if !props_addition.is_empty() {
            let appended = self
                .fs
                .append(&props_path, &with_separator(&existing_props, &props_addition));
            if let Err(e) = appended {
                if !inputs_addition.is_empty() {
                    self.restore(&inputs_path, &existing_inputs);
                }
                return Err(e.into());
            }
        }

        info!(
            "Appended {} instance(s) to {}, {} already present",
            written.len(),
            inputs_path.display(),
            already_present.len()
        );
        Ok(WriteSummary {
            mode: WriteMode::Append,
            directory: self.directory.clone(),
            written,
            already_present,
        })
    }

    fn read_existing(&self, path: &Path) -> PilotResult<String> {
        if self.fs.exists(path) {
            Ok(self.fs.read_to_string(path)?)
        } else {
            Ok(String::new())
        }
    }

    /// `<parent>/.<name>.<suffix>`
    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .directory
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let sibling = format!(".{}.{}", name, suffix);
        match self.directory.parent() {
            Some(parent) => parent.join(sibling),
            None => PathBuf::from(sibling),
        }
    }

    /// Put a file back to the text it had before this run; empty means it did not exist
    fn restore(&self, path: &Path, previous: &str) {
        let restored = if previous.is_empty() {
            self.fs.remove_file(path)
        } else {
            self.fs.write(path, previous)
        };
        if let Err(e) = restored {
            error!("Could not restore {}: {}", path.display(), e);
        }
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = self.fs.remove_dir_all(path) {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }

    fn directory_error(&self, source: io::Error) -> PilotError {
        PilotError::OutputDirectory {
            path: self.directory.clone(),
            source,
        }
    }
}

/// Make sure appended text starts on a fresh line
fn with_separator(existing: &str, addition: &str) -> String {
    if existing.is_empty() || existing.ends_with('\n') {
        addition.to_string()
    } else {
        format!("\n{}", addition)
    }
}
