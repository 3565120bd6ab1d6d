use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

/// Persisted counter naming the generated image files.
///
/// The next id is written back as soon as it is handed out, before any
/// generation happens, so a run that fails later still consumes its id.
pub struct SequenceAllocator {
    path: PathBuf,
    initial: u64,
}

impl SequenceAllocator {
    pub fn new(path: impl Into<PathBuf>, initial: u64) -> Self {
        SequenceAllocator {
            path: path.into(),
            initial,
        }
    }

    pub fn next_id(&self) -> Result<u64> {
        let next = self.last_id() + 1;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, next.to_string())
            .with_context(|| format!("Failed to write counter file {}", self.path.display()))?;

        debug!("Allocated image id {}", next);
        Ok(next)
    }

    fn last_id(&self) -> u64 {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return self.initial,
        };

        match raw.trim().parse::<u64>() {
            Ok(last) => last,
            Err(e) => {
                warn!(
                    "Counter file {} is unreadable ({}), restarting from {}",
                    self.path.display(),
                    e,
                    self.initial
                );
                self.initial
            }
        }
    }
}

pub fn image_file_name(id: u64) -> String {
    format!("{id}.jpg")
}

/// Recorded next to the real image; no file is ever written under this name.
pub fn alt_image_file_name(id: u64) -> String {
    format!("{id}-1.jpg")
}
