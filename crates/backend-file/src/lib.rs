//! Filesystem backend: one human-readable file per id.
//!
//! Objects are stored as pretty-printed JSON at `{path}/{id}.json`, where
//! `path` comes from the `"path"` configuration key (default `"."`, must be
//! an existing directory at `init` time). Stores are whole-file overwrites
//! with no atomic-replace semantics.
//!
//! The crate is also built as a `cdylib` exporting the backend plugin ABI,
//! so the same implementation can be loaded through
//! `faultmap_backend::load_backend`.

use std::fs;
use std::path::{Path, PathBuf};

use faultmap_backend::{Backend, BackendConfig, BackendError, export_backend};
use faultmap_core::{Payload, Snapshot};
use tracing::debug;

/// Backend writing one JSON file per stored id.
#[derive(Debug)]
pub struct FileBackend {
	config: BackendConfig,
	path: PathBuf,
}

impl FileBackend {
	/// Creates a backend rooted at the current directory until configured.
	pub fn new() -> Self {
		Self {
			config: BackendConfig::default(),
			path: PathBuf::from("."),
		}
	}

	/// Directory the backend reads and writes.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn file_for(&self, id: &str) -> PathBuf {
		self.path.join(format!("{id}.json"))
	}
}

impl Default for FileBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl Backend for FileBackend {
	fn config_mut(&mut self) -> &mut BackendConfig {
		&mut self.config
	}

	fn init(&mut self) -> Result<(), BackendError> {
		if let Some(path) = self.config.text("path") {
			self.path = PathBuf::from(path);
			if !self.path.is_dir() {
				return Err(BackendError::Config(format!(
					"path not available: {}",
					self.path.display()
				)));
			}
		}
		Ok(())
	}

	fn load(&self, id: &str, out: &mut dyn Payload) -> Result<(), BackendError> {
		let file = self.file_for(id);
		if !file.exists() {
			return Err(BackendError::NotFound {
				id: id.to_string(),
			});
		}

		let text = fs::read_to_string(&file)?;
		let snapshot: Snapshot =
			serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))?;
		out.apply(&snapshot)?;
		debug!(id, path = %file.display(), "loaded state from file");
		Ok(())
	}

	fn store(&mut self, id: &str, payload: &dyn Payload) -> Result<(), BackendError> {
		let file = self.file_for(id);
		let text = serde_json::to_string_pretty(&payload.capture())
			.map_err(|e| BackendError::Encode(e.to_string()))?;
		fs::write(&file, text)?;
		debug!(id, path = %file.display(), "stored state to file");
		Ok(())
	}
}

export_backend!(FileBackend);
