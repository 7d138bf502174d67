//! Dynamic loading of backend plugins.
//!
//! A backend plugin is a shared library exporting two C-linkage symbols:
//! a factory taking no arguments and returning an opaque backend handle,
//! and a destructor taking that handle and freeing it. Both symbols are
//! resolved before the factory runs, so resolution failures surface before
//! any backend exists. A backend produced this way holds a reference to the
//! library handle; the module stays mapped until the last backend created
//! from it is gone.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use faultmap_core::Payload;
use libloading::Symbol;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::backend::{Backend, SharedBackend};
use crate::config::BackendConfig;
use crate::error::{BackendError, PluginError};

/// Name of the exported factory symbol.
pub const CREATE_SYMBOL: &str = "faultmap_backend_create";

/// Name of the exported destructor symbol.
pub const DESTROY_SYMBOL: &str = "faultmap_backend_destroy";

/// Factory signature: no arguments, returns an opaque backend handle.
///
/// The handle is a leaked `Box<Box<dyn Backend>>`; host and plugin must be
/// built with the same toolchain for the trait layout to line up.
pub type CreateBackendFn = unsafe extern "C" fn() -> *mut c_void;

/// Destructor signature: consumes the handle produced by the factory.
pub type DestroyBackendFn = unsafe extern "C" fn(*mut c_void);

/// Options for [`Library::open`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
	/// Force the `C` locale (`LANG`, `LANGUAGE`, `LC_ALL`) before loading,
	/// so the module formats numbers deterministically.
	///
	/// This mutates the environment of the whole process, not just the
	/// loaded module, which is why it is off by default.
	pub force_c_locale: bool,
}

/// An open shared-library handle.
///
/// Reference-counted between the loader and every backend created from it;
/// dropping the last reference closes the module.
pub struct Library {
	inner: libloading::Library,
	path: PathBuf,
}

impl Library {
	/// Opens the shared library at `path`.
	pub fn open(path: impl AsRef<Path>, options: LoadOptions) -> Result<Arc<Self>, PluginError> {
		let path = path.as_ref().to_path_buf();
		if options.force_c_locale {
			force_c_locale();
		}

		let inner =
			unsafe { libloading::Library::new(&path) }.map_err(|e| PluginError::Library {
				path: path.clone(),
				reason: e.to_string(),
			})?;

		info!(path = %path.display(), "loaded backend library");
		Ok(Arc::new(Self { inner, path }))
	}

	/// Path the library was opened from.
	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl std::fmt::Debug for Library {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Library").field("path", &self.path).finish()
	}
}

/// Creates a backend through the library's factory symbol.
///
/// Both ABI symbols are resolved first; a missing symbol fails before any
/// backend is constructed. The returned backend routes its destruction
/// through the destructor symbol and keeps `library` alive for as long as
/// it exists.
pub fn load_backend(library: Arc<Library>) -> Result<SharedBackend, PluginError> {
	let (create, destroy) = unsafe {
		let create: Symbol<'_, CreateBackendFn> = library
			.inner
			.get(CREATE_SYMBOL.as_bytes())
			.map_err(|e| PluginError::Symbol {
				name: CREATE_SYMBOL,
				path: library.path.clone(),
				reason: e.to_string(),
			})?;
		let destroy: Symbol<'_, DestroyBackendFn> = library
			.inner
			.get(DESTROY_SYMBOL.as_bytes())
			.map_err(|e| PluginError::Symbol {
				name: DESTROY_SYMBOL,
				path: library.path.clone(),
				reason: e.to_string(),
			})?;
		(*create, *destroy)
	};

	let raw = unsafe { create() };
	if raw.is_null() {
		return Err(PluginError::Factory {
			path: library.path.clone(),
		});
	}

	debug!(path = %library.path.display(), "constructed plugin backend");
	Ok(Arc::new(Mutex::new(PluginBackend {
		raw: raw as *mut Box<dyn Backend>,
		destroy,
		library,
	})))
}

/// A backend living inside a loaded plugin library.
///
/// Delegates the whole [`Backend`] contract to the plugin-constructed
/// instance and frees it through the plugin's destructor symbol.
pub struct PluginBackend {
	raw: *mut Box<dyn Backend>,
	destroy: DestroyBackendFn,
	library: Arc<Library>,
}

impl PluginBackend {
	/// The library this backend was created from.
	pub fn library(&self) -> &Arc<Library> {
		&self.library
	}

	fn inner(&self) -> &dyn Backend {
		// SAFETY: `raw` came from the factory and stays valid until Drop.
		unsafe { &**self.raw }
	}

	fn inner_mut(&mut self) -> &mut dyn Backend {
		// SAFETY: as above, plus exclusive access through `&mut self`.
		unsafe { &mut **self.raw }
	}
}

impl Backend for PluginBackend {
	fn config_mut(&mut self) -> &mut BackendConfig {
		self.inner_mut().config_mut()
	}

	fn init(&mut self) -> Result<(), BackendError> {
		self.inner_mut().init()
	}

	fn load(&self, id: &str, out: &mut dyn Payload) -> Result<(), BackendError> {
		self.inner().load(id, out)
	}

	fn store(&mut self, id: &str, payload: &dyn Payload) -> Result<(), BackendError> {
		self.inner_mut().store(id, payload)
	}
}

impl Drop for PluginBackend {
	fn drop(&mut self) {
		// The plugin side frees what its factory allocated; `library` is
		// still referenced here, so the destructor code is still mapped.
		unsafe { (self.destroy)(self.raw as *mut c_void) };
	}
}

impl std::fmt::Debug for PluginBackend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PluginBackend")
			.field("library", &self.library.path)
			.finish()
	}
}

/// Returns the platform-specific shared-library filename for a backend
/// plugin, e.g. `libfaultmap_backend_file.so` on Linux.
pub fn backend_library_name(name: &str) -> String {
	let safe_name = name.replace('-', "_");
	#[cfg(target_os = "macos")]
	{
		format!("lib{safe_name}.dylib")
	}
	#[cfg(target_os = "windows")]
	{
		format!("{safe_name}.dll")
	}
	#[cfg(not(any(target_os = "macos", target_os = "windows")))]
	{
		format!("lib{safe_name}.so")
	}
}

fn force_c_locale() {
	for key in ["LANG", "LANGUAGE", "LC_ALL"] {
		// SAFETY: callers opt in explicitly; the crate documents the
		// single-threaded-cooperative model under which this runs.
		unsafe { std::env::set_var(key, "C") };
	}
}

/// Exports the two plugin ABI symbols for a backend type.
///
/// The type must implement `Default` and [`Backend`]. Host and plugin must
/// be built with the same toolchain; the handle passed across the boundary
/// is an opaque pointer owned by the plugin side.
#[macro_export]
macro_rules! export_backend {
	($backend:ty) => {
		#[unsafe(no_mangle)]
		pub extern "C" fn faultmap_backend_create() -> *mut ::std::ffi::c_void {
			let backend: Box<Box<dyn $crate::Backend>> =
				Box::new(Box::new(<$backend>::default()));
			Box::into_raw(backend) as *mut ::std::ffi::c_void
		}

		/// # Safety
		/// `raw` must be a handle obtained from `faultmap_backend_create`
		/// that has not been freed yet.
		#[unsafe(no_mangle)]
		pub unsafe extern "C" fn faultmap_backend_destroy(raw: *mut ::std::ffi::c_void) {
			if !raw.is_null() {
				drop(unsafe { Box::from_raw(raw as *mut Box<dyn $crate::Backend>) });
			}
		}
	};
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_library_fails_before_any_backend_exists() {
		let err = Library::open("/nonexistent/libfaultmap_test.so", LoadOptions::default())
			.unwrap_err();
		assert!(matches!(err, PluginError::Library { .. }));
	}

	#[test]
	fn load_options_default_leaves_the_locale_alone() {
		assert!(!LoadOptions::default().force_c_locale);
	}

	#[cfg(not(any(target_os = "macos", target_os = "windows")))]
	#[test]
	fn library_names_follow_the_platform_convention() {
		assert_eq!(
			backend_library_name("faultmap-backend-file"),
			"libfaultmap_backend_file.so"
		);
	}
}
