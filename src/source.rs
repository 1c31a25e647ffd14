//! Where shader text comes from, and how a change is noticed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use crate::ShaderError;

/// Supplies the source text of one shader unit and reports when it changes.
///
/// Polled once per reload pass by
/// [`ShaderUnit::reload_if_needed`](crate::ShaderUnit::reload_if_needed).
pub trait ShaderSourceProvider {
    /// Whether the text differs from what the last [`load`](Self::load)
    /// returned. A provider that was never loaded reports `true`.
    fn changed_since_last_load(&self) -> bool;

    /// Fetch the current text and mark it as seen.
    ///
    /// The changed state is cleared even if the caller later fails to compile
    /// the text, so a broken source is only retried once it changes again.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::SourceRead`] if the text cannot be fetched.
    fn load(&mut self) -> Result<String, ShaderError>;

    /// A short description of where the text lives, for log messages.
    fn origin(&self) -> String;
}

/// A shader file on disk, polled by modification time.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    loaded_at: Option<SystemTime>,
}

impl FileSource {
    /// Watch `path`. Nothing is read until the first [`load`](ShaderSourceProvider::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded_at: None,
        }
    }

    /// Path of the watched file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

impl ShaderSourceProvider for FileSource {
    fn changed_since_last_load(&self) -> bool {
        let Some(loaded_at) = self.loaded_at else {
            return true;
        };
        // A file that is briefly missing (editors saving via rename) is not a change.
        self.modified().is_some_and(|modified| modified != loaded_at)
    }

    fn load(&mut self) -> Result<String, ShaderError> {
        let read_error = |source| ShaderError::SourceRead {
            path: self.path.clone(),
            source,
        };
        let modified = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(read_error)?;
        let source = fs::read_to_string(&self.path).map_err(read_error)?;
        self.loaded_at = Some(modified);
        Ok(source)
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug)]
struct MemoryState {
    source: String,
    dirty: bool,
}

/// Shader text held in memory, e.g. generated at runtime or edited in an
/// in-app editor.
///
/// Clones share the same text: keep one clone to call
/// [`set_source`](Self::set_source) on after handing another to the manager.
#[derive(Debug, Clone)]
pub struct MemorySource {
    label: Arc<str>,
    state: Arc<RwLock<MemoryState>>,
}

impl MemorySource {
    /// Create a source with initial text. `label` only appears in logs.
    pub fn new(label: impl Into<Arc<str>>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Arc::new(RwLock::new(MemoryState {
                source: source.into(),
                dirty: true,
            })),
        }
    }

    /// Replace the text. The next reload pass picks it up.
    pub fn set_source(&self, source: impl Into<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.source = source.into();
        state.dirty = true;
    }

    /// A copy of the current text.
    #[must_use]
    pub fn source(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .source
            .clone()
    }
}

impl ShaderSourceProvider for MemorySource {
    fn changed_since_last_load(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).dirty
    }

    fn load(&mut self) -> Result<String, ShaderError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.dirty = false;
        Ok(state.source.clone())
    }

    fn origin(&self) -> String {
        format!("<memory:{}>", self.label)
    }
}
