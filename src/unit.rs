//! A single reloadable shader stage.

use std::fmt;

use crate::{GpuBackend, ShaderError, ShaderSourceProvider, ShaderStage};

/// Handle to a [`ShaderUnit`] registered in a
/// [`ShaderManager`](crate::ShaderManager).
///
/// Units are compared by id, never by name; the same unit may be linked into
/// any number of programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub(crate) usize);

/// One compiled shader stage together with the provider of its source.
///
/// The compiled object is replaced in place on every successful reload. A
/// reload that fails to compile leaves the previous object installed.
pub struct ShaderUnit<B: GpuBackend> {
    name: String,
    stage: ShaderStage,
    compiled: B::Shader,
    source: Box<dyn ShaderSourceProvider>,
}

impl<B: GpuBackend> ShaderUnit<B> {
    /// Load and compile a unit for the first time.
    pub(crate) fn load(
        backend: &mut B,
        stage: ShaderStage,
        name: String,
        mut source: Box<dyn ShaderSourceProvider>,
    ) -> Result<Self, ShaderError> {
        let compiled = compile(backend, stage, &name, source.as_mut())?;
        log::debug!("Compiled {stage} shader '{name}' from {}", source.origin());
        Ok(Self {
            name,
            stage,
            compiled,
            source,
        })
    }

    /// Registered name of the unit.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stage the unit is compiled for. Fixed at construction.
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// The currently installed compiled object.
    #[must_use]
    pub fn compiled(&self) -> B::Shader {
        self.compiled
    }

    /// Where the unit's text comes from.
    #[must_use]
    pub fn origin(&self) -> String {
        self.source.origin()
    }

    /// Whether the source reports a change that has not been loaded yet.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.source.changed_since_last_load()
    }

    /// Reload only if the source changed since the last load.
    ///
    /// Returns `Ok(true)` if a new compiled object was installed.
    ///
    /// # Errors
    ///
    /// Propagates read and compile failures; the previous compiled object
    /// stays installed.
    pub fn reload_if_needed(&mut self, backend: &mut B) -> Result<bool, ShaderError> {
        if !self.source.changed_since_last_load() {
            return Ok(false);
        }
        self.reload(backend)?;
        Ok(true)
    }

    /// Reload unconditionally.
    ///
    /// The old compiled object is disposed only after the new one compiled
    /// successfully.
    ///
    /// # Errors
    ///
    /// Propagates read and compile failures; the previous compiled object
    /// stays installed.
    pub fn reload(&mut self, backend: &mut B) -> Result<(), ShaderError> {
        let compiled = compile(backend, self.stage, &self.name, self.source.as_mut())?;
        let previous = std::mem::replace(&mut self.compiled, compiled);
        backend.dispose_shader(previous);
        log::debug!("Recompiled {} shader '{}'", self.stage, self.name);
        Ok(())
    }

    /// Delete the compiled object. The unit must not be used afterwards.
    pub(crate) fn dispose(self, backend: &mut B) {
        backend.dispose_shader(self.compiled);
    }
}

impl<B: GpuBackend> fmt::Debug for ShaderUnit<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderUnit")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("compiled", &self.compiled)
            .field("origin", &self.source.origin())
            .finish()
    }
}

fn compile<B: GpuBackend>(
    backend: &mut B,
    stage: ShaderStage,
    name: &str,
    source: &mut dyn ShaderSourceProvider,
) -> Result<B::Shader, ShaderError> {
    let text = source.load()?;
    backend
        .compile_shader(stage, &text)
        .map_err(|log| ShaderError::Compile {
            stage,
            name: name.to_owned(),
            log,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::MemorySource;

    fn unit(backend: &mut MockBackend, source: &MemorySource) -> ShaderUnit<MockBackend> {
        ShaderUnit::load(
            backend,
            ShaderStage::Fragment,
            "basic".to_owned(),
            Box::new(source.clone()),
        )
        .unwrap()
    }

    #[test]
    fn unchanged_source_is_not_reloaded() {
        let mut backend = MockBackend::default();
        let source = MemorySource::new("basic", "void main() {}");
        let mut unit = unit(&mut backend, &source);
        let before = unit.compiled();

        assert!(!unit.reload_if_needed(&mut backend).unwrap());
        assert_eq!(unit.compiled(), before);
    }

    #[test]
    fn changed_source_swaps_and_disposes_old_object() {
        let mut backend = MockBackend::default();
        let source = MemorySource::new("basic", "void main() {}");
        let mut unit = unit(&mut backend, &source);
        let before = unit.compiled();

        source.set_source("void main() { discard; }");
        assert!(unit.reload_if_needed(&mut backend).unwrap());
        assert_ne!(unit.compiled(), before);
        assert!(!backend.live_shaders.contains(&before));
        assert!(backend.live_shaders.contains(&unit.compiled()));
    }

    #[test]
    fn failed_compile_keeps_previous_object() {
        let mut backend = MockBackend::default();
        let source = MemorySource::new("basic", "void main() {}");
        let mut unit = unit(&mut backend, &source);
        let before = unit.compiled();

        source.set_source("error");
        let err = unit.reload_if_needed(&mut backend).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { ref name, .. } if name == "basic"));
        assert_eq!(unit.compiled(), before);
        assert!(backend.live_shaders.contains(&before));
        // Consumed: not retried until the text changes again.
        assert!(!unit.is_stale());
    }

    #[test]
    fn initial_compile_failure_is_reported() {
        let mut backend = MockBackend::default();
        let source = MemorySource::new("basic", "error");
        let result = ShaderUnit::load(
            &mut backend,
            ShaderStage::Vertex,
            "basic".to_owned(),
            Box::new(source),
        );
        assert!(result.is_err());
        assert!(backend.live_shaders.is_empty());
    }
}
