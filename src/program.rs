//! Programs linked from reloadable shader units.

use std::collections::HashSet;
use std::fmt;

use crate::{
    GpuBackend, ProgramEvents, ProgramState, RendererId, ReplaceableProgram, ShaderError,
    ShaderId, ShaderUnit,
};

/// Handle to a [`RendererProgram`] registered in a
/// [`ShaderManager`](crate::ShaderManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) usize);

/// A program built from a fixed, ordered set of shader units.
///
/// Relinking always uses each unit's *current* compiled object, so it picks up
/// whatever the latest successful compile of every stage was. The previous
/// program is retired only once the new one linked; a failed relink leaves it
/// active and untouched.
pub struct RendererProgram<B: GpuBackend> {
    name: String,
    units: Box<[ShaderId]>,
    slot: ReplaceableProgram<B::Program>,
}

impl<B: GpuBackend> RendererProgram<B> {
    /// Create the program and perform its first link.
    pub(crate) fn load_from(
        name: String,
        units: Vec<ShaderId>,
        shaders: &[ShaderUnit<B>],
        backend: &mut B,
        events: &mut ProgramEvents<B::Program>,
    ) -> Result<Self, ShaderError> {
        let mut program = Self {
            name,
            units: units.into_boxed_slice(),
            slot: ReplaceableProgram::new(),
        };
        program.reload(shaders, backend, events)?;
        Ok(program)
    }

    /// Registered name of the program.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The units the program is linked from, in link order.
    #[must_use]
    pub fn units(&self) -> &[ShaderId] {
        &self.units
    }

    /// Current link state.
    #[must_use]
    pub fn state(&self) -> ProgramState<B::Program> {
        self.slot.state()
    }

    /// The active linked program, if any.
    #[must_use]
    pub fn current(&self) -> Option<B::Program> {
        self.slot.program()
    }

    /// Renderers subscribed to this program.
    #[must_use]
    pub fn renderers(&self) -> &[RendererId] {
        self.slot.renderers()
    }

    /// Whether `unit` is one of this program's units.
    #[must_use]
    pub fn contains(&self, unit: ShaderId) -> bool {
        self.units.contains(&unit)
    }

    /// Whether any of `units` is one of this program's units.
    #[must_use]
    pub fn contains_any(&self, units: &HashSet<ShaderId>) -> bool {
        self.units.iter().any(|unit| units.contains(unit))
    }

    /// Link a new program from the units' current compiled objects and push it
    /// to every subscribed renderer.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::Link`] if the driver rejects the program; the
    /// previously active program stays in place.
    pub(crate) fn reload(
        &mut self,
        shaders: &[ShaderUnit<B>],
        backend: &mut B,
        events: &mut ProgramEvents<B::Program>,
    ) -> Result<(), ShaderError> {
        let compiled: Vec<B::Shader> = self
            .units
            .iter()
            .map(|id| shaders[id.0].compiled())
            .collect();
        let linked = backend
            .link_program(&compiled)
            .map_err(|log| ShaderError::Link {
                program: self.name.clone(),
                log,
            })?;
        self.slot.set_program(linked, true, backend, events);
        log::debug!("Linked program '{}' from {} units", self.name, compiled.len());
        Ok(())
    }

    /// Relink if `unit` is one of this program's units.
    pub(crate) fn reload_if_contains(
        &mut self,
        unit: ShaderId,
        shaders: &[ShaderUnit<B>],
        backend: &mut B,
        events: &mut ProgramEvents<B::Program>,
    ) -> Result<bool, ShaderError> {
        if !self.contains(unit) {
            return Ok(false);
        }
        self.reload(shaders, backend, events)?;
        Ok(true)
    }

    /// Relink if any of `units` is one of this program's units.
    pub(crate) fn reload_if_contains_any(
        &mut self,
        units: &HashSet<ShaderId>,
        shaders: &[ShaderUnit<B>],
        backend: &mut B,
        events: &mut ProgramEvents<B::Program>,
    ) -> Result<bool, ShaderError> {
        if !self.contains_any(units) {
            return Ok(false);
        }
        self.reload(shaders, backend, events)?;
        Ok(true)
    }

    pub(crate) fn use_on_renderer(
        &mut self,
        renderer: RendererId,
        events: &mut ProgramEvents<B::Program>,
    ) {
        self.slot.use_on_renderer(renderer, events);
    }

    pub(crate) fn remove_from_renderer(&mut self, renderer: RendererId) -> bool {
        self.slot.remove_from_renderer(renderer)
    }

    /// Dispose the active program; returns the renderers left without one.
    pub(crate) fn dispose(&mut self, backend: &mut B) -> Vec<RendererId> {
        self.slot.dispose(backend)
    }
}

impl<B: GpuBackend> fmt::Debug for RendererProgram<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererProgram")
            .field("name", &self.name)
            .field("units", &self.units)
            .field("state", &self.slot.state())
            .field("renderers", &self.slot.renderers())
            .finish()
    }
}
