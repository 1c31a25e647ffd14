//! The registry that owns every shader unit and program and runs reload
//! passes over them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::{
    FileSource, GpuBackend, ProgramBinding, ProgramEvents, ProgramId, RendererId, RendererProgram,
    RendererSink, ShaderError, ShaderId, ShaderReloadReport, ShaderSourceProvider, ShaderStage,
    ShaderUnit,
};

type ShaderNames = HashMap<ShaderStage, HashMap<String, ShaderId>>;

/// Selects the shader units of a new program by stage and name.
///
/// Passed to [`ShaderManager::register_program`]. Units are kept in the order
/// they were first selected; selecting a unit twice has no effect.
pub struct ProgramBuilder<'a> {
    names: &'a ShaderNames,
    units: Vec<ShaderId>,
}

impl<'a> ProgramBuilder<'a> {
    fn new(names: &'a ShaderNames) -> Self {
        Self {
            names,
            units: Vec::new(),
        }
    }

    /// Add the shader registered as `name` for every stage that has one.
    /// Stages without such a shader are skipped silently.
    pub fn try_all(&mut self, name: &str) -> &mut Self {
        for stage in ShaderStage::ALL {
            self.try_with(stage, name);
        }
        self
    }

    /// Add the `stage` shader registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::MissingShader`] if there is none.
    pub fn with(&mut self, stage: ShaderStage, name: &str) -> Result<&mut Self, ShaderError> {
        if self.try_with(stage, name) {
            Ok(self)
        } else {
            Err(ShaderError::MissingShader {
                stage,
                name: name.to_owned(),
            })
        }
    }

    /// Add the `stage` shader registered as `name` if there is one. Returns
    /// whether it was found.
    pub fn try_with(&mut self, stage: ShaderStage, name: &str) -> bool {
        let Some(&id) = self.names.get(&stage).and_then(|names| names.get(name)) else {
            return false;
        };
        if !self.units.contains(&id) {
            self.units.push(id);
        }
        true
    }

    /// Units selected so far.
    #[must_use]
    pub fn units(&self) -> &[ShaderId] {
        &self.units
    }
}

/// Owns named shader units and the programs linked from them, and keeps the
/// programs current as the units' sources change.
///
/// Everything runs synchronously on the thread that owns the graphics
/// context. Call [`try_reload_all`](Self::try_reload_all) between frames,
/// then [`dispatch`](Self::dispatch) to hand new programs to renderers.
///
/// # Example
///
/// ```no_run
/// # use shader_reload_gpu::{GlowBackend, RendererId, ShaderManager};
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>) -> Result<(), shader_reload_gpu::ShaderError> {
/// let mut shaders = ShaderManager::new(unsafe { GlowBackend::new(gl) });
/// shaders.add_file("shaders/sprite.vert")?;
/// shaders.add_file("shaders/sprite.frag")?;
/// let sprite = shaders.register_program("sprite", |b| {
///     b.try_all("sprite");
///     Ok(())
/// })?;
/// shaders.use_on_renderer(sprite, RendererId(0))?;
///
/// // Each frame:
/// let report = shaders.try_reload_all();
/// for error in report.errors() {
///     eprintln!("{error}");
/// }
/// shaders.dispatch(&mut |_renderer: RendererId, _program: glow::Program| {
///     // point `renderer` at `program`
/// });
/// # Ok(())
/// # }
/// ```
pub struct ShaderManager<B: GpuBackend> {
    backend: B,
    shaders: Vec<ShaderUnit<B>>,
    shader_names: ShaderNames,
    programs: Vec<RendererProgram<B>>,
    program_names: HashMap<String, ProgramId>,
    programs_by_shader: HashMap<ShaderId, Vec<ProgramId>>,
    events: ProgramEvents<B::Program>,
}

impl<B: GpuBackend> ShaderManager<B> {
    /// An empty registry compiling through `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            shaders: Vec::new(),
            shader_names: HashMap::new(),
            programs: Vec::new(),
            program_names: HashMap::new(),
            programs_by_shader: HashMap::new(),
            events: ProgramEvents::default(),
        }
    }

    /// The backend everything is compiled with.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend. Handles owned by the manager must not
    /// be disposed through it.
    #[must_use]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Compile a new unit from `source` and register it as `name` for
    /// `stage`.
    ///
    /// # Errors
    ///
    /// [`ShaderError::DuplicateShader`] if `name` is taken for `stage`, or the
    /// read/compile error of the initial load. Nothing is registered on error.
    pub fn add(
        &mut self,
        stage: ShaderStage,
        name: impl Into<String>,
        source: impl ShaderSourceProvider + 'static,
    ) -> Result<ShaderId, ShaderError> {
        let name = name.into();
        if self.find_shader(stage, &name).is_some() {
            return Err(ShaderError::DuplicateShader { stage, name });
        }

        let unit = ShaderUnit::load(&mut self.backend, stage, name.clone(), Box::new(source))?;
        let id = ShaderId(self.shaders.len());
        self.shaders.push(unit);
        self.shader_names.entry(stage).or_default().insert(name, id);
        Ok(id)
    }

    /// Register a shader file, taking the stage from its extension and the
    /// name from its stem: `shaders/basic.frag` becomes the fragment shader
    /// `basic`.
    ///
    /// # Errors
    ///
    /// [`ShaderError::UnknownStage`] for an unrecognised extension, otherwise
    /// as [`add`](Self::add).
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<ShaderId, ShaderError> {
        let path = path.as_ref();
        let stage = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ShaderStage::from_extension)
            .ok_or_else(|| ShaderError::UnknownStage {
                path: path.to_owned(),
            })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.add(stage, name, FileSource::new(path))
    }

    /// Build, link, and register a program named `name`.
    ///
    /// `build` selects the units through a [`ProgramBuilder`]; the program is
    /// linked once before this returns.
    ///
    /// # Errors
    ///
    /// [`ShaderError::DuplicateProgram`] if `name` is taken,
    /// [`ShaderError::EmptyProgram`] if no unit was selected, any error
    /// returned by `build`, or the link error of the first link. Nothing is
    /// registered on error.
    pub fn register_program<F>(
        &mut self,
        name: impl Into<String>,
        build: F,
    ) -> Result<ProgramId, ShaderError>
    where
        F: FnOnce(&mut ProgramBuilder<'_>) -> Result<(), ShaderError>,
    {
        let name = name.into();
        if self.program_names.contains_key(&name) {
            return Err(ShaderError::DuplicateProgram { name });
        }

        let mut builder = ProgramBuilder::new(&self.shader_names);
        build(&mut builder)?;
        let units = builder.units;
        if units.is_empty() {
            return Err(ShaderError::EmptyProgram { name });
        }

        let program = RendererProgram::load_from(
            name.clone(),
            units,
            &self.shaders,
            &mut self.backend,
            &mut self.events,
        )?;
        let id = ProgramId(self.programs.len());
        for &unit in program.units() {
            self.programs_by_shader.entry(unit).or_default().push(id);
        }
        log::debug!(
            "Registered program '{name}' with {} shader units",
            program.units().len()
        );
        self.programs.push(program);
        self.program_names.insert(name, id);
        Ok(id)
    }

    /// The unit behind `id`.
    #[must_use]
    pub fn shader(&self, id: ShaderId) -> Option<&ShaderUnit<B>> {
        self.shaders.get(id.0)
    }

    /// Look up a unit by stage and name.
    #[must_use]
    pub fn find_shader(&self, stage: ShaderStage, name: &str) -> Option<ShaderId> {
        self.shader_names.get(&stage)?.get(name).copied()
    }

    /// The program behind `id`.
    #[must_use]
    pub fn program(&self, id: ProgramId) -> Option<&RendererProgram<B>> {
        self.programs.get(id.0)
    }

    /// Look up a program by name.
    #[must_use]
    pub fn try_get_program(&self, name: &str) -> Option<ProgramId> {
        self.program_names.get(name).copied()
    }

    /// Programs that link `shader`, in registration order.
    #[must_use]
    pub fn programs_using(&self, shader: ShaderId) -> &[ProgramId] {
        self.programs_by_shader
            .get(&shader)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Number of registered shader units.
    #[must_use]
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Number of registered programs.
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Subscribe `renderer` to `program`. If the program is linked (always
    /// the case for registered programs), a binding is queued right away.
    ///
    /// # Errors
    ///
    /// [`ShaderError::UnknownProgram`] if `program` is not registered here.
    pub fn use_on_renderer(
        &mut self,
        program: ProgramId,
        renderer: RendererId,
    ) -> Result<(), ShaderError> {
        self.programs
            .get_mut(program.0)
            .ok_or(ShaderError::UnknownProgram(program))?
            .use_on_renderer(renderer, &mut self.events);
        Ok(())
    }

    /// Unsubscribe `renderer` from `program`. Returns whether it was
    /// subscribed.
    ///
    /// # Errors
    ///
    /// [`ShaderError::UnknownProgram`] if `program` is not registered here.
    pub fn remove_from_renderer(
        &mut self,
        program: ProgramId,
        renderer: RendererId,
    ) -> Result<bool, ShaderError> {
        Ok(self
            .programs
            .get_mut(program.0)
            .ok_or(ShaderError::UnknownProgram(program))?
            .remove_from_renderer(renderer))
    }

    /// Recompile one unit regardless of whether its source changed, then
    /// relink every program that uses it. Returns the number of programs
    /// relinked.
    ///
    /// # Errors
    ///
    /// The first compile or link error, unlike
    /// [`try_reload_all`](Self::try_reload_all). Programs visited before a
    /// link error keep their new link.
    pub fn reload_shader(&mut self, id: ShaderId) -> Result<usize, ShaderError> {
        self.shaders
            .get_mut(id.0)
            .ok_or(ShaderError::UnknownShader(id))?
            .reload(&mut self.backend)?;

        let mut relinked = 0;
        for &program in self.programs_by_shader.get(&id).map_or(&[][..], Vec::as_slice) {
            if self.programs[program.0].reload_if_contains(
                id,
                &self.shaders,
                &mut self.backend,
                &mut self.events,
            )? {
                relinked += 1;
            }
        }
        Ok(relinked)
    }

    /// Relink one program from its units' current compiled objects.
    ///
    /// # Errors
    ///
    /// [`ShaderError::UnknownProgram`], or the link error; the previous
    /// program then stays active.
    pub fn reload_program(&mut self, id: ProgramId) -> Result<(), ShaderError> {
        self.programs
            .get_mut(id.0)
            .ok_or(ShaderError::UnknownProgram(id))?
            .reload(&self.shaders, &mut self.backend, &mut self.events)
    }

    /// Reload every unit whose source changed, then relink every program that
    /// uses at least one reloaded unit.
    ///
    /// Each unit and each program is handled independently: a failure is
    /// logged, recorded in the report, and the pass moves on. A unit that
    /// fails to compile keeps its previous compiled object and does not count
    /// as reloaded, so its programs are not relinked for it.
    pub fn try_reload_all(&mut self) -> ShaderReloadReport {
        let mut errors = Vec::new();
        let mut reloaded = HashSet::new();

        for (index, unit) in self.shaders.iter_mut().enumerate() {
            match unit.reload_if_needed(&mut self.backend) {
                Ok(true) => {
                    log::info!("Reloaded {} shader '{}'", unit.stage(), unit.name());
                    reloaded.insert(ShaderId(index));
                }
                Ok(false) => {}
                Err(error) => {
                    log::warn!("Shader hot reload: {error}");
                    errors.push(error);
                }
            }
        }

        if reloaded.is_empty() {
            return if errors.is_empty() {
                ShaderReloadReport::NO_CHANGES
            } else {
                ShaderReloadReport::new(0, 0, errors)
            };
        }

        let affected: BTreeSet<ProgramId> = reloaded
            .iter()
            .filter_map(|unit| self.programs_by_shader.get(unit))
            .flatten()
            .copied()
            .collect();

        let mut relinked = 0;
        for id in affected {
            let program = &mut self.programs[id.0];
            match program.reload_if_contains_any(
                &reloaded,
                &self.shaders,
                &mut self.backend,
                &mut self.events,
            ) {
                Ok(true) => {
                    log::info!("Relinked program '{}'", program.name());
                    relinked += 1;
                }
                Ok(false) => {}
                Err(error) => {
                    log::warn!("Shader hot reload: {error}");
                    errors.push(error);
                }
            }
        }

        let report = ShaderReloadReport::new(reloaded.len(), relinked, errors);
        log::info!("Shader hot reload: {report}");
        report
    }

    /// Bindings queued since the last [`dispatch`](Self::dispatch).
    #[must_use]
    pub fn pending_bindings(&self) -> &[ProgramBinding<B::Program>] {
        self.events.bindings()
    }

    /// Hand every queued program change to `sink`, oldest first, then dispose
    /// the programs they replaced. Returns the number of bindings delivered.
    pub fn dispatch<S>(&mut self, sink: &mut S) -> usize
    where
        S: RendererSink<B::Program> + ?Sized,
    {
        self.events.dispatch(&mut self.backend, sink)
    }

    /// Dispose every program, then every shader unit, and return the backend.
    ///
    /// Undelivered bindings are dropped. Renderers still subscribed to a
    /// program are left holding a deleted handle; they are logged.
    pub fn dispose(mut self) -> B {
        for program in &mut self.programs {
            let orphaned = program.dispose(&mut self.backend);
            if !orphaned.is_empty() {
                log::debug!(
                    "Disposed program '{}' still used by {} renderer(s)",
                    program.name(),
                    orphaned.len()
                );
            }
        }
        self.events.discard(&mut self.backend);
        for unit in self.shaders.drain(..) {
            unit.dispose(&mut self.backend);
        }
        self.backend
    }
}

impl<B: GpuBackend> fmt::Debug for ShaderManager<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderManager")
            .field("shaders", &self.shaders)
            .field("programs", &self.programs)
            .field("pending_bindings", &self.events.bindings().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::MemorySource;

    fn manager() -> ShaderManager<MockBackend> {
        let mut manager = ShaderManager::new(MockBackend::default());
        for (stage, name) in [
            (ShaderStage::Vertex, "basic"),
            (ShaderStage::Fragment, "basic"),
            (ShaderStage::Fragment, "tinted"),
        ] {
            manager
                .add(stage, name, MemorySource::new(name, "void main() {}"))
                .unwrap();
        }
        manager
    }

    #[test]
    fn builder_try_all_collects_existing_stages() {
        let manager = manager();
        let mut builder = ProgramBuilder::new(&manager.shader_names);
        builder.try_all("basic");
        assert_eq!(builder.units(), &[ShaderId(0), ShaderId(1)]);
    }

    #[test]
    fn builder_with_missing_shader_fails() {
        let manager = manager();
        let mut builder = ProgramBuilder::new(&manager.shader_names);
        let err = builder.with(ShaderStage::Geometry, "basic").err().unwrap();
        assert!(matches!(
            err,
            ShaderError::MissingShader {
                stage: ShaderStage::Geometry,
                ..
            }
        ));
        assert!(builder.units().is_empty());
    }

    #[test]
    fn builder_try_with_reports_and_dedups() {
        let manager = manager();
        let mut builder = ProgramBuilder::new(&manager.shader_names);
        assert!(builder.try_with(ShaderStage::Fragment, "tinted"));
        assert!(builder.try_with(ShaderStage::Fragment, "tinted"));
        assert!(!builder.try_with(ShaderStage::Vertex, "tinted"));
        assert_eq!(builder.units(), &[ShaderId(2)]);
    }

    #[test]
    fn builder_with_chains() {
        let manager = manager();
        let mut builder = ProgramBuilder::new(&manager.shader_names);
        builder
            .with(ShaderStage::Vertex, "basic")
            .unwrap()
            .with(ShaderStage::Fragment, "tinted")
            .unwrap();
        assert_eq!(builder.units(), &[ShaderId(0), ShaderId(2)]);
    }

    #[test]
    fn reverse_index_tracks_programs() {
        let mut manager = manager();
        let basic = manager
            .register_program("basic", |b| {
                b.try_all("basic");
                Ok(())
            })
            .unwrap();
        let tinted = manager
            .register_program("tinted", |b| {
                b.with(ShaderStage::Vertex, "basic")?
                    .with(ShaderStage::Fragment, "tinted")?;
                Ok(())
            })
            .unwrap();

        assert_eq!(manager.programs_using(ShaderId(0)), &[basic, tinted]);
        assert_eq!(manager.programs_using(ShaderId(1)), &[basic]);
        assert_eq!(manager.programs_using(ShaderId(2)), &[tinted]);
    }
}
