//! A program slot that renderers subscribe to.
//!
//! Renderers are never called directly. Every change to a slot is recorded as
//! [`ProgramBinding`]s in a [`ProgramEvents`] queue. A replaced program that a
//! renderer may still hold is parked there until the bindings have been
//! delivered. See
//! [`ShaderManager::dispatch`](crate::ShaderManager::dispatch).

use crate::GpuBackend;

/// Caller-chosen identity of a renderer that draws with a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(pub u64);

/// Whether a slot currently holds a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState<P> {
    /// Nothing has been linked yet (or the slot was disposed).
    Unlinked,
    /// The active program.
    Linked(P),
}

impl<P: Copy> ProgramState<P> {
    /// The linked program, if any.
    #[must_use]
    pub fn program(&self) -> Option<P> {
        match *self {
            Self::Unlinked => None,
            Self::Linked(program) => Some(program),
        }
    }
}

/// "Renderer `renderer` must now draw with `program`."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramBinding<P> {
    /// The renderer to reconfigure.
    pub renderer: RendererId,
    /// Its new program.
    pub program: P,
}

/// Receives program changes for renderers.
pub trait RendererSink<P> {
    /// Make `renderer` use `program` from now on.
    fn set_shader_program(&mut self, renderer: RendererId, program: P);
}

impl<P, F> RendererSink<P> for F
where
    F: FnMut(RendererId, P),
{
    fn set_shader_program(&mut self, renderer: RendererId, program: P) {
        self(renderer, program);
    }
}

/// Pending renderer bindings plus the programs they replace.
#[derive(Debug)]
pub struct ProgramEvents<P> {
    bindings: Vec<ProgramBinding<P>>,
    retired: Vec<P>,
}

impl<P> Default for ProgramEvents<P> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            retired: Vec::new(),
        }
    }
}

impl<P: Copy> ProgramEvents<P> {
    /// Bindings not yet delivered, oldest first.
    #[must_use]
    pub fn bindings(&self) -> &[ProgramBinding<P>] {
        &self.bindings
    }

    /// Programs waiting to be disposed once the bindings are delivered.
    #[must_use]
    pub fn retired(&self) -> &[P] {
        &self.retired
    }

    /// Deliver every binding to `sink` in order, then dispose the retired
    /// programs. Returns the number of bindings delivered.
    pub fn dispatch<B, S>(&mut self, backend: &mut B, sink: &mut S) -> usize
    where
        B: GpuBackend<Program = P>,
        S: RendererSink<P> + ?Sized,
    {
        let delivered = self.bindings.len();
        for binding in self.bindings.drain(..) {
            sink.set_shader_program(binding.renderer, binding.program);
        }
        for program in self.retired.drain(..) {
            backend.dispose_program(program);
        }
        delivered
    }

    /// Drop undelivered bindings and dispose the retired programs.
    pub(crate) fn discard<B>(&mut self, backend: &mut B)
    where
        B: GpuBackend<Program = P>,
    {
        self.bindings.clear();
        for program in self.retired.drain(..) {
            backend.dispose_program(program);
        }
    }

    fn refers_to(&self, program: P) -> bool
    where
        P: PartialEq,
    {
        self.bindings.iter().any(|binding| binding.program == program)
    }

    fn bind(&mut self, renderer: RendererId, program: P) {
        self.bindings.push(ProgramBinding { renderer, program });
    }
}

/// The active program of one logical shader, plus the renderers using it.
#[derive(Debug)]
pub struct ReplaceableProgram<P> {
    state: ProgramState<P>,
    renderers: Vec<RendererId>,
}

impl<P> Default for ReplaceableProgram<P> {
    fn default() -> Self {
        Self {
            state: ProgramState::Unlinked,
            renderers: Vec::new(),
        }
    }
}

impl<P: Copy + Eq> ReplaceableProgram<P> {
    /// An unlinked slot with no renderers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current link state.
    #[must_use]
    pub fn state(&self) -> ProgramState<P> {
        self.state
    }

    /// The active program, if linked.
    #[must_use]
    pub fn program(&self) -> Option<P> {
        self.state.program()
    }

    /// Renderers subscribed to this slot, in subscription order.
    #[must_use]
    pub fn renderers(&self) -> &[RendererId] {
        &self.renderers
    }

    /// Install `program` and queue a binding for every subscribed renderer.
    ///
    /// With `dispose_previous`, the replaced program is disposed. While a
    /// renderer is subscribed or an undelivered binding still names it, it is
    /// retired into `events` and disposed once the bindings are dispatched;
    /// otherwise it is disposed right away. Without `dispose_previous` the
    /// caller keeps ownership of it.
    pub fn set_program<B>(
        &mut self,
        program: P,
        dispose_previous: bool,
        backend: &mut B,
        events: &mut ProgramEvents<P>,
    ) where
        B: GpuBackend<Program = P>,
    {
        let previous = std::mem::replace(&mut self.state, ProgramState::Linked(program));
        for &renderer in &self.renderers {
            events.bind(renderer, program);
        }
        if let ProgramState::Linked(old) = previous {
            if dispose_previous && old != program {
                if self.renderers.is_empty() && !events.refers_to(old) {
                    backend.dispose_program(old);
                } else {
                    events.retired.push(old);
                }
            }
        }
    }

    /// Subscribe `renderer`. If a program is linked, the renderer is bound to
    /// it right away; otherwise it is configured on the next
    /// [`set_program`](Self::set_program). Subscribing twice has no effect.
    pub fn use_on_renderer(&mut self, renderer: RendererId, events: &mut ProgramEvents<P>) {
        if self.renderers.contains(&renderer) {
            return;
        }
        self.renderers.push(renderer);
        if let ProgramState::Linked(program) = self.state {
            events.bind(renderer, program);
        }
    }

    /// Unsubscribe `renderer`. The renderer keeps whatever program it was
    /// last given. Returns `false` if it was not subscribed.
    pub fn remove_from_renderer(&mut self, renderer: RendererId) -> bool {
        let before = self.renderers.len();
        self.renderers.retain(|&r| r != renderer);
        self.renderers.len() != before
    }

    /// Dispose the active program and return to [`ProgramState::Unlinked`].
    ///
    /// Returns the renderers that are still subscribed: they now hold a
    /// deleted program and must be given a new one by the caller.
    pub fn dispose<B>(&mut self, backend: &mut B) -> Vec<RendererId>
    where
        B: GpuBackend<Program = P>,
    {
        if let ProgramState::Linked(program) =
            std::mem::replace(&mut self.state, ProgramState::Unlinked)
        {
            backend.dispose_program(program);
        }
        self.renderers.clone()
    }
}
