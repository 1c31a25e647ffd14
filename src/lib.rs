//! Hot-reloadable shader programs for OpenGL renderers.
//!
//! This crate keeps a registry of named shader units and the programs linked
//! from them, and keeps those programs current while their sources are being
//! edited. A [`ShaderManager`] polls every unit's source, recompiles the ones
//! that changed, relinks only the programs that use them, and queues the new
//! programs for the renderers subscribed to each one.
//!
//! # Features
//!
//! - **Fault isolation**: a syntax error in one shader is reported in the
//!   [`ShaderReloadReport`] and never stops other shaders or programs from
//!   reloading in the same pass.
//! - **Never a dead program**: a unit keeps its previous compiled object when
//!   a recompile fails, a program keeps its previous link when a relink fails,
//!   and a replaced program is deleted only after every renderer has been
//!   handed its successor.
//! - **Scoped relinks**: a reverse index from units to programs limits each
//!   pass to the programs that actually changed.
//! - **Backend-agnostic core**: compilation goes through [`GpuBackend`];
//!   [`GlowBackend`] implements it for OpenGL via [glow] (`glow` feature, on
//!   by default).
//! - **Streaming geometry**: [`MeshBuilder`] and, with `glow`, growable GL
//!   stream buffers for the renderers drawing with these programs.
//!
//! # Threading
//!
//! Everything is synchronous and must run on the thread that owns the graphics
//! context. Reload between frames, never during draw calls.
//!
//! [glow]: https://docs.rs/glow

mod backend;
mod buffer;
mod error;
mod manager;
mod program;
mod replaceable;
mod report;
mod source;
mod stage;
mod unit;

#[cfg(feature = "glow")]
pub use backend::GlowBackend;
pub use backend::GpuBackend;
#[cfg(feature = "glow")]
pub use buffer::{MeshBuffers, StreamBuffer};
pub use buffer::{grown_capacity, MeshBuilder, MIN_BUFFER_CAPACITY};
pub use error::ShaderError;
pub use manager::{ProgramBuilder, ShaderManager};
pub use program::{ProgramId, RendererProgram};
pub use replaceable::{
    ProgramBinding, ProgramEvents, ProgramState, RendererId, RendererSink, ReplaceableProgram,
};
pub use report::ShaderReloadReport;
pub use source::{FileSource, MemorySource, ShaderSourceProvider};
pub use stage::ShaderStage;
pub use unit::{ShaderId, ShaderUnit};
