//! Error type shared by every fallible operation in the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::{ProgramId, ShaderId, ShaderStage};

/// Everything that can go wrong while registering, compiling, or linking
/// shaders.
///
/// Registration errors (`Duplicate*`, `Missing*`, `EmptyProgram`, `Unknown*`)
/// are caller mistakes and are raised immediately. [`Compile`](Self::Compile),
/// [`Link`](Self::Link) and [`SourceRead`](Self::SourceRead) come from the
/// driver or the file system; during
/// [`ShaderManager::try_reload_all`](crate::ShaderManager::try_reload_all)
/// they are collected into the report instead of being returned.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// A shader with this stage and name is already registered.
    #[error("a {stage} shader named '{name}' is already registered")]
    DuplicateShader {
        /// Stage of the rejected shader.
        stage: ShaderStage,
        /// Name that was already taken.
        name: String,
    },

    /// A program with this name is already registered.
    #[error("a program named '{name}' is already registered")]
    DuplicateProgram {
        /// Name that was already taken.
        name: String,
    },

    /// The program builder required a shader that is not registered.
    #[error("no {stage} shader named '{name}' is registered")]
    MissingShader {
        /// Stage that was looked up.
        stage: ShaderStage,
        /// Name that was looked up.
        name: String,
    },

    /// The program builder did not select any shader.
    #[error("program '{name}' has no shader units")]
    EmptyProgram {
        /// Name of the rejected program.
        name: String,
    },

    /// A [`ShaderId`] that does not belong to this manager.
    #[error("unknown shader id {0:?}")]
    UnknownShader(ShaderId),

    /// A [`ProgramId`] that does not belong to this manager.
    #[error("unknown program id {0:?}")]
    UnknownProgram(ProgramId),

    /// The shader stage could not be derived from a file extension.
    #[error("cannot infer a shader stage from '{}'", path.display())]
    UnknownStage {
        /// Offending file path.
        path: PathBuf,
    },

    /// The shader source file could not be read.
    #[error("failed to read shader source '{}': {source}", path.display())]
    SourceRead {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The driver rejected a shader unit.
    #[error("failed to compile {stage} shader '{name}':\n{log}")]
    Compile {
        /// Stage of the failing unit.
        stage: ShaderStage,
        /// Registered name of the failing unit.
        name: String,
        /// Driver info log.
        log: String,
    },

    /// The driver could not link a program from its units.
    #[error("failed to link program '{program}':\n{log}")]
    Link {
        /// Registered name of the failing program.
        program: String,
        /// Driver info log.
        log: String,
    },
}
