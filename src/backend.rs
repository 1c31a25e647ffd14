//! The seam between the reload machinery and the graphics API.
//!
//! [`ShaderManager`](crate::ShaderManager) never talks to a driver directly.
//! It compiles, links, and deletes through a [`GpuBackend`], which keeps the
//! reload logic testable without a GL context. [`GlowBackend`] is the OpenGL
//! implementation.

use std::fmt;

use crate::ShaderStage;

/// Compiles and links shader objects on a graphics context.
///
/// Handles are plain copyable names (as GL object names are). Failures are
/// reported as the driver's info log.
pub trait GpuBackend {
    /// A compiled shader object for a single stage.
    type Shader: Copy + Eq + fmt::Debug;
    /// A linked program.
    type Program: Copy + Eq + fmt::Debug;

    /// Compile `source` for `stage`.
    ///
    /// # Errors
    ///
    /// Returns the driver's info log if compilation fails. No shader object is
    /// left behind in that case.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;

    /// Link a new program from already compiled shader objects.
    ///
    /// The shader objects stay alive and owned by the caller; they may be
    /// linked into other programs later.
    ///
    /// # Errors
    ///
    /// Returns the driver's info log if linking fails. No program object is
    /// left behind in that case.
    fn link_program(&mut self, shaders: &[Self::Shader]) -> Result<Self::Program, String>;

    /// Delete a shader object.
    fn dispose_shader(&mut self, shader: Self::Shader);

    /// Delete a program object.
    fn dispose_program(&mut self, program: Self::Program);
}

#[cfg(feature = "glow")]
pub use self::glow_backend::GlowBackend;

#[cfg(feature = "glow")]
mod glow_backend {
    use std::sync::Arc;

    use glow::HasContext;

    use super::GpuBackend;
    use crate::ShaderStage;

    /// [`GpuBackend`] over an OpenGL context via [glow].
    ///
    /// [glow]: https://docs.rs/glow
    pub struct GlowBackend {
        gl: Arc<glow::Context>,
    }

    impl GlowBackend {
        /// Wrap a GL context.
        ///
        /// # Safety
        ///
        /// The context must be valid and current on the calling thread for as
        /// long as the backend (or the manager owning it) is used.
        pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
            Self { gl }
        }

        /// The wrapped context, for issuing draw calls with the linked
        /// programs.
        #[must_use]
        pub fn context(&self) -> &Arc<glow::Context> {
            &self.gl
        }
    }

    // Every `unsafe` block below relies on the contract of `GlowBackend::new`.
    impl GpuBackend for GlowBackend {
        type Shader = glow::Shader;
        type Program = glow::Program;

        fn compile_shader(
            &mut self,
            stage: ShaderStage,
            source: &str,
        ) -> Result<glow::Shader, String> {
            let gl = &self.gl;
            unsafe {
                let shader = gl.create_shader(stage.gl_enum())?;
                gl.shader_source(shader, source);
                gl.compile_shader(shader);

                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    return Err(log);
                }

                Ok(shader)
            }
        }

        fn link_program(&mut self, shaders: &[glow::Shader]) -> Result<glow::Program, String> {
            let gl = &self.gl;
            unsafe {
                let program = gl.create_program()?;
                for &shader in shaders {
                    gl.attach_shader(program, shader);
                }
                gl.link_program(program);

                // Detached units stay valid for the next relink.
                for &shader in shaders {
                    gl.detach_shader(program, shader);
                }

                if !gl.get_program_link_status(program) {
                    let log = gl.get_program_info_log(program);
                    gl.delete_program(program);
                    return Err(log);
                }

                Ok(program)
            }
        }

        fn dispose_shader(&mut self, shader: glow::Shader) {
            unsafe { self.gl.delete_shader(shader) };
        }

        fn dispose_program(&mut self, program: glow::Program) {
            unsafe { self.gl.delete_program(program) };
        }
    }
}
