//! Pipeline stages a shader unit can be compiled for.

use std::fmt;

/// One programmable stage of the graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment (pixel) shader.
    Fragment,
    /// Geometry shader.
    Geometry,
    /// Compute shader.
    Compute,
    /// Tessellation control shader.
    TessControl,
    /// Tessellation evaluation shader.
    TessEvaluation,
}

impl ShaderStage {
    /// Every stage, in pipeline declaration order.
    ///
    /// [`ProgramBuilder::try_all`](crate::ProgramBuilder::try_all) visits the
    /// stages in this order.
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::Geometry,
        ShaderStage::Compute,
        ShaderStage::TessControl,
        ShaderStage::TessEvaluation,
    ];

    /// Infer the stage from a conventional GLSL file extension.
    ///
    /// | Extension      | Stage                                      |
    /// |----------------|--------------------------------------------|
    /// | `vert`, `vs`   | [`Vertex`](Self::Vertex)                   |
    /// | `frag`, `fs`   | [`Fragment`](Self::Fragment)               |
    /// | `geom`, `gs`   | [`Geometry`](Self::Geometry)               |
    /// | `comp`, `cs`   | [`Compute`](Self::Compute)                 |
    /// | `tesc`         | [`TessControl`](Self::TessControl)         |
    /// | `tese`         | [`TessEvaluation`](Self::TessEvaluation)   |
    ///
    /// Matching ignores ASCII case.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let stage = match extension.to_ascii_lowercase().as_str() {
            "vert" | "vs" => Self::Vertex,
            "frag" | "fs" => Self::Fragment,
            "geom" | "gs" => Self::Geometry,
            "comp" | "cs" => Self::Compute,
            "tesc" => Self::TessControl,
            "tese" => Self::TessEvaluation,
            _ => return None,
        };
        Some(stage)
    }

    /// Lowercase human-readable name, used in logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Geometry => "geometry",
            Self::Compute => "compute",
            Self::TessControl => "tessellation control",
            Self::TessEvaluation => "tessellation evaluation",
        }
    }

    /// The `glCreateShader` enum for this stage.
    #[cfg(feature = "glow")]
    #[must_use]
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
            Self::Geometry => glow::GEOMETRY_SHADER,
            Self::Compute => glow::COMPUTE_SHADER,
            Self::TessControl => glow::TESS_CONTROL_SHADER,
            Self::TessEvaluation => glow::TESS_EVALUATION_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_extension_known_values() {
        assert_eq!(ShaderStage::from_extension("vert"), Some(ShaderStage::Vertex));
        assert_eq!(ShaderStage::from_extension("FRAG"), Some(ShaderStage::Fragment));
        assert_eq!(ShaderStage::from_extension("gs"), Some(ShaderStage::Geometry));
        assert_eq!(ShaderStage::from_extension("comp"), Some(ShaderStage::Compute));
        assert_eq!(ShaderStage::from_extension("tesc"), Some(ShaderStage::TessControl));
        assert_eq!(
            ShaderStage::from_extension("tese"),
            Some(ShaderStage::TessEvaluation)
        );
    }

    #[test]
    fn from_extension_unknown_is_none() {
        assert_eq!(ShaderStage::from_extension("glsl"), None);
        assert_eq!(ShaderStage::from_extension(""), None);
    }

    #[test]
    fn all_is_in_declaration_order() {
        let mut sorted = ShaderStage::ALL;
        sorted.sort();
        assert_eq!(sorted, ShaderStage::ALL);
    }

    #[test]
    fn display_uses_name() {
        assert_eq!(ShaderStage::TessControl.to_string(), "tessellation control");
    }
}
