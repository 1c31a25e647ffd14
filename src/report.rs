//! Outcome of a reload pass.

use std::fmt;

use crate::ShaderError;

/// What one [`ShaderManager::try_reload_all`](crate::ShaderManager::try_reload_all)
/// pass did.
///
/// Errors are collected rather than returned: one broken shader never stops
/// the rest of the pass. Logging or displaying them is up to the caller.
#[derive(Debug, Default)]
pub struct ShaderReloadReport {
    reloaded_shaders: usize,
    reloaded_programs: usize,
    errors: Vec<ShaderError>,
}

impl ShaderReloadReport {
    /// Nothing changed and nothing failed.
    pub const NO_CHANGES: ShaderReloadReport = ShaderReloadReport {
        reloaded_shaders: 0,
        reloaded_programs: 0,
        errors: Vec::new(),
    };

    pub(crate) fn new(
        reloaded_shaders: usize,
        reloaded_programs: usize,
        errors: Vec<ShaderError>,
    ) -> Self {
        Self {
            reloaded_shaders,
            reloaded_programs,
            errors,
        }
    }

    /// Number of shader units that recompiled successfully.
    #[must_use]
    pub fn reloaded_shader_count(&self) -> usize {
        self.reloaded_shaders
    }

    /// Number of programs that relinked successfully.
    #[must_use]
    pub fn reloaded_program_count(&self) -> usize {
        self.reloaded_programs
    }

    /// Failures encountered during the pass, in the order they happened.
    #[must_use]
    pub fn errors(&self) -> &[ShaderError] {
        &self.errors
    }

    /// Take ownership of the collected failures.
    #[must_use]
    pub fn into_errors(self) -> Vec<ShaderError> {
        self.errors
    }

    /// `true` if anything reloaded or anything failed.
    ///
    /// Distinguishes "nothing happened" from "we tried, and maybe some of it
    /// failed", so callers can skip logging on idle frames.
    #[must_use]
    pub fn tried_reloading_anything(&self) -> bool {
        self.reloaded_shaders > 0 || self.reloaded_programs > 0 || !self.errors.is_empty()
    }

    /// `true` if the pass found nothing to do.
    #[must_use]
    pub fn is_no_changes(&self) -> bool {
        !self.tried_reloading_anything()
    }
}

impl fmt::Display for ShaderReloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reloaded {} shader(s) and {} program(s)",
            self.reloaded_shaders, self.reloaded_programs
        )?;
        if !self.errors.is_empty() {
            write!(f, ", {} error(s)", self.errors.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShaderStage;

    #[test]
    fn no_changes_did_not_try_anything() {
        let report = ShaderReloadReport::NO_CHANGES;
        assert!(report.is_no_changes());
        assert!(!report.tried_reloading_anything());
        assert_eq!(report.to_string(), "reloaded 0 shader(s) and 0 program(s)");
    }

    #[test]
    fn errors_alone_count_as_trying() {
        let report = ShaderReloadReport::new(
            0,
            0,
            vec![ShaderError::Compile {
                stage: ShaderStage::Fragment,
                name: "sky".to_owned(),
                log: "0:1: syntax error".to_owned(),
            }],
        );
        assert!(report.tried_reloading_anything());
        assert_eq!(report.errors().len(), 1);
        assert_eq!(
            report.to_string(),
            "reloaded 0 shader(s) and 0 program(s), 1 error(s)"
        );
    }

    #[test]
    fn reload_counts_are_reported() {
        let report = ShaderReloadReport::new(2, 3, Vec::new());
        assert_eq!(report.reloaded_shader_count(), 2);
        assert_eq!(report.reloaded_program_count(), 3);
        assert!(report.tried_reloading_anything());
    }
}
