//! Shared integration test helpers.
//!
//! Include with `mod common;` at the top of a test file.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use shader_reload_gpu::{GpuBackend, RendererId, RendererSink, ShaderStage};

/// Compiled shader name handed out by [`RecordingBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockShader(pub u32);

/// Linked program name handed out by [`RecordingBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockProgram(pub u32);

/// A backend that keeps track of every object it creates and deletes.
///
/// Any source containing `#error` fails to compile; `fail_link` makes every
/// link fail. Deleting an object twice, or linking a deleted shader, panics.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next: u32,
    pub live_shaders: BTreeSet<MockShader>,
    pub live_programs: BTreeSet<MockProgram>,
    pub compiles: usize,
    pub links: Vec<Vec<MockShader>>,
    pub fail_link: bool,
}

impl GpuBackend for RecordingBackend {
    type Shader = MockShader;
    type Program = MockProgram;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<MockShader, String> {
        self.compiles += 1;
        if source.contains("#error") {
            return Err(format!("0:1({stage}): error: unexpected #error"));
        }
        self.next += 1;
        let shader = MockShader(self.next);
        self.live_shaders.insert(shader);
        Ok(shader)
    }

    fn link_program(&mut self, shaders: &[MockShader]) -> Result<MockProgram, String> {
        for shader in shaders {
            assert!(
                self.live_shaders.contains(shader),
                "linking deleted shader {shader:?}"
            );
        }
        if self.fail_link {
            return Err("error: linking failed".to_owned());
        }
        self.links.push(shaders.to_vec());
        self.next += 1;
        let program = MockProgram(self.next);
        self.live_programs.insert(program);
        Ok(program)
    }

    fn dispose_shader(&mut self, shader: MockShader) {
        assert!(
            self.live_shaders.remove(&shader),
            "shader {shader:?} deleted twice"
        );
    }

    fn dispose_program(&mut self, program: MockProgram) {
        assert!(
            self.live_programs.remove(&program),
            "program {program:?} deleted twice"
        );
    }
}

/// Records every program each renderer was told to use.
#[derive(Debug, Default)]
pub struct RecordingRenderers {
    pub received: HashMap<RendererId, Vec<MockProgram>>,
}

impl RecordingRenderers {
    /// The last program `renderer` was given.
    pub fn current(&self, renderer: RendererId) -> Option<MockProgram> {
        self.received.get(&renderer).and_then(|p| p.last().copied())
    }

    /// How many times `renderer` was reconfigured.
    pub fn calls(&self, renderer: RendererId) -> usize {
        self.received.get(&renderer).map_or(0, Vec::len)
    }
}

impl RendererSink<MockProgram> for RecordingRenderers {
    fn set_shader_program(&mut self, renderer: RendererId, program: MockProgram) {
        self.received.entry(renderer).or_default().push(program);
    }
}

pub const VALID_SOURCE: &str = "#version 140\nvoid main() {}\n";
pub const BROKEN_SOURCE: &str = "#version 140\n#error broken\n";

/// Push a file's modification time forward so pollers see a change even on
/// file systems with coarse timestamps.
pub fn bump_mtime(path: &Path, by_secs: u64) {
    let file = File::options()
        .write(true)
        .open(path)
        .expect("Failed to open shader file");
    let modified = file
        .metadata()
        .and_then(|m| m.modified())
        .expect("Failed to read modification time");
    file.set_modified(modified + Duration::from_secs(by_secs))
        .expect("Failed to set modification time");
}
