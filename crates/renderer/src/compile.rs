//! GLSL stage compilation.
//!
//! Each stage is parsed with naga's GLSL frontend and validated on the CPU
//! before any window or device exists, so a broken shader fails start-up with
//! the compiler's diagnostics instead of a GPU validation panic. Loose
//! `uniform` declarations are folded into the host block first (see
//! [`crate::preprocess`]); the rewritten source is what `wgpu` later builds the
//! actual shader module from.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::Write as _;

use wgpu::naga;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};

use crate::error::RendererError;
use crate::interface::ProgramInterface;
use crate::preprocess::HostBlock;
use crate::source::ShaderSources;
use crate::types::StageKind;

/// A stage that parsed and validated cleanly.
pub struct CompiledStage {
    stage: StageKind,
    source: String,
    module: naga::Module,
    info: ModuleInfo,
}

impl CompiledStage {
    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub(crate) fn module(&self) -> &naga::Module {
        &self.module
    }

    /// Whether the stage's entry point reads or writes `global`.
    ///
    /// Declared-but-unreferenced globals are inactive, the same way a GLSL
    /// linker strips unused uniforms.
    pub(crate) fn uses_global(&self, global: naga::Handle<naga::GlobalVariable>) -> bool {
        if self.module.entry_points.is_empty() {
            return false;
        }
        !self.info.get_entry_point(0)[global].is_empty()
    }

    /// Creates the `wgpu` shader module for this stage.
    pub(crate) fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        let label = format!("{} shader", self.stage);
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label.as_str()),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(self.source.as_str()),
                stage: self.stage.to_naga(),
                defines: &[],
            },
        })
    }
}

/// Both stages plus the uniform interface they agree on.
pub struct CompiledProgram {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    pub interface: ProgramInterface,
}

impl CompiledProgram {
    /// Compiles the vertex stage, then the fragment stage, then checks that
    /// the two agree on the host uniform block.
    pub fn compile(sources: &ShaderSources) -> Result<Self, RendererError> {
        let stages =
            [StageKind::Vertex, StageKind::Fragment].map(|stage| (stage, sources.get(stage)));
        let block = HostBlock::from_sources(&stages)?;
        let [(_, vertex_source), (_, fragment_source)] = stages;
        let vertex = compile_with_block(StageKind::Vertex, vertex_source, &block)?;
        let fragment = compile_with_block(StageKind::Fragment, fragment_source, &block)?;
        let interface = ProgramInterface::link(&vertex, &fragment)?;
        Ok(Self {
            vertex,
            fragment,
            interface,
        })
    }
}

/// Parses and validates a single GLSL stage.
pub fn compile_stage(stage: StageKind, source: &str) -> Result<CompiledStage, RendererError> {
    let block = HostBlock::from_sources(&[(stage, source)])?;
    compile_with_block(stage, source, &block)
}

fn compile_with_block(
    stage: StageKind,
    source: &str,
    block: &HostBlock,
) -> Result<CompiledStage, RendererError> {
    let source = block.apply(source);
    if !block.is_empty() {
        tracing::debug!(%stage, members = block.members().count(), "folded loose uniforms");
    }

    let mut frontend = glsl::Frontend::default();
    let options = glsl::Options::from(stage.to_naga());
    let module = frontend
        .parse(&options, &source)
        .map_err(|errors| RendererError::Compile {
            stage,
            log: format_parse_errors(&errors, &source),
        })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    let info = validator
        .validate(&module)
        .map_err(|err| RendererError::Compile {
            stage,
            log: format_error_chain(err.as_inner()),
        })?;

    tracing::debug!(
        %stage,
        globals = module.global_variables.len(),
        "compiled shader stage"
    );

    Ok(CompiledStage {
        stage,
        source,
        module,
        info,
    })
}

fn format_parse_errors(errors: &glsl::ParseErrors, source: &str) -> String {
    let mut log = String::new();
    for error in &errors.errors {
        let location = error.meta.location(source);
        let _ = writeln!(
            log,
            "{}:{}: {}",
            location.line_number, location.line_position, error.kind
        );
    }
    if log.is_empty() {
        log.push_str("unknown GLSL parse error");
    }
    log
}

fn format_error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut log = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(log, ": {cause}");
        source = cause.source();
    }
    log
}
