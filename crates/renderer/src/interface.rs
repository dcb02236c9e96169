//! Uniform reflection and the host/shader contract.
//!
//! The host feeds exactly one std140 uniform block. Its members are found by
//! walking the naga module of each stage, and the byte offset of a member is
//! what the rest of the renderer treats as a uniform "location". Names that are
//! missing, inactive, or declared with an unexpected type resolve to
//! [`UniformLocation::Unused`], and writes through that location do nothing.

use std::collections::BTreeMap;

use wgpu::naga::{self, AddressSpace, Scalar, TypeInner, VectorSize};

use crate::compile::CompiledStage;
use crate::error::RendererError;

/// Host-assignable uniform types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Float,
    Vec2,
}

impl UniformType {
    pub fn size(self) -> usize {
        match self {
            UniformType::Float => 4,
            UniformType::Vec2 => 8,
        }
    }

    fn from_naga(inner: &TypeInner) -> Option<Self> {
        match *inner {
            TypeInner::Scalar(scalar) if scalar == Scalar::F32 => Some(UniformType::Float),
            TypeInner::Vector {
                size: VectorSize::Bi,
                scalar,
            } if scalar == Scalar::F32 => Some(UniformType::Vec2),
            _ => None,
        }
    }
}

/// Where a named uniform lives inside the host block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformLocation {
    Bound { offset: u32, ty: UniformType },
    /// The shader does not (actively) declare the name; writes are ignored.
    Unused,
}

impl UniformLocation {
    pub fn is_unused(&self) -> bool {
        matches!(self, UniformLocation::Unused)
    }
}

/// One member of the host uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMember {
    pub name: Option<String>,
    pub offset: u32,
    /// `None` for members the host cannot write (matrices, arrays, ints...).
    pub ty: Option<UniformType>,
}

/// Layout of the host uniform block as declared by the shaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub binding: u32,
    /// Size in bytes, rounded up to a 16-byte multiple.
    pub size: u32,
    pub members: Vec<BlockMember>,
}

impl BlockLayout {
    fn from_struct(
        module: &naga::Module,
        binding: u32,
        members: &[naga::StructMember],
        span: u32,
    ) -> Self {
        let members = members
            .iter()
            .map(|member| BlockMember {
                name: member.name.clone(),
                offset: member.offset,
                ty: UniformType::from_naga(&module.types[member.ty].inner),
            })
            .collect();
        Self {
            binding,
            size: span.max(16).next_multiple_of(16),
            members,
        }
    }

    fn member(&self, name: &str) -> Option<&BlockMember> {
        self.members
            .iter()
            .find(|member| member.name.as_deref() == Some(name))
    }
}

/// The linked view of both stages' resource declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInterface {
    block: Option<BlockLayout>,
}

impl ProgramInterface {
    /// Checks that the active resources of both stages form a program the
    /// host can drive: at most one uniform block, at group 0, declared
    /// identically wherever it appears, and no other bound resources.
    pub fn link(
        vertex: &CompiledStage,
        fragment: &CompiledStage,
    ) -> Result<Self, RendererError> {
        let mut blocks: BTreeMap<(u32, u32), BlockLayout> = BTreeMap::new();

        for stage in [vertex, fragment] {
            let module = stage.module();
            for (handle, global) in module.global_variables.iter() {
                if !stage.uses_global(handle) {
                    continue;
                }
                let label = global.name.as_deref().unwrap_or("<anonymous>");
                match global.space {
                    AddressSpace::Uniform => {}
                    AddressSpace::Storage { .. } | AddressSpace::Handle => {
                        return Err(link_error(format!(
                            "{} stage declares resource `{label}`; only the uniform block at set 0 is bound",
                            stage.stage()
                        )));
                    }
                    AddressSpace::PushConstant => {
                        return Err(link_error(format!(
                            "{} stage declares push constant `{label}`; push constants are not supported",
                            stage.stage()
                        )));
                    }
                    _ => continue,
                }

                let Some(binding) = global.binding.as_ref() else {
                    return Err(link_error(format!(
                        "{} stage declares uniform `{label}` without a binding",
                        stage.stage()
                    )));
                };
                let TypeInner::Struct { ref members, span } = module.types[global.ty].inner else {
                    return Err(link_error(format!(
                        "{} stage declares uniform `{label}` outside a uniform block",
                        stage.stage()
                    )));
                };

                let layout = BlockLayout::from_struct(module, binding.binding, members, span);
                let key = (binding.group, binding.binding);
                match blocks.get(&key) {
                    Some(existing) if existing != &layout => {
                        return Err(link_error(format!(
                            "uniform block at set {}, binding {} is declared differently in the vertex and fragment stages",
                            key.0, key.1
                        )));
                    }
                    Some(_) => {}
                    None => {
                        blocks.insert(key, layout);
                    }
                }
            }
        }

        if blocks.len() > 1 {
            return Err(link_error(format!(
                "expected a single uniform block, found {}",
                blocks.len()
            )));
        }

        let block = match blocks.into_iter().next() {
            Some(((0, _), layout)) => Some(layout),
            Some(((group, binding), _)) => {
                return Err(link_error(format!(
                    "uniform block must live in set 0 (found set {group}, binding {binding})"
                )));
            }
            None => None,
        };

        tracing::debug!(
            active_block = block.is_some(),
            binding = block.as_ref().map(|layout| layout.binding),
            size = block.as_ref().map(|layout| layout.size),
            "linked shader interface"
        );

        Ok(Self { block })
    }

    pub fn block(&self) -> Option<&BlockLayout> {
        self.block.as_ref()
    }

    /// Resolves `name` to a location, expecting the given type.
    pub fn uniform_location(&self, name: &str, expected: UniformType) -> UniformLocation {
        let Some(member) = self.block.as_ref().and_then(|block| block.member(name)) else {
            tracing::debug!(uniform = name, "uniform is not active; writes will be ignored");
            return UniformLocation::Unused;
        };

        match member.ty {
            Some(ty) if ty == expected => UniformLocation::Bound {
                offset: member.offset,
                ty,
            },
            actual => {
                tracing::warn!(
                    uniform = name,
                    ?expected,
                    ?actual,
                    "uniform declared with an unexpected type; writes will be ignored"
                );
                UniformLocation::Unused
            }
        }
    }
}

fn link_error(log: String) -> RendererError {
    RendererError::Link { log }
}
