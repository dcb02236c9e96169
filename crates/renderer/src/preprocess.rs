//! Folds loose `uniform <type> <name>;` declarations into the host block.
//!
//! Vulkan-flavoured GLSL only accepts uniforms inside a bound block, but
//! shaders written for a GL context declare them one by one. Every loose,
//! non-opaque uniform found in either stage becomes a member of one generated
//! std140 block at `set = 0, binding = 0`. The block is written on the line of
//! the first loose declaration and the remaining ones are blanked, so compiler
//! line numbers still point into the user's file.

use std::fmt::Write as _;

use crate::error::RendererError;
use crate::types::StageKind;

pub(crate) const HOST_BLOCK_NAME: &str = "HostUniforms";

const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

const BLOCK_MEMBER_TYPES: [&str; 15] = [
    "float", "vec2", "vec3", "vec4", "int", "ivec2", "ivec3", "ivec4", "uint", "uvec2", "uvec3",
    "uvec4", "mat2", "mat3", "mat4",
];

/// One loose uniform declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseUniform {
    pub ty: String,
    pub name: String,
}

/// Members of the generated host block, in first-declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostBlock {
    members: Vec<(LooseUniform, StageKind, usize)>,
}

impl HostBlock {
    /// Collects loose uniforms across `stages`, vertex first.
    ///
    /// A name redeclared with another type is a compile error when both
    /// declarations sit in one stage and a link error when they do not.
    pub fn from_sources(stages: &[(StageKind, &str)]) -> Result<Self, RendererError> {
        let mut block = Self::default();
        for &(stage, source) in stages {
            for (index, line) in source.lines().enumerate() {
                let Some(uniforms) = parse_loose_uniform(line) else {
                    continue;
                };
                for uniform in uniforms {
                    block.push(stage, index + 1, uniform)?;
                }
            }
        }
        Ok(block)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &LooseUniform> {
        self.members.iter().map(|(uniform, _, _)| uniform)
    }

    /// The block declaration, on a single line.
    pub fn declaration(&self) -> String {
        let mut line = format!("layout(std140, set = 0, binding = 0) uniform {HOST_BLOCK_NAME} {{");
        for uniform in self.members() {
            let _ = write!(line, " {} {};", uniform.ty, uniform.name);
        }
        line.push_str(" };");
        line
    }

    /// Rewrites `source` so its loose uniforms come from the block.
    ///
    /// Sources without loose uniforms are returned unchanged.
    pub fn apply(&self, source: &str) -> String {
        if self.is_empty() || !source.lines().any(|line| parse_loose_uniform(line).is_some()) {
            return source.to_string();
        }

        let mut rewritten = String::with_capacity(source.len() + 64);
        let mut declared = false;
        for line in source.lines() {
            if parse_loose_uniform(line).is_some() {
                if !declared {
                    rewritten.push_str(&self.declaration());
                    declared = true;
                }
            } else {
                rewritten.push_str(line);
            }
            rewritten.push('\n');
        }
        rewritten
    }

    fn push(
        &mut self,
        stage: StageKind,
        line: usize,
        uniform: LooseUniform,
    ) -> Result<(), RendererError> {
        let existing = self
            .members
            .iter()
            .find(|(member, _, _)| member.name == uniform.name);
        match existing {
            None => {
                self.members.push((uniform, stage, line));
                Ok(())
            }
            Some((member, _, _)) if member.ty == uniform.ty => Ok(()),
            Some((member, first_stage, first_line)) if *first_stage == stage => {
                Err(RendererError::Compile {
                    stage,
                    log: format!(
                        "{line}: uniform `{}` redeclared as {} (declared as {} on line {first_line})",
                        uniform.name, uniform.ty, member.ty
                    ),
                })
            }
            Some((member, first_stage, _)) => Err(RendererError::Link {
                log: format!(
                    "uniform `{}` is {} in the {first_stage} stage but {} in the {stage} stage",
                    uniform.name, member.ty, uniform.ty
                ),
            }),
        }
    }
}

/// Parses `uniform [precision] <type> <name>[, <name>...];`.
///
/// Anything else (layout-qualified blocks, opaque types, arrays,
/// initialisers) is left for the compiler to judge.
fn parse_loose_uniform(line: &str) -> Option<Vec<LooseUniform>> {
    let code = line.split("//").next().unwrap_or_default().trim();
    let rest = code.strip_prefix("uniform")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim().strip_suffix(';')?.trim();

    let mut tokens = rest.splitn(2, char::is_whitespace);
    let mut ty = tokens.next()?;
    let mut names = tokens.next()?.trim();
    if PRECISION_QUALIFIERS.contains(&ty) {
        let mut tail = names.splitn(2, char::is_whitespace);
        ty = tail.next()?;
        names = tail.next()?.trim();
    }
    if !BLOCK_MEMBER_TYPES.contains(&ty) {
        return None;
    }

    names
        .split(',')
        .map(|name| {
            let name = name.trim();
            is_identifier(name).then(|| LooseUniform {
                ty: ty.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
