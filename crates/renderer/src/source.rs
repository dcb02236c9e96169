use std::fs;
use std::path::Path;

use crate::error::RendererError;
use crate::types::{ShaderPaths, StageKind};

/// GLSL text of both program stages, read once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    /// Reads both stages as UTF-8.
    ///
    /// The vertex shader is read first; a missing or non-UTF-8 file fails with
    /// [`RendererError::ShaderRead`] naming the stage and path.
    pub fn load(paths: &ShaderPaths) -> Result<Self, RendererError> {
        let vertex = read_stage(StageKind::Vertex, &paths.vertex)?;
        let fragment = read_stage(StageKind::Fragment, &paths.fragment)?;
        tracing::debug!(
            vertex = %paths.vertex.display(),
            fragment = %paths.fragment.display(),
            vertex_bytes = vertex.len(),
            fragment_bytes = fragment.len(),
            "loaded shader sources"
        );
        Ok(Self { vertex, fragment })
    }

    pub fn get(&self, stage: StageKind) -> &str {
        match stage {
            StageKind::Vertex => &self.vertex,
            StageKind::Fragment => &self.fragment,
        }
    }
}

fn read_stage(stage: StageKind, path: &Path) -> Result<String, RendererError> {
    fs::read_to_string(path).map_err(|source| RendererError::ShaderRead {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_reads_both_stages() {
        let dir = TempDir::new().unwrap();
        let vertex = dir.path().join("shader.vert");
        let fragment = dir.path().join("shader.frag");
        fs::write(&vertex, "// vertex").unwrap();
        fs::write(&fragment, "// fragment").unwrap();

        let sources = ShaderSources::load(&ShaderPaths::new(&vertex, &fragment)).unwrap();
        assert_eq!(sources.get(StageKind::Vertex), "// vertex");
        assert_eq!(sources.get(StageKind::Fragment), "// fragment");
    }

    #[test]
    fn missing_file_names_stage_and_path() {
        let dir = TempDir::new().unwrap();
        let vertex = dir.path().join("shader.vert");
        fs::write(&vertex, "// vertex").unwrap();
        let fragment = dir.path().join("missing.frag");

        let err = ShaderSources::load(&ShaderPaths::new(&vertex, &fragment)).unwrap_err();
        match &err {
            RendererError::ShaderRead { stage, path, .. } => {
                assert_eq!(*stage, StageKind::Fragment);
                assert_eq!(path, &fragment);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("missing.frag"));
    }

    #[test]
    fn non_utf8_source_is_rejected() {
        let dir = TempDir::new().unwrap();
        let vertex = dir.path().join("shader.vert");
        fs::write(&vertex, [0xff, 0xfe, 0x00]).unwrap();
        let fragment = dir.path().join("shader.frag");
        fs::write(&fragment, "// fragment").unwrap();

        let err = ShaderSources::load(&ShaderPaths::new(&vertex, &fragment)).unwrap_err();
        assert_eq!(err.stage(), Some(StageKind::Vertex));
    }
}
