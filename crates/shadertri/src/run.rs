use anyhow::{Context, Result};
use renderer::{Renderer, RendererConfig, ShaderPaths};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let config = build_config(cli);
    tracing::info!(
        vertex = %config.shaders.vertex.display(),
        fragment = %config.shaders.fragment.display(),
        width = config.surface_size.0,
        height = config.surface_size.1,
        "starting shadertri"
    );

    Renderer::new(config)
        .run()
        .context("renderer exited with an error")
}

fn build_config(cli: Cli) -> RendererConfig {
    RendererConfig {
        surface_size: cli.size,
        title: cli.title,
        shaders: ShaderPaths::new(cli.vertex, cli.fragment),
        fps_overlay: cli.fps_overlay,
        overlay_font: cli.overlay_font,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn config_carries_cli_values() {
        let cli = Cli::try_parse_from([
            "shadertri",
            "--vertex",
            "v.glsl",
            "--fragment",
            "f.glsl",
            "--size",
            "1024x768",
            "--fps-overlay",
        ])
        .unwrap();
        let config = build_config(cli);
        assert_eq!(config.surface_size, (1024, 768));
        assert_eq!(config.shaders, ShaderPaths::new("v.glsl", "f.glsl"));
        assert!(config.fps_overlay);
        assert!(config.overlay_font.is_none());
        assert_eq!(config.title, "OpenGL Triangle");
    }
}
