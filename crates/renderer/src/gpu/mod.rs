//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, device and surface, and reconfigures
//!   the swapchain when the window resizes.
//! - `pipeline` turns a compiled program into a render pipeline plus the
//!   fullscreen-triangle vertex buffer and the host uniform block.
//! - `uniforms` keeps the CPU copy of that block at its reflected offsets.
//! - `state` glues them together into the `GpuState` used by `window`.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
