// ============================================================
// Layer 6 — Device Initialisation
// ============================================================
// Picks the compute backend and prepares it for a run.
//
// Nothing happens at import time: the CLI builds a DeviceConfig
// and the use case calls init_device::<B>() once, before any
// tensor is created. That call seeds the backend's RNG (weight
// initialisation, dropout masks) so runs are repeatable.
//
//   Wgpu    → GPU through WebGPU (Vulkan / Metal / DX12)
//   NdArray → pure-Rust CPU backend, no GPU required

use burn::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    Wgpu,
    NdArray,
}

/// Everything needed to bring up a compute device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub backend: BackendKind,
    /// Seed for the backend RNG
    pub seed:    u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { backend: BackendKind::Wgpu, seed: 7 }
    }
}

/// Seed backend `B` and return its default device.
pub fn init_device<B: Backend>(cfg: &DeviceConfig) -> B::Device {
    B::seed(cfg.seed);
    let device = B::Device::default();
    tracing::info!("Using {:?} device {:?} (seed {})", cfg.backend, device, cfg.seed);
    device
}
