//! Error types
//!
//! Initialization failures name the stage that failed; runtime allocation
//! failures are reported to the requesting client as [`NoMemory`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Initialization stages, in acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum InitStage {
    DeviceContext,
    Tty,
    Seat,
    Drm,
    Allocator,
    RenderContext,
    DisplayBinding,
    Renderer,
    Outputs,
}

impl InitStage {
    pub const ALL: [InitStage; 9] = [
        InitStage::DeviceContext,
        InitStage::Tty,
        InitStage::Seat,
        InitStage::Drm,
        InitStage::Allocator,
        InitStage::RenderContext,
        InitStage::DisplayBinding,
        InitStage::Renderer,
        InitStage::Outputs,
    ];
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InitStage::DeviceContext => "device context",
            InitStage::Tty => "tty",
            InitStage::Seat => "seat",
            InitStage::Drm => "drm device",
            InitStage::Allocator => "buffer allocator",
            InitStage::RenderContext => "render context",
            InitStage::DisplayBinding => "render context display binding",
            InitStage::Renderer => "renderer",
            InitStage::Outputs => "outputs",
        };
        f.write_str(name)
    }
}

/// A failed initialization stage. Every earlier stage has been released
/// by the time the caller sees this.
#[derive(Debug, Error)]
#[error("could not initialize {stage}")]
pub struct InitError {
    pub stage: InitStage,
    #[source]
    pub source: anyhow::Error,
}

impl InitError {
    pub fn new(stage: InitStage, source: anyhow::Error) -> Self {
        Self { stage, source }
    }
}

/// Protocol object allocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("out of memory")]
pub struct NoMemory;
