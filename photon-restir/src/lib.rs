//! Photon-mapped ReSTIR: a direct-lighting pipeline that resamples light and
//! photon candidates through per-pixel reservoirs reused across frames and
//! neighboring pixels.
//!
//! The pipeline talks to the GPU through the [`Device`] trait; the
//! [`SoftwareDevice`] implements it on the CPU, running the same kernels.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::too_many_arguments)]

mod buffers;
mod config;
mod device;
mod dispatch_controller;
mod engine;
mod error;
mod frame;
mod frame_resources;
mod kernels;
mod lighting;
mod metrics;
mod passes;
mod photon_accel;
mod photon_buffers;
mod photon_counter;
mod reflection;
mod scene;
mod software;
mod ui;

pub use photon_restir_gpu as gpu;

pub use self::buffers::*;
pub use self::config::*;
pub use self::device::*;
pub use self::dispatch_controller::*;
pub use self::engine::*;
pub use self::error::*;
pub use self::frame::*;
pub use self::frame_resources::*;
pub use self::kernels::*;
pub use self::lighting::*;
pub use self::passes::*;
pub use self::photon_accel::*;
pub use self::photon_buffers::*;
pub use self::photon_counter::*;
pub use self::reflection::*;
pub use self::scene::*;
pub use self::software::*;
pub use self::ui::*;
