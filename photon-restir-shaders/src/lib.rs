//! Reference kernels of the photon ReSTIR pipeline.
//!
//! Every module corresponds to one kernel entry point and exposes a
//! per-thread `main()`; whoever dispatches a kernel is responsible for
//! invoking `main()` once per thread of the dispatch grid.

pub mod candidate_generation;
pub mod caustic_collection;
pub mod final_shading;
pub mod fill_surface_info;
pub mod photon_culling;
pub mod photon_generation;
pub mod photon_pdf_build;
pub mod photon_pdf_reduce;
pub mod photon_presampling;
pub mod resampling;
pub mod spatial_resampling;
pub mod spatiotemporal_resampling;
pub mod temporal_resampling;
