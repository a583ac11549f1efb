//! Adapters running the reference kernels over the software device's
//! resources: each one views its bindings and invokes the kernel's `main()`
//! once per thread of the dispatch grid.

use glam::{uvec2, UVec2, Vec2, Vec4};
use photon_restir_gpu::*;
use photon_restir_shaders as shaders;
use photon_restir_shaders::caustic_collection::CausticPhotons;
use photon_restir_shaders::candidate_generation::PhotonCandidates;
use photon_restir_shaders::fill_surface_info::SurfaceInputs;
use photon_restir_shaders::final_shading::ShadingOutputs;
use photon_restir_shaders::resampling::ReservoirsView;

use super::KernelArgs;
use crate::kernels::entry_points::*;
use crate::{Error, Result};

pub type KernelFn = fn(&KernelArgs, UVec2) -> Result<()>;

pub fn lookup(entry_point: &str) -> Option<KernelFn> {
    Some(match entry_point {
        FILL_SURFACE_INFO => fill_surface_info,
        PHOTON_CULLING => photon_culling,
        PHOTON_GENERATION => photon_generation,
        PHOTON_PDF_BUILD => photon_pdf_build,
        PHOTON_PDF_REDUCE => photon_pdf_reduce,
        PHOTON_PRESAMPLING => photon_presampling,
        CANDIDATE_GENERATION => candidate_generation,
        CAUSTIC_COLLECTION => caustic_collection,
        TEMPORAL_RESAMPLING => temporal_resampling,
        SPATIAL_RESAMPLING => spatial_resampling,
        SPATIOTEMPORAL_RESAMPLING => spatiotemporal_resampling,
        FINAL_SHADING => final_shading,
        _ => return None,
    })
}

fn each_thread(size: UVec2, mut f: impl FnMut(UVec2)) {
    for y in 0..size.y {
        for x in 0..size.x {
            f(uvec2(x, y));
        }
    }
}

/// Makes sure a resource holds at least `len` items, so that kernels can
/// index it freely.
fn ensure_len<T>(args: &KernelArgs, name: &str, items: &[T], len: usize) -> Result<()> {
    if items.len() >= len {
        Ok(())
    } else {
        Err(Error::device(format!(
            "kernel `{}` expects `{}` to hold at least {} items, got {}",
            args.entry_point,
            name,
            len,
            items.len()
        )))
    }
}

fn pixels(dims: UVec2) -> usize {
    (dims.x * dims.y) as usize
}

fn fill_surface_info(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: SurfacePassParams = args.params()?;
    let pixels = pixels(params.dims());

    let mut surfaces = args.write::<SurfaceInfo>("surfaces")?;

    ensure_len(args, "surfaces", &surfaces, pixels)?;

    if params.use_vbuffer > 0 {
        let vbuffer = args.read::<[u32; 4]>("vbuffer")?;
        let triangles = args.read::<Triangle>("triangles")?;

        ensure_len(args, "vbuffer", &vbuffer, pixels)?;

        let inputs = SurfaceInputs::VBuffer {
            vbuffer: &vbuffer,
            scene: SceneView::new(&triangles),
        };

        each_thread(size, |id| {
            shaders::fill_surface_info::main(id, &params, &inputs, &mut surfaces);
        });
    } else {
        let positions = args.read::<Vec4>("posW")?;
        let normals = args.read::<Vec4>("normalW")?;
        let albedos = args.read::<Vec4>("albedo")?;

        ensure_len(args, "posW", &positions, pixels)?;
        ensure_len(args, "normalW", &normals, pixels)?;
        ensure_len(args, "albedo", &albedos, pixels)?;

        let inputs = SurfaceInputs::Simplified {
            positions: &positions,
            normals: &normals,
            albedos: &albedos,
        };

        each_thread(size, |id| {
            shaders::fill_surface_info::main(id, &params, &inputs, &mut surfaces);
        });
    }

    Ok(())
}

fn photon_culling(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: PhotonCullingPassParams = args.params()?;
    let surfaces = args.read::<SurfaceInfo>("surfaces")?;
    let mut mask = args.write::<u8>("culling_mask")?;

    ensure_len(args, "surfaces", &surfaces, pixels(params.dims()))?;
    ensure_len(args, "culling_mask", &mask, params.grid().cell_count() as usize)?;

    each_thread(size, |id| {
        shaders::photon_culling::main(id, &params, &surfaces, &mut mask);
    });

    Ok(())
}

fn photon_generation(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: PhotonGenerationPassParams = args.params()?;
    let triangles = args.read::<Triangle>("triangles")?;
    let lights = args.read::<Light>("lights")?;
    let light_sampler = args.read::<LightSamplerEntry>("light_sampler")?;

    let culling_mask = if params.use_culling > 0 {
        let mask = args.read::<u8>("culling_mask")?;

        ensure_len(args, "culling_mask", &mask, params.grid().cell_count() as usize)?;

        Some(mask)
    } else {
        None
    };

    let mut counters = args.write::<u32>("photon_counters")?;
    let mut global_aabbs = args.write::<PhotonAabb>("global_aabbs")?;
    let mut global_data = args.write::<PhotonData>("global_data")?;
    let mut caustic_aabbs = args.write::<PhotonAabb>("caustic_aabbs")?;
    let mut caustic_data = args.write::<PhotonData>("caustic_data")?;

    let [global_capacity, caustic_capacity] = params.capacity.map(|c| c as usize);

    ensure_len(args, "light_sampler", &light_sampler, lights.len())?;
    ensure_len(args, "photon_counters", &counters, PHOTON_KINDS)?;
    ensure_len(args, "global_aabbs", &global_aabbs, global_capacity)?;
    ensure_len(args, "global_data", &global_data, global_capacity)?;
    ensure_len(args, "caustic_aabbs", &caustic_aabbs, caustic_capacity)?;
    ensure_len(args, "caustic_data", &caustic_data, caustic_capacity)?;

    let mut photons = PhotonWriter {
        counters: &mut counters,
        aabbs: [&mut global_aabbs, &mut caustic_aabbs],
        data: [&mut global_data, &mut caustic_data],
        capacities: params.capacity,
    };

    let scene = SceneView::new(&triangles);
    let light_sampler = LightSamplerView::new(&light_sampler[..lights.len()]);

    each_thread(size, |id| {
        shaders::photon_generation::main(
            id,
            &params,
            scene,
            &lights,
            light_sampler,
            culling_mask.as_deref(),
            &mut photons,
        );
    });

    Ok(())
}

fn photon_pdf_build(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: PhotonPdfPassParams = args.params()?;
    let counters = args.read::<u32>("photon_counters")?;
    let data = args.read::<PhotonData>("global_data")?;
    let mut chain = args.write::<f32>("photon_pdf")?;

    ensure_len(args, "photon_counters", &counters, PHOTON_KINDS)?;
    ensure_len(args, "global_data", &data, params.capacity as usize)?;
    ensure_len(args, "photon_pdf", &chain, params.size().chain_len())?;

    each_thread(size, |id| {
        shaders::photon_pdf_build::main(id, &params, &counters, &data, &mut chain);
    });

    Ok(())
}

fn photon_pdf_reduce(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: PhotonPdfPassParams = args.params()?;
    let mut chain = args.write::<f32>("photon_pdf")?;

    ensure_len(args, "photon_pdf", &chain, params.size().chain_len())?;

    each_thread(size, |id| {
        shaders::photon_pdf_reduce::main(id, &params, &mut chain);
    });

    Ok(())
}

fn photon_presampling(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: PhotonPdfPassParams = args.params()?;
    let chain = args.read::<f32>("photon_pdf")?;
    let mut tiles = args.write::<PresampledPhoton>("presampled_photons")?;

    ensure_len(args, "photon_pdf", &chain, params.size().chain_len())?;

    ensure_len(
        args,
        "presampled_photons",
        &tiles,
        (params.tile_count * params.tile_size) as usize,
    )?;

    each_thread(size, |id| {
        shaders::photon_presampling::main(id, &params, &chain, &mut tiles);
    });

    Ok(())
}

fn candidate_generation(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: CandidatePassParams = args.params()?;
    let pixels = pixels(params.dims());

    let surfaces = args.read::<SurfaceInfo>("surfaces")?;
    let lights = args.read::<Light>("lights")?;
    let light_sampler = args.read::<LightSamplerEntry>("light_sampler")?;
    let counters = args.read::<u32>("photon_counters")?;
    let aabbs = args.read::<PhotonAabb>("global_aabbs")?;
    let data = args.read::<PhotonData>("global_data")?;

    let presampled = if params.use_presampling > 0 {
        let tiles = args.read::<PresampledPhoton>("presampled_photons")?;

        ensure_len(
            args,
            "presampled_photons",
            &tiles,
            (params.tile_count * params.tile_size) as usize,
        )?;

        Some(tiles)
    } else {
        None
    };

    let mut reservoirs = args.write::<u32>("curr_reservoirs")?;
    let mut samples = args.write::<LightSample>("curr_samples")?;

    ensure_len(args, "surfaces", &surfaces, pixels)?;
    ensure_len(args, "light_sampler", &light_sampler, lights.len())?;
    ensure_len(args, "photon_counters", &counters, PHOTON_KINDS)?;
    ensure_len(args, "global_aabbs", &aabbs, params.photon_capacity as usize)?;
    ensure_len(args, "global_data", &data, params.photon_capacity as usize)?;
    ensure_len(args, "curr_reservoirs", &reservoirs, pixels * params.layout().words())?;
    ensure_len(args, "curr_samples", &samples, pixels)?;

    let photons = PhotonCandidates {
        counters: &counters,
        aabbs: &aabbs,
        data: &data,
        presampled: presampled.as_deref(),
    };

    let light_sampler = LightSamplerView::new(&light_sampler[..lights.len()]);

    each_thread(size, |id| {
        shaders::candidate_generation::main(
            id,
            &params,
            &surfaces,
            &lights,
            light_sampler,
            &photons,
            &mut reservoirs,
            &mut samples,
        );
    });

    Ok(())
}

fn caustic_collection(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: CollectionPassParams = args.params()?;
    let pixels = pixels(params.dims());

    let surfaces = args.read::<SurfaceInfo>("surfaces")?;
    let counters = args.read::<u32>("photon_counters")?;
    let aabbs = args.read::<PhotonAabb>("caustic_aabbs")?;
    let data = args.read::<PhotonData>("caustic_data")?;
    let accel = args.accel("photon_accel")?;
    let mut caustics = args.write::<Vec4>("caustics")?;

    ensure_len(args, "surfaces", &surfaces, pixels)?;
    ensure_len(args, "photon_counters", &counters, PHOTON_KINDS)?;
    ensure_len(args, "caustic_aabbs", &aabbs, params.capacity as usize)?;
    ensure_len(args, "caustic_data", &data, params.capacity as usize)?;
    ensure_len(args, "caustics", &caustics, pixels)?;

    let photons = CausticPhotons {
        counters: &counters,
        aabbs: &aabbs,
        data: &data,
        accel,
    };

    each_thread(size, |id| {
        shaders::caustic_collection::main(
            id,
            &params,
            &surfaces,
            &photons,
            &mut caustics,
        );
    });

    Ok(())
}

fn temporal_resampling(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: ResamplingPassParams = args.params()?;
    let pixels = pixels(params.dims());
    let layout = params.layout();

    let triangles = args.read::<Triangle>("triangles")?;
    let motion = args.read::<Vec2>("mvec")?;
    let curr_surfaces = args.read::<SurfaceInfo>("surfaces")?;
    let prev_surfaces = args.read::<SurfaceInfo>("prev_surfaces")?;
    let prev_reservoirs = args.read::<u32>("prev_reservoirs")?;
    let prev_samples = args.read::<LightSample>("prev_samples")?;
    let mut curr_reservoirs = args.write::<u32>("curr_reservoirs")?;
    let mut curr_samples = args.write::<LightSample>("curr_samples")?;

    ensure_len(args, "mvec", &motion, pixels)?;
    ensure_len(args, "surfaces", &curr_surfaces, pixels)?;
    ensure_len(args, "prev_surfaces", &prev_surfaces, pixels)?;
    ensure_len(args, "prev_reservoirs", &prev_reservoirs, pixels * layout.words())?;
    ensure_len(args, "prev_samples", &prev_samples, pixels)?;
    ensure_len(args, "curr_reservoirs", &curr_reservoirs, pixels * layout.words())?;
    ensure_len(args, "curr_samples", &curr_samples, pixels)?;

    let prev_reservoirs = ReservoirsView {
        words: &prev_reservoirs,
        samples: &prev_samples,
        layout,
    };

    let scene = SceneView::new(&triangles);

    each_thread(size, |id| {
        shaders::temporal_resampling::main(
            id,
            &params,
            scene,
            &motion,
            &curr_surfaces,
            &prev_surfaces,
            prev_reservoirs,
            &mut curr_reservoirs,
            &mut curr_samples,
        );
    });

    Ok(())
}

fn spatial_resampling(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: ResamplingPassParams = args.params()?;
    let pixels = pixels(params.dims());
    let layout = params.layout();

    let triangles = args.read::<Triangle>("triangles")?;
    let offsets = args.read::<[i8; 2]>("neighbor_offsets")?;
    let surfaces = args.read::<SurfaceInfo>("surfaces")?;
    let input_reservoirs = args.read::<u32>("input_reservoirs")?;
    let input_samples = args.read::<LightSample>("input_samples")?;
    let mut output_reservoirs = args.write::<u32>("output_reservoirs")?;
    let mut output_samples = args.write::<LightSample>("output_samples")?;

    ensure_len(args, "surfaces", &surfaces, pixels)?;
    ensure_len(args, "input_reservoirs", &input_reservoirs, pixels * layout.words())?;
    ensure_len(args, "input_samples", &input_samples, pixels)?;
    ensure_len(args, "output_reservoirs", &output_reservoirs, pixels * layout.words())?;
    ensure_len(args, "output_samples", &output_samples, pixels)?;

    let input = ReservoirsView {
        words: &input_reservoirs,
        samples: &input_samples,
        layout,
    };

    let scene = SceneView::new(&triangles);

    each_thread(size, |id| {
        shaders::spatial_resampling::main(
            id,
            &params,
            scene,
            &offsets,
            &surfaces,
            input,
            &mut output_reservoirs,
            &mut output_samples,
        );
    });

    Ok(())
}

fn spatiotemporal_resampling(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: ResamplingPassParams = args.params()?;
    let pixels = pixels(params.dims());
    let layout = params.layout();

    let triangles = args.read::<Triangle>("triangles")?;
    let offsets = args.read::<[i8; 2]>("neighbor_offsets")?;
    let motion = args.read::<Vec2>("mvec")?;
    let curr_surfaces = args.read::<SurfaceInfo>("surfaces")?;
    let prev_surfaces = args.read::<SurfaceInfo>("prev_surfaces")?;
    let prev_reservoirs = args.read::<u32>("prev_reservoirs")?;
    let prev_samples = args.read::<LightSample>("prev_samples")?;
    let mut curr_reservoirs = args.write::<u32>("curr_reservoirs")?;
    let mut curr_samples = args.write::<LightSample>("curr_samples")?;

    ensure_len(args, "mvec", &motion, pixels)?;
    ensure_len(args, "surfaces", &curr_surfaces, pixels)?;
    ensure_len(args, "prev_surfaces", &prev_surfaces, pixels)?;
    ensure_len(args, "prev_reservoirs", &prev_reservoirs, pixels * layout.words())?;
    ensure_len(args, "prev_samples", &prev_samples, pixels)?;
    ensure_len(args, "curr_reservoirs", &curr_reservoirs, pixels * layout.words())?;
    ensure_len(args, "curr_samples", &curr_samples, pixels)?;

    let prev_reservoirs = ReservoirsView {
        words: &prev_reservoirs,
        samples: &prev_samples,
        layout,
    };

    let scene = SceneView::new(&triangles);

    each_thread(size, |id| {
        shaders::spatiotemporal_resampling::main(
            id,
            &params,
            scene,
            &offsets,
            &motion,
            &curr_surfaces,
            &prev_surfaces,
            prev_reservoirs,
            &mut curr_reservoirs,
            &mut curr_samples,
        );
    });

    Ok(())
}

fn final_shading(args: &KernelArgs, size: UVec2) -> Result<()> {
    let params: ShadingPassParams = args.params()?;
    let pixels = pixels(params.dims());
    let layout = params.layout();

    let triangles = args.read::<Triangle>("triangles")?;
    let surfaces = args.read::<SurfaceInfo>("surfaces")?;
    let reservoirs = args.read::<u32>("reservoirs")?;
    let samples = args.read::<LightSample>("samples")?;

    let caustics = if params.use_caustics > 0 {
        let caustics = args.read::<Vec4>("caustics")?;

        ensure_len(args, "caustics", &caustics, pixels)?;

        Some(caustics)
    } else {
        None
    };

    let mut color = args.write::<Vec4>("color")?;
    let mut diffuse_illumination = args.try_write::<Vec4>("diffuseIllumination")?;
    let mut diffuse_reflectance = args.try_write::<Vec4>("diffuseReflectance")?;

    ensure_len(args, "surfaces", &surfaces, pixels)?;
    ensure_len(args, "reservoirs", &reservoirs, pixels * layout.words())?;
    ensure_len(args, "samples", &samples, pixels)?;
    ensure_len(args, "color", &color, pixels)?;

    if let Some(texels) = &diffuse_illumination {
        ensure_len(args, "diffuseIllumination", texels, pixels)?;
    }

    if let Some(texels) = &diffuse_reflectance {
        ensure_len(args, "diffuseReflectance", texels, pixels)?;
    }

    let reservoirs = ReservoirsView {
        words: &reservoirs,
        samples: &samples,
        layout,
    };

    let mut outputs = ShadingOutputs {
        color: &mut color,
        diffuse_illumination: diffuse_illumination.as_deref_mut(),
        diffuse_reflectance: diffuse_reflectance.as_deref_mut(),
    };

    let scene = SceneView::new(&triangles);

    each_thread(size, |id| {
        shaders::final_shading::main(
            id,
            &params,
            scene,
            &surfaces,
            reservoirs,
            caustics.as_deref(),
            &mut outputs,
        );
    });

    Ok(())
}
