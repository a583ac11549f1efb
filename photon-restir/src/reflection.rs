use fxhash::FxHashMap;
use glam::{UVec2, Vec3};
use wgpu::TextureFormat;

use crate::{Error, Result, TextureId};

/// Texture the pipeline reads or writes, as declared to the render graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    pub name: &'static str,
    pub description: &'static str,
    pub format: TextureFormat,
    pub optional: bool,
}

impl Channel {
    const fn required(
        name: &'static str,
        description: &'static str,
        format: TextureFormat,
    ) -> Self {
        Self {
            name,
            description,
            format,
            optional: false,
        }
    }

    const fn optional(
        name: &'static str,
        description: &'static str,
        format: TextureFormat,
    ) -> Self {
        Self {
            name,
            description,
            format,
            optional: true,
        }
    }
}

pub const VBUFFER: Channel = Channel::optional(
    "vbuffer",
    "Visibility buffer (triangle id + 1, barycentrics)",
    TextureFormat::Rgba32Uint,
);

pub const POSITION: Channel = Channel::optional(
    "posW",
    "World-space position; w > 0 marks a hit",
    TextureFormat::Rgba32Float,
);

pub const NORMAL: Channel = Channel::optional(
    "normalW",
    "World-space shading normal",
    TextureFormat::Rgba32Float,
);

pub const ALBEDO: Channel = Channel::optional(
    "albedo",
    "Diffuse albedo; alpha holds the diffuse probability",
    TextureFormat::Rgba32Float,
);

pub const MOTION: Channel = Channel::required(
    "mvec",
    "Screen-space motion vectors, in pixels",
    TextureFormat::Rg32Float,
);

pub const VIEW: Channel = Channel::optional(
    "view",
    "World-space view direction",
    TextureFormat::Rgba32Float,
);

pub const COLOR: Channel = Channel::required(
    "color",
    "Shaded radiance",
    TextureFormat::Rgba32Float,
);

pub const DIFFUSE_ILLUMINATION: Channel = Channel::optional(
    "diffuseIllumination",
    "Radiance demodulated by the albedo",
    TextureFormat::Rgba32Float,
);

pub const DIFFUSE_REFLECTANCE: Channel = Channel::optional(
    "diffuseReflectance",
    "Albedo of the primary surface",
    TextureFormat::Rgba32Float,
);

/// Inputs of the complex bundle: surfaces are reconstructed from the
/// visibility buffer.
pub const COMPLEX_BUNDLE: [Channel; 2] = [VBUFFER, MOTION];

/// Inputs of the simplified bundle: surfaces are read directly from the
/// G-buffer.
pub const SIMPLIFIED_BUNDLE: [Channel; 4] = [POSITION, NORMAL, ALBEDO, MOTION];

/// Channels the pipeline declares to the render graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reflection {
    pub inputs: Vec<Channel>,
    pub outputs: Vec<Channel>,
}

/// Declares all inputs and outputs.
///
/// Members of both input bundles are declared as optional, since binding
/// either bundle is enough; which one is bound is checked by
/// [`InputBundle::detect()`].
pub fn reflect() -> Reflection {
    Reflection {
        inputs: vec![VBUFFER, POSITION, NORMAL, ALBEDO, MOTION, VIEW],
        outputs: vec![COLOR, DIFFUSE_ILLUMINATION, DIFFUSE_REFLECTANCE],
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputBundle {
    Complex,
    Simplified,
}

impl InputBundle {
    /// Picks the bundle that's fully bound, preferring the complex one.
    pub fn detect(data: &RenderData) -> Result<Self> {
        let is_bound = |bundle: &[Channel]| {
            bundle.iter().all(|channel| data.input(channel.name).is_some())
        };

        if is_bound(&COMPLEX_BUNDLE) {
            Ok(Self::Complex)
        } else if is_bound(&SIMPLIFIED_BUNDLE) {
            Ok(Self::Simplified)
        } else {
            Err(Error::MissingInputs {
                complex: describe(&COMPLEX_BUNDLE),
                simplified: describe(&SIMPLIFIED_BUNDLE),
            })
        }
    }
}

fn describe(bundle: &[Channel]) -> String {
    bundle
        .iter()
        .map(|channel| channel.name)
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Textures bound to the pipeline for one frame.
#[derive(Clone, Debug, Default)]
pub struct RenderData {
    pub dims: UVec2,
    pub camera_position: Vec3,
    inputs: FxHashMap<&'static str, TextureId>,
    outputs: FxHashMap<&'static str, TextureId>,
}

impl RenderData {
    pub fn new(dims: UVec2, camera_position: Vec3) -> Self {
        Self {
            dims,
            camera_position,
            ..Default::default()
        }
    }

    pub fn with_input(mut self, channel: &Channel, id: TextureId) -> Self {
        self.inputs.insert(channel.name, id);
        self
    }

    pub fn with_output(mut self, channel: &Channel, id: TextureId) -> Self {
        self.outputs.insert(channel.name, id);
        self
    }

    pub fn input(&self, name: &str) -> Option<TextureId> {
        self.inputs.get(name).copied()
    }

    pub fn output(&self, name: &str) -> Option<TextureId> {
        self.outputs.get(name).copied()
    }

    /// Returns the required output `channel`.
    pub fn required_output(&self, channel: &Channel) -> Result<TextureId> {
        self.output(channel.name)
            .ok_or(Error::MissingOutput(channel.name))
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;

    #[test]
    fn reflection() {
        let reflection = reflect();

        assert!(reflection.inputs.iter().any(|c| c.name == "mvec" && !c.optional));
        assert!(reflection.inputs.iter().any(|c| c.name == "view" && c.optional));
        assert!(reflection.outputs.iter().any(|c| c.name == "color" && !c.optional));
    }

    #[test]
    fn bundles() {
        let data = RenderData::new(uvec2(4, 4), Vec3::ZERO);

        let err = InputBundle::detect(&data).unwrap_err();

        assert!(
            err.to_string().contains("vbuffer + mvec"),
            "{}",
            err
        );

        let data = data
            .with_input(&POSITION, TextureId(1))
            .with_input(&NORMAL, TextureId(2))
            .with_input(&ALBEDO, TextureId(3));

        // Still missing motion vectors
        assert!(InputBundle::detect(&data).is_err());

        let data = data.with_input(&MOTION, TextureId(4));

        assert_eq!(InputBundle::Simplified, InputBundle::detect(&data).unwrap());

        let data = data.with_input(&VBUFFER, TextureId(5));

        assert_eq!(InputBundle::Complex, InputBundle::detect(&data).unwrap());
    }

    #[test]
    fn missing_output() {
        let data = RenderData::new(uvec2(4, 4), Vec3::ZERO);

        assert!(matches!(
            data.required_output(&COLOR),
            Err(Error::MissingOutput("color"))
        ));
    }
}
