//! Post-Processing Chain Plan
//!
//! The chain runs over the lit scene buffer `S` and three same-sized
//! ping-pong buffers `A`, `B` and `C`. Which buffer each stage reads and
//! writes is fixed; a disabled optional stage is replaced by a passthrough
//! copy into the same output, so the rotation never depends on settings:
//!
//! ```text
//!  S ─AA/copy─▶ A ─fog/copy─▶ B ─DoF/copy─▶ C ─god rays/copy─▶ B
//!    ─vignette─▶ C ─bloom/copy─▶ B ─flare/copy─▶ A ─tone map─▶ B
//!    ─cel/copy─▶ C ─display─▶ surface
//! ```
//!
//! Multi-step stages use the free buffers as scratch:
//!
//! - depth of field: five horizontal + vertical blur rounds alternating
//!   `C` and `A` (starting from `B`), then combine `B` (sharp) with `A`
//!   (blurred) into `C`
//! - god rays: `C` + depth → `A`, then `C` + `A` → `B`
//! - bloom: `C` → `A`, then `C` + `A` → `B`
//! - lens flare: `B` → `A`, `A` → `C`, then `B` + `C` → `A`
//!
//! Tone-mapped color therefore always sits in `B`, and the chain always
//! ends in `C`. [`plan_post_chain`] is a pure function of the settings; the
//! deferred renderer only executes its steps.

use smallvec::{SmallVec, smallvec};

use crate::settings::PostProcessSettings;
use crate::shaders::Program;

/// Number of horizontal + vertical blur rounds in depth of field.
pub const DOF_BLUR_ITERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostBuffer {
    /// The lit scene written by the illumination pass.
    Scene,
    A,
    B,
    C,
}

/// A texture read by a post step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostInput {
    Buffer(PostBuffer),
    /// G-buffer depth.
    Depth,
    /// G-buffer normal + specular.
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostStage {
    AntiAlias,
    Passthrough,
    Fog,
    DofBlurHorizontal,
    DofBlurVertical,
    DofCombine,
    GodRays,
    GodRaysCombine,
    Vignette,
    BloomExtract,
    BloomCombine,
    FlareThreshold,
    FlareGhosts,
    FlareCombine,
    ToneMap,
    CelShade,
}

impl PostStage {
    #[must_use]
    pub const fn program(self) -> Program {
        match self {
            Self::AntiAlias => Program::Fxaa,
            Self::Passthrough => Program::Passthrough,
            Self::Fog => Program::Fog,
            Self::DofBlurHorizontal | Self::DofBlurVertical => Program::DofBlur,
            Self::DofCombine => Program::DofCombine,
            Self::GodRays => Program::GodRays,
            Self::GodRaysCombine => Program::GodRaysCombine,
            Self::Vignette => Program::Vignette,
            Self::BloomExtract => Program::BloomExtract,
            Self::BloomCombine => Program::BloomCombine,
            Self::FlareThreshold => Program::FlareThreshold,
            Self::FlareGhosts => Program::FlareGhosts,
            Self::FlareCombine => Program::FlareCombine,
            Self::ToneMap => Program::ToneMap,
            Self::CelShade => Program::CelShade,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AntiAlias => "Post: FXAA",
            Self::Passthrough => "Post: Passthrough",
            Self::Fog => "Post: Fog",
            Self::DofBlurHorizontal => "Post: DoF Blur H",
            Self::DofBlurVertical => "Post: DoF Blur V",
            Self::DofCombine => "Post: DoF Combine",
            Self::GodRays => "Post: God Rays",
            Self::GodRaysCombine => "Post: God Rays Combine",
            Self::Vignette => "Post: Vignette",
            Self::BloomExtract => "Post: Bloom Extract",
            Self::BloomCombine => "Post: Bloom Combine",
            Self::FlareThreshold => "Post: Flare Threshold",
            Self::FlareGhosts => "Post: Flare Ghosts",
            Self::FlareCombine => "Post: Flare Combine",
            Self::ToneMap => "Post: Tone Map",
            Self::CelShade => "Post: Cel Shade",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStep {
    pub stage: PostStage,
    pub inputs: SmallVec<[PostInput; 3]>,
    pub output: PostBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPlan {
    pub steps: Vec<PostStep>,
    /// Buffer the display pass shows.
    pub output: PostBuffer,
    /// The plan stopped after the first god-ray pass for debugging.
    pub early_exit: bool,
}

impl PostPlan {
    /// Buffer holding tone-mapped color, absent after an early exit.
    #[must_use]
    pub fn tone_mapped(&self) -> Option<PostBuffer> {
        self.steps
            .iter()
            .find(|s| s.stage == PostStage::ToneMap)
            .map(|s| s.output)
    }
}

struct Planner {
    steps: Vec<PostStep>,
}

impl Planner {
    fn push(&mut self, stage: PostStage, inputs: &[PostInput], output: PostBuffer) {
        self.steps.push(PostStep {
            stage,
            inputs: inputs.iter().copied().collect(),
            output,
        });
    }

    fn copy(&mut self, from: PostBuffer, to: PostBuffer) {
        self.push(PostStage::Passthrough, &[PostInput::Buffer(from)], to);
    }
}

/// Plans the chain for `settings`. With `debug_god_rays` the chain stops
/// after the first god-ray pass and displays its raw output.
#[must_use]
pub fn plan_post_chain(settings: &PostProcessSettings, debug_god_rays: bool) -> PostPlan {
    use PostBuffer::{A, B, C, Scene};
    use PostInput::{Buffer, Depth, Normal};

    let mut p = Planner { steps: Vec::new() };

    if settings.anti_aliasing {
        p.push(PostStage::AntiAlias, &[Buffer(Scene)], A);
    } else {
        p.copy(Scene, A);
    }

    if settings.fog.enabled {
        p.push(PostStage::Fog, &[Buffer(A), Depth], B);
    } else {
        p.copy(A, B);
    }

    if settings.depth_of_field.enabled {
        let mut source = B;
        for _ in 0..DOF_BLUR_ITERATIONS {
            p.push(PostStage::DofBlurHorizontal, &[Buffer(source)], C);
            p.push(PostStage::DofBlurVertical, &[Buffer(C)], A);
            source = A;
        }
        p.push(PostStage::DofCombine, &[Buffer(B), Buffer(A), Depth], C);
    } else {
        p.copy(B, C);
    }

    if settings.god_rays.enabled || debug_god_rays {
        p.push(PostStage::GodRays, &[Buffer(C), Depth], A);
        if debug_god_rays {
            return PostPlan {
                steps: p.steps,
                output: A,
                early_exit: true,
            };
        }
        p.push(PostStage::GodRaysCombine, &[Buffer(C), Buffer(A)], B);
    } else {
        p.copy(C, B);
    }

    p.push(PostStage::Vignette, &[Buffer(B)], C);

    if settings.bloom.enabled {
        p.push(PostStage::BloomExtract, &[Buffer(C)], A);
        p.push(PostStage::BloomCombine, &[Buffer(C), Buffer(A)], B);
    } else {
        p.copy(C, B);
    }

    if settings.lens_flare.enabled {
        p.push(PostStage::FlareThreshold, &[Buffer(B)], A);
        p.push(PostStage::FlareGhosts, &[Buffer(A)], C);
        p.push(PostStage::FlareCombine, &[Buffer(B), Buffer(C)], A);
    } else {
        p.copy(B, A);
    }

    p.push(PostStage::ToneMap, &[Buffer(A)], B);

    if settings.cel_shading {
        p.push(PostStage::CelShade, &[Buffer(B), Normal, Depth], C);
    } else {
        p.copy(B, C);
    }

    PostPlan {
        steps: p.steps,
        output: C,
        early_exit: false,
    }
}

/// Buffers a step samples, excluding G-buffer inputs.
#[must_use]
pub fn buffers_read(step: &PostStep) -> SmallVec<[PostBuffer; 3]> {
    let mut buffers = smallvec![];
    for input in &step.inputs {
        if let PostInput::Buffer(b) = input {
            buffers.push(*b);
        }
    }
    buffers
}
