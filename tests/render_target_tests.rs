//! Render Target Tests
//!
//! Tests for:
//! - Attachment bookkeeping and draw-buffer lists
//! - Completeness validation and its diagnostics
//! - Resize preserving formats
//! - Semantic lookups

use penumbra::render::device::{GpuDevice, HeadlessDevice, LoadOp, RenderTo, TextureDesc, TextureFormat};
use penumbra::render::{AttachmentPoint, RenderTarget, TextureSemantic};
use penumbra::RenderError;

fn gbuffer(device: &mut HeadlessDevice) -> RenderTarget {
    let mut target = RenderTarget::new("G-Buffer", 64, 32);
    target.create_attachment(
        device,
        AttachmentPoint::Color(0),
        TextureFormat::Rgba8Unorm,
        Some(TextureSemantic::Diffuse),
    );
    target.create_attachment(
        device,
        AttachmentPoint::Color(1),
        TextureFormat::Rgba16Float,
        Some(TextureSemantic::Normal),
    );
    target.create_attachment(
        device,
        AttachmentPoint::Depth,
        TextureFormat::Depth32Float,
        Some(TextureSemantic::Depth),
    );
    target
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn draw_buffers_list_color_points_only() {
    let mut device = HeadlessDevice::new(64, 32);
    let target = gbuffer(&mut device);
    assert_eq!(
        target.draw_buffers(),
        &[AttachmentPoint::Color(0), AttachmentPoint::Color(1)],
        "depth never joins the draw buffers"
    );
}

#[test]
fn color_attachments_follow_draw_buffer_order() {
    let mut device = HeadlessDevice::new(64, 32);
    let mut target = RenderTarget::new("Out Of Order", 8, 8);
    let second = target.create_attachment(&mut device, AttachmentPoint::Color(1), TextureFormat::Rgba8Unorm, None);
    let first = target.create_attachment(&mut device, AttachmentPoint::Color(0), TextureFormat::Rgba8Unorm, None);

    let colors = target.color_attachments(LoadOp::Load);
    assert_eq!(colors.len(), 2);
    assert_eq!(colors[0].target, RenderTo::Texture { id: first, layer: 0 });
    assert_eq!(colors[1].target, RenderTo::Texture { id: second, layer: 0 });
}

#[test]
fn reattaching_a_point_replaces_texture_and_semantic() {
    let mut device = HeadlessDevice::new(64, 32);
    let mut target = gbuffer(&mut device);
    let replacement = device.create_texture(&TextureDesc::new_2d("New Albedo", 64, 32, TextureFormat::Rgba8Unorm));
    target.attach(replacement, AttachmentPoint::Color(0), None);

    assert_eq!(target.texture(AttachmentPoint::Color(0)), Some(replacement));
    assert_eq!(target.semantic(TextureSemantic::Diffuse), None, "old semantic went with the old texture");
    assert_eq!(target.draw_buffers().len(), 2, "no duplicate draw buffer");
}

#[test]
fn semantic_lookup_finds_attached_textures() {
    let mut device = HeadlessDevice::new(64, 32);
    let target = gbuffer(&mut device);
    assert_eq!(target.semantic(TextureSemantic::Depth), target.texture(AttachmentPoint::Depth));
    assert_eq!(target.semantic(TextureSemantic::Light), None);
}

// ============================================================================
// Completeness
// ============================================================================

#[test]
fn new_target_is_unchecked_until_validated() {
    let mut device = HeadlessDevice::new(64, 32);
    let mut target = gbuffer(&mut device);
    assert_eq!(target.state(), "unchecked");
    assert!(!target.is_complete());

    assert!(target.validate(&device));
    assert_eq!(target.state(), "complete");
    assert!(target.ensure_complete().is_ok());
}

#[test]
fn attaching_after_validation_resets_state() {
    let mut device = HeadlessDevice::new(64, 32);
    let mut target = gbuffer(&mut device);
    target.validate(&device);
    target.create_attachment(&mut device, AttachmentPoint::Color(2), TextureFormat::Rgba8Unorm, None);
    assert_eq!(target.state(), "unchecked");
}

#[test]
fn mismatched_size_is_incomplete() {
    let mut device = HeadlessDevice::new(64, 32);
    let mut target = gbuffer(&mut device);
    let wrong = device.create_texture(&TextureDesc::new_2d("Wrong", 16, 16, TextureFormat::Rgba8Unorm));
    target.attach(wrong, AttachmentPoint::Color(2), None);

    assert!(!target.validate(&device));
    assert!(target.state().contains("16x16"), "diagnostic names the size: {}", target.state());

    let err = target.ensure_complete().unwrap_err();
    assert!(matches!(err, RenderError::RenderTargetIncomplete(_)));
    assert!(err.to_string().contains("G-Buffer"), "error names the target: {err}");
}

#[test]
fn depth_format_on_color_point_is_incomplete() {
    let mut device = HeadlessDevice::new(8, 8);
    let mut target = RenderTarget::new("Bad", 8, 8);
    target.create_attachment(&mut device, AttachmentPoint::Color(0), TextureFormat::Depth32Float, None);
    assert!(!target.validate(&device));
    assert!(target.state().contains("depth format"));
}

#[test]
fn empty_target_is_incomplete() {
    let device = HeadlessDevice::new(8, 8);
    let mut target = RenderTarget::new("Empty", 8, 8);
    assert!(!target.validate(&device));
    assert_eq!(target.state(), "no attachments");
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_keeps_formats_and_stays_complete() {
    let mut device = HeadlessDevice::new(64, 32);
    let mut target = gbuffer(&mut device);
    target.resize(&mut device, 128, 96).expect("resize");

    assert_eq!(target.size(), (128, 96));
    let normal = target.texture(AttachmentPoint::Color(1)).expect("normal attachment");
    let desc = device.texture_desc(normal).expect("texture exists");
    assert_eq!((desc.width, desc.height), (128, 96));
    assert_eq!(desc.format, TextureFormat::Rgba16Float, "format survives the resize");
    assert!(target.validate(&device));
}

#[test]
fn resize_clamps_zero_dimensions() {
    let mut device = HeadlessDevice::new(64, 32);
    let mut target = gbuffer(&mut device);
    target.resize(&mut device, 0, 0).expect("resize");
    assert_eq!(target.size(), (1, 1));
}
