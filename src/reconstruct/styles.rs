//! Style application shared by every node the reconstructor creates.

use tracing::{debug, warn};

use super::host::{FontName, HostError, NodeKind, NodeProperty, Paint, SceneHost, TextAutoResize};
use crate::css::{
    font_style_for_weight, parse_border_radius, parse_box_shadow, parse_color, parse_font_size,
    parse_font_weight, parse_opacity, parse_padding, parse_text_align,
};
use crate::types::ElementRecord;

/// Background, corner radius, shadow, opacity and padding, each only when present.
pub(crate) fn apply_common_styles<H: SceneHost>(
    host: &mut H,
    node: &H::Node,
    kind: NodeKind,
    record: &ElementRecord,
) -> Result<(), HostError> {
    if let Some(color) = record.background_color.as_deref().and_then(parse_color) {
        host.set(node, NodeProperty::Fills(vec![Paint::solid(color)]))?;
    }

    if let Some(radius) = record.border_radius.as_deref() {
        if kind.has_corner_radius() {
            host.set(
                node,
                NodeProperty::CornerRadius(parse_border_radius(Some(radius))),
            )?;
        }
    }

    if let Some(shadow) = parse_box_shadow(record.box_shadow.as_ref()) {
        host.set(node, NodeProperty::Effects(vec![shadow]))?;
    }

    if let Some(raw) = record.opacity.as_deref().filter(|value| *value != "1") {
        match parse_opacity(Some(raw)) {
            Some(opacity) => host.set(node, NodeProperty::Opacity(opacity))?,
            None => debug!(opacity = raw, "ignoring out-of-range opacity"),
        }
    }

    if let Some(padding) = record.padding.as_ref() {
        if kind.has_padding() {
            host.set(node, NodeProperty::Padding(parse_padding(Some(padding))))?;
        }
    }
    Ok(())
}

/// The font a record asks for: its first family at the style matching its weight.
pub(crate) fn requested_font(record: &ElementRecord, fallback: &FontName) -> FontName {
    let family = record
        .font_family
        .as_deref()
        .filter(|family| !family.trim().is_empty())
        .unwrap_or(&fallback.family);
    let weight = parse_font_weight(record.font_weight.as_deref());
    FontName::new(family, font_style_for_weight(weight))
}

/// Load `wanted`, or the fallback when `wanted` is unavailable.
pub(crate) async fn activate_font<H: SceneHost>(
    host: &mut H,
    wanted: FontName,
    fallback: &FontName,
) -> Result<FontName, HostError> {
    match host.load_font(&wanted).await {
        Ok(()) => Ok(wanted),
        Err(err) => {
            warn!(font = %wanted, fallback = %fallback, error = %err, "font unavailable, falling back");
            host.load_font(fallback).await?;
            Ok(fallback.clone())
        }
    }
}

/// Font, size, color and alignment, then shrink-to-fit sizing.
pub(crate) async fn apply_text_styles<H: SceneHost>(
    host: &mut H,
    node: &H::Node,
    record: &ElementRecord,
    fallback: &FontName,
) -> Result<(), HostError> {
    let font = activate_font(host, requested_font(record, fallback), fallback).await?;
    host.set(node, NodeProperty::Font(font))?;

    if record.font_size.is_some() {
        let size = parse_font_size(record.font_size.as_deref());
        host.set(node, NodeProperty::FontSize(size))?;
    }

    if let Some(color) = record.color.as_deref().and_then(parse_color) {
        host.set(node, NodeProperty::Fills(vec![Paint::solid(color)]))?;
    }

    if record.text_align.is_some() {
        let align = parse_text_align(record.text_align.as_deref());
        host.set(node, NodeProperty::TextAlignHorizontal(align))?;
    }

    host.set(
        node,
        NodeProperty::TextAutoResize(TextAutoResize::WidthAndHeight),
    )
}
