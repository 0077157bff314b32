use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use log::warn;

use crate::config::{Config, RenderConfig};
use crate::containment::{
    ClipDefinition, ContainmentKind, ContainmentRequirements, collect_containment_requirements,
};
use crate::enforce::{EnforcementResult, enforce_boundaries};
use crate::error::SceneResult;
use crate::geometry::Rect;
use crate::scene::{Connector, ConnectorRoute, Def, Flow, Node, Port, PortSide, Scene, ShapeKind};
use crate::text_metrics;
use crate::theme::Theme;
use crate::timeline::stagger_flow_timings;

/// Everything the two-pass pipeline produced for one scene.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub svg: String,
    pub enforcement: EnforcementResult,
    pub containment: ContainmentRequirements,
}

/// The two-pass driver: pass 1 enforces boundaries, pass 2 derives the
/// containment definitions and paints markup consistent with them.
///
/// Children are painted at their snapped absolute positions; the advisory
/// clamp from suggested fixes is never applied. Flow animations are
/// staggered as a final timeline rewrite.
pub fn render_scene(scene: &Scene, config: &Config) -> SceneResult<RenderOutput> {
    let enforcement = enforce_boundaries(scene)?;
    let containment = collect_containment_requirements(scene, &enforcement);
    let mut svg = render_svg(scene, &enforcement, &containment, &config.theme, &config.render);
    if !scene.flows.is_empty() {
        svg = stagger_flow_timings(&svg, config.render.flow_stagger_step);
    }
    Ok(RenderOutput {
        svg,
        enforcement,
        containment,
    })
}

/// Paints a scene as SVG markup using pass-1 absolute rectangles and pass-2
/// containment definitions. Pure string building; no IO.
pub fn render_svg(
    scene: &Scene,
    enforcement: &EnforcementResult,
    containment: &ContainmentRequirements,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let mut svg = String::new();
    let width = scene.canvas.width.max(1.0);
    let height = scene.canvas.height.max(1.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));

    let background = scene.bg.as_deref().unwrap_or(&theme.background);
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(background)
    ));

    svg.push_str(&render_defs(scene, containment, theme, config));

    // Containment kind per boundary id, for the clip/mask group attribute.
    let clip_kinds: HashMap<&str, ContainmentKind> = containment
        .clip_paths
        .iter()
        .filter_map(|def| Some((def.id.strip_prefix("clip-")?, def.kind)))
        .collect();

    for node in &scene.nodes {
        paint_node(node, enforcement, &clip_kinds, theme, config, &mut svg);
    }

    for port in &scene.ports {
        svg.push_str(&port_svg(port, enforcement, theme, config));
    }

    for connector in &scene.connectors {
        svg.push_str(&connector_svg(connector, enforcement, theme, config));
    }

    for flow in &scene.flows {
        svg.push_str(&flow_svg(flow, enforcement, theme, config));
    }

    svg.push_str("</svg>");
    svg
}

fn render_defs(
    scene: &Scene,
    containment: &ContainmentRequirements,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let mut defs = String::new();
    defs.push_str("<defs>");
    defs.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.connector_color
    ));

    for def in &scene.defs {
        match def {
            Def::Symbol {
                id,
                markup,
                view_box,
            } => {
                let view_box = view_box
                    .as_deref()
                    .map(|vb| format!(" viewBox=\"{}\"", escape_xml(vb)))
                    .unwrap_or_default();
                defs.push_str(&format!(
                    "<symbol id=\"{}\"{view_box}>{markup}</symbol>",
                    escape_xml(id)
                ));
            }
            Def::Raw { markup } => defs.push_str(markup),
        }
    }

    if containment
        .clip_paths
        .iter()
        .any(|def| def.kind == ContainmentKind::Mask)
    {
        defs.push_str(&format!(
            "<filter id=\"mask-soften\"><feGaussianBlur stdDeviation=\"{:.2}\"/></filter>",
            config.mask_edge_blur
        ));
    }

    for def in &containment.clip_paths {
        defs.push_str(&containment_def_svg(def, config));
    }

    defs.push_str("</defs>");
    defs
}

fn containment_def_svg(def: &ClipDefinition, config: &RenderConfig) -> String {
    let rect = &def.rect;
    match def.kind {
        ContainmentKind::Clip => format!(
            "<clipPath id=\"{}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\"/></clipPath>",
            escape_xml(&def.id),
            rect.x,
            rect.y,
            rect.w,
            rect.h,
            config.boundary_corner_radius
        ),
        // Soft containment: a blurred white rect so overflow fades out
        // instead of cutting hard.
        ContainmentKind::Mask => format!(
            "<mask id=\"{}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\" fill=\"white\" filter=\"url(#mask-soften)\"/></mask>",
            escape_xml(&def.id),
            rect.x,
            rect.y,
            rect.w,
            rect.h,
            config.boundary_corner_radius
        ),
    }
}

fn paint_node(
    node: &Node,
    enforcement: &EnforcementResult,
    clip_kinds: &HashMap<&str, ContainmentKind>,
    theme: &Theme,
    config: &RenderConfig,
    svg: &mut String,
) {
    let Some(rect) = enforcement.absolute_rect(node.id()).copied() else {
        warn!("node '{}' missing from enforcement table, skipped", node.id());
        return;
    };

    match node {
        Node::Boundary {
            id,
            title,
            children,
            ..
        } => {
            let containment_attr = match clip_kinds.get(id.as_str()) {
                Some(ContainmentKind::Clip) => format!(" clip-path=\"url(#clip-{})\"", escape_xml(id)),
                Some(ContainmentKind::Mask) => format!(" mask=\"url(#clip-{})\"", escape_xml(id)),
                None => String::new(),
            };
            svg.push_str(&format!(
                "<g data-boundary=\"{}\"{containment_attr}>",
                escape_xml(id)
            ));
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                config.boundary_corner_radius,
                theme.boundary_fill,
                theme.boundary_border,
                config.boundary_stroke_width
            ));
            if let Some(title) = title {
                svg.push_str(&format!(
                    "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
                    rect.x + config.boundary_title_inset_x,
                    rect.y + config.boundary_title_inset_y,
                    theme.font_family,
                    theme.title_font_size,
                    theme.boundary_title_color,
                    escape_xml(title)
                ));
            }
            for child in children {
                paint_node(child, enforcement, clip_kinds, theme, config, svg);
            }
            svg.push_str("</g>");
        }
        Node::Group { id, children, .. } => {
            svg.push_str(&format!("<g data-group=\"{}\">", escape_xml(id)));
            for child in children {
                paint_node(child, enforcement, clip_kinds, theme, config, svg);
            }
            svg.push_str("</g>");
        }
        Node::Sprite { symbol, .. } => {
            svg.push_str(&format!(
                "<use href=\"#{}\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\"/>",
                escape_xml(symbol),
                rect.x,
                rect.y,
                rect.width,
                rect.height
            ));
        }
        Node::Shape { shape, style, .. } => {
            let style = style.clone().unwrap_or_default();
            let fill = style.fill.as_deref().unwrap_or(&theme.shape_fill);
            let stroke = style.stroke.as_deref().unwrap_or(&theme.shape_border);
            let stroke_width = style.stroke_width.unwrap_or(config.shape_stroke_width);
            let paint = format!(
                "fill=\"{}\" stroke=\"{}\" stroke-width=\"{stroke_width:.2}\"",
                escape_xml(fill),
                escape_xml(stroke)
            );
            match shape {
                ShapeKind::Rect => svg.push_str(&format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" {paint}/>",
                    rect.x, rect.y, rect.width, rect.height
                )),
                ShapeKind::Rounded => svg.push_str(&format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\" {paint}/>",
                    rect.x, rect.y, rect.width, rect.height, config.shape_corner_radius
                )),
                ShapeKind::Circle => {
                    let r = rect.width.min(rect.height) / 2.0;
                    svg.push_str(&format!(
                        "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{r:.2}\" {paint}/>",
                        rect.x + rect.width / 2.0,
                        rect.y + rect.height / 2.0
                    ));
                }
                ShapeKind::Ellipse => svg.push_str(&format!(
                    "<ellipse cx=\"{:.2}\" cy=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" {paint}/>",
                    rect.x + rect.width / 2.0,
                    rect.y + rect.height / 2.0,
                    rect.width / 2.0,
                    rect.height / 2.0
                )),
            }
        }
        Node::Text { content, .. } => {
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                rect.x,
                rect.y + theme.font_size,
                theme.font_family,
                theme.font_size,
                theme.text_color,
                escape_xml(content)
            ));
        }
        Node::RawSvg { markup, .. } => {
            // Raw markup is inserted verbatim by design; it came from the
            // scene's author, same as a defs entry.
            svg.push_str(&format!(
                "<g transform=\"translate({:.2} {:.2})\">{markup}</g>",
                rect.x, rect.y
            ));
        }
    }
}

fn center(rect: &Rect) -> (f32, f32) {
    (rect.x + rect.width / 2.0, rect.y + rect.height / 2.0)
}

fn endpoint_centers(
    from: &str,
    to: &str,
    enforcement: &EnforcementResult,
) -> Option<((f32, f32), (f32, f32))> {
    let start = enforcement.absolute_rect(from).map(center)?;
    let end = enforcement.absolute_rect(to).map(center)?;
    Some((start, end))
}

fn route_path(start: (f32, f32), end: (f32, f32), route: ConnectorRoute) -> String {
    match route {
        ConnectorRoute::Straight => format!(
            "M {:.2} {:.2} L {:.2} {:.2}",
            start.0, start.1, end.0, end.1
        ),
        ConnectorRoute::Elbow => {
            let mid_x = (start.0 + end.0) / 2.0;
            format!(
                "M {:.2} {:.2} L {mid_x:.2} {:.2} L {mid_x:.2} {:.2} L {:.2} {:.2}",
                start.0, start.1, start.1, end.1, end.0, end.1
            )
        }
    }
}

fn connector_svg(
    connector: &Connector,
    enforcement: &EnforcementResult,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let Some((start, end)) = endpoint_centers(&connector.from, &connector.to, enforcement) else {
        warn!(
            "connector '{}' references unknown node, skipped",
            connector.id
        );
        return String::new();
    };
    let mut svg = String::new();
    let marker = if connector.directed {
        " marker-end=\"url(#arrow)\""
    } else {
        ""
    };
    svg.push_str(&format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\"{marker}/>",
        route_path(start, end, connector.route),
        theme.connector_color,
        config.connector_stroke_width
    ));

    if let Some(label) = &connector.label {
        let x = (start.0 + end.0) / 2.0;
        let y = (start.1 + end.1) / 2.0;
        let label_width = label_width(label, theme, config);
        let rect_x = x - label_width / 2.0 - config.label_padding_x;
        let rect_y = y - theme.font_size / 2.0 - config.label_padding_y;
        let rect_w = label_width + config.label_padding_x * 2.0;
        let rect_h = theme.font_size + config.label_padding_y * 2.0;
        svg.push_str(&format!(
            "<rect x=\"{rect_x:.2}\" y=\"{rect_y:.2}\" width=\"{rect_w:.2}\" height=\"{rect_h:.2}\" rx=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
            theme.connector_label_background, theme.boundary_border
        ));
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            y + theme.font_size * 0.35,
            theme.font_family,
            theme.font_size,
            theme.text_color,
            escape_xml(label)
        ));
    }
    svg
}

fn flow_svg(
    flow: &Flow,
    enforcement: &EnforcementResult,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let Some((start, end)) = endpoint_centers(&flow.from, &flow.to, enforcement) else {
        warn!("flow '{}' references unknown node, skipped", flow.id);
        return String::new();
    };
    let color = flow.color.as_deref().unwrap_or(&theme.flow_color);
    let path_id = format!("flow-{}", flow.id);
    format!(
        "<path id=\"{}\" d=\"{}\" fill=\"none\" stroke=\"none\"/><circle r=\"{:.2}\" fill=\"{}\"><animateMotion dur=\"{}s\" begin=\"0s\" repeatCount=\"indefinite\"><mpath href=\"#{}\"/></animateMotion></circle>",
        escape_xml(&path_id),
        route_path(start, end, ConnectorRoute::Straight),
        config.flow_dot_radius,
        escape_xml(color),
        flow.duration,
        escape_xml(&path_id)
    )
}

fn port_svg(
    port: &Port,
    enforcement: &EnforcementResult,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let Some(rect) = enforcement.absolute_rect(&port.node) else {
        warn!("port '{}' references unknown node, skipped", port.id);
        return String::new();
    };
    let offset = port.offset.clamp(0.0, 1.0);
    let (cx, cy) = match port.side {
        PortSide::Top => (rect.x + rect.width * offset, rect.y),
        PortSide::Bottom => (rect.x + rect.width * offset, rect.bottom()),
        PortSide::Left => (rect.x, rect.y + rect.height * offset),
        PortSide::Right => (rect.right(), rect.y + rect.height * offset),
    };
    format!(
        "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        config.port_radius, theme.port_fill, theme.port_border
    )
}

fn label_width(text: &str, theme: &Theme, config: &RenderConfig) -> f32 {
    if config.fast_text_metrics {
        return text_metrics::estimate_text_width(text, theme.font_size);
    }
    text_metrics::measure_text_width(text, theme.font_size, &theme.font_family)
        .unwrap_or_else(|| text_metrics::estimate_text_width(text, theme.font_size))
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .unwrap_or(usvg::Size::from_wh(800.0, 600.0).unwrap());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::parse_scene;

    fn storybook_scene() -> Scene {
        parse_scene(
            r#"{
                "id": "journey", "canvas": {"width": 640, "height": 480},
                "defs": [{"type": "symbol", "id": "bus", "markup": "<rect width=\"40\" height=\"20\"/>"}],
                "nodes": [
                    {"kind": "boundary", "id": "depot", "title": "Depot",
                     "at": {"x": 40, "y": 40}, "size": {"width": 280, "height": 180},
                     "children": [
                        {"kind": "sprite", "id": "bus-1", "at": {"x": 20, "y": 60},
                         "size": {"width": 40, "height": 20}, "symbol": "bus"},
                        {"kind": "text", "id": "caption", "at": {"x": 20, "y": 20},
                         "content": "All aboard & away"}
                     ]},
                    {"kind": "boundary", "id": "fade", "at": {"x": 360, "y": 40},
                     "size": {"width": 200, "height": 180},
                     "policy": {"overflow": "mask"}, "children": []},
                    {"kind": "shape", "id": "stop", "at": {"x": 400, "y": 300},
                     "size": {"width": 60, "height": 60}, "shape": "circle"}
                ],
                "connectors": [{"id": "c1", "from": "bus-1", "to": "stop", "label": "route 7"}],
                "flows": [{"id": "f1", "from": "depot", "to": "stop"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn renders_clip_and_mask_defs() {
        let scene = storybook_scene();
        let output = render_scene(&scene, &Config::default()).unwrap();
        assert!(output.svg.contains("<clipPath id=\"clip-depot\">"));
        assert!(output.svg.contains("<mask id=\"clip-fade\">"));
        assert!(output.svg.contains("clip-path=\"url(#clip-depot)\""));
        assert!(output.svg.contains("mask=\"url(#clip-fade)\""));
        assert!(output.svg.contains("filter=\"url(#mask-soften)\""));
    }

    #[test]
    fn loose_boundary_group_has_no_containment_attr() {
        let scene = parse_scene(
            r#"{
                "id": "s", "canvas": {"width": 100, "height": 100},
                "nodes": [{"kind": "boundary", "id": "open", "at": {"x": 0, "y": 0},
                           "size": {"width": 80, "height": 80},
                           "policy": {"mode": "loose"}, "children": []}]
            }"#,
        )
        .unwrap();
        let output = render_scene(&scene, &Config::default()).unwrap();
        assert!(output.svg.contains("data-boundary=\"open\""));
        assert!(!output.svg.contains("clip-path"));
        assert!(!output.svg.contains("<mask"));
    }

    #[test]
    fn children_paint_at_snapped_positions() {
        let scene = parse_scene(
            r#"{
                "id": "s", "canvas": {"width": 400, "height": 400},
                "nodes": [{"kind": "boundary", "id": "b", "at": {"x": 50, "y": 50},
                           "size": {"width": 200, "height": 150},
                           "policy": {"snap": {"grid": 10}},
                           "children": [
                               {"kind": "shape", "id": "child", "at": {"x": 23, "y": 37},
                                "size": {"width": 10, "height": 10}}
                           ]}]
            }"#,
        )
        .unwrap();
        let output = render_scene(&scene, &Config::default()).unwrap();
        assert!(output.svg.contains("x=\"70.00\" y=\"90.00\""));
    }

    #[test]
    fn connector_and_flow_markup() {
        let scene = storybook_scene();
        let output = render_scene(&scene, &Config::default()).unwrap();
        assert!(output.svg.contains("marker-end=\"url(#arrow)\""));
        assert!(output.svg.contains("route 7"));
        assert!(output.svg.contains("<animateMotion"));
        assert!(output.svg.contains("<mpath href=\"#flow-f1\"/>"));
    }

    #[test]
    fn user_text_is_escaped() {
        let scene = storybook_scene();
        let output = render_scene(&scene, &Config::default()).unwrap();
        assert!(output.svg.contains("All aboard &amp; away"));
        assert!(!output.svg.contains("aboard & away"));
    }

    #[test]
    fn symbols_land_in_defs_and_sprites_reference_them() {
        let scene = storybook_scene();
        let output = render_scene(&scene, &Config::default()).unwrap();
        assert!(output.svg.contains("<symbol id=\"bus\">"));
        assert!(output.svg.contains("<use href=\"#bus\""));
    }

    #[test]
    fn unknown_connector_endpoints_are_skipped() {
        let scene = parse_scene(
            r#"{
                "id": "s", "canvas": {"width": 100, "height": 100},
                "nodes": [{"kind": "shape", "id": "a", "at": {"x": 10, "y": 10},
                           "size": {"width": 10, "height": 10}}],
                "connectors": [{"id": "dangling", "from": "a", "to": "ghost"}]
            }"#,
        )
        .unwrap();
        let output = render_scene(&scene, &Config::default()).unwrap();
        assert!(output.svg.contains("<svg"));
        assert!(!output.svg.contains("marker-end"));
    }
}
