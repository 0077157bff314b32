use log::warn;
use serde::Serialize;

use crate::enforce::EnforcementResult;
use crate::geometry::Rect;
use crate::scene::{BoundaryPolicy, Node, Overflow, PolicyMode, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainmentKind {
    Clip,
    Mask,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<Rect> for ClipRect {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.width,
            h: rect.height,
        }
    }
}

/// One clip or mask definition for the paint pass, serialized as
/// `{id, rect: {x, y, w, h}, type}`.
#[derive(Debug, Clone, Serialize)]
pub struct ClipDefinition {
    pub id: String,
    pub rect: ClipRect,
    #[serde(rename = "type")]
    pub kind: ContainmentKind,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentRequirements {
    pub clip_paths: Vec<ClipDefinition>,
}

fn effective_policy(node: &Node) -> Option<BoundaryPolicy> {
    match node {
        Node::Boundary { policy, .. } => Some(policy.clone().unwrap_or_default()),
        _ => None,
    }
}

/// True when the boundary's effective policy requires visual containment.
///
/// The absence of a policy is not the absence of enforcement: a policy-less
/// boundary defaults to strict mode and needs containment. Only an explicit
/// loose mode opts out.
pub fn needs_containment(node: &Node) -> bool {
    matches!(
        effective_policy(node),
        Some(policy) if policy.mode == PolicyMode::Strict
    )
}

/// Builds the clip/mask definition for a boundary from its absolute rect.
///
/// The identifier is derived deterministically (`clip-<boundary id>`) and
/// the kind mirrors the policy's overflow setting. Returns `None` for
/// non-boundary nodes.
pub fn generate_clip_path(node: &Node, absolute: Rect) -> Option<ClipDefinition> {
    let policy = effective_policy(node)?;
    Some(ClipDefinition {
        id: format!("clip-{}", node.id()),
        rect: absolute.into(),
        kind: match policy.overflow {
            Overflow::Clip => ContainmentKind::Clip,
            Overflow::Mask => ContainmentKind::Mask,
        },
    })
}

/// Walks the scene and returns one definition per boundary whose policy
/// requires containment; loose boundaries are omitted. Results are
/// independent per boundary, so traversal order does not matter.
pub fn collect_containment_requirements(
    scene: &Scene,
    result: &EnforcementResult,
) -> ContainmentRequirements {
    let mut requirements = ContainmentRequirements::default();
    let mut stack: Vec<&Node> = scene.nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.is_boundary() && needs_containment(node) {
            match result.absolute_rect(node.id()) {
                Some(rect) => {
                    if let Some(def) = generate_clip_path(node, *rect) {
                        requirements.clip_paths.push(def);
                    }
                }
                None => warn!("boundary '{}' missing from enforcement table", node.id()),
            }
        }
        stack.extend(node.children().iter().rev());
    }
    requirements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforce::enforce_boundaries;
    use crate::scene::parse_scene;

    fn boundary_node(policy: &str) -> Node {
        let doc = format!(
            r#"{{"kind": "boundary", "id": "frame", "at": {{"x": 10, "y": 20}},
                "size": {{"width": 100, "height": 80}}{policy}, "children": []}}"#
        );
        serde_json::from_str(&doc).unwrap()
    }

    #[test]
    fn strict_and_default_boundaries_need_containment() {
        assert!(needs_containment(&boundary_node("")));
        assert!(needs_containment(&boundary_node(
            r#", "policy": {"mode": "strict", "overflow": "mask"}"#
        )));
        assert!(!needs_containment(&boundary_node(
            r#", "policy": {"mode": "loose"}"#
        )));
        assert!(!needs_containment(&boundary_node(
            r#", "policy": {"mode": "loose", "overflow": "mask"}"#
        )));
    }

    #[test]
    fn clip_ids_are_deterministic() {
        let node = boundary_node("");
        let def = generate_clip_path(&node, Rect::new(10.0, 20.0, 100.0, 80.0)).unwrap();
        assert_eq!(def.id, "clip-frame");
        assert_eq!(def.kind, ContainmentKind::Clip);
        assert_eq!(def.rect.w, 100.0);
    }

    #[test]
    fn mask_overflow_mirrors_into_kind() {
        let node = boundary_node(r#", "policy": {"overflow": "mask"}"#);
        let def = generate_clip_path(&node, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(def.kind, ContainmentKind::Mask);
    }

    #[test]
    fn loose_boundaries_are_omitted_from_collection() {
        let doc = r#"{
            "id": "mix", "canvas": {"width": 500, "height": 400},
            "nodes": [
                {"kind": "boundary", "id": "hard", "at": {"x": 10, "y": 10},
                 "size": {"width": 200, "height": 100}, "children": [
                    {"kind": "boundary", "id": "soft", "at": {"x": 20, "y": 20},
                     "size": {"width": 60, "height": 40},
                     "policy": {"mode": "loose"}, "children": []}
                 ]}
            ]
        }"#;
        let scene = parse_scene(doc).unwrap();
        let result = enforce_boundaries(&scene).unwrap();
        let requirements = collect_containment_requirements(&scene, &result);
        assert_eq!(requirements.clip_paths.len(), 1);
        assert_eq!(requirements.clip_paths[0].id, "clip-hard");
    }

    #[test]
    fn geometry_comes_from_the_enforcement_table() {
        let doc = r#"{
            "id": "nested", "canvas": {"width": 500, "height": 400},
            "nodes": [
                {"kind": "boundary", "id": "outer", "at": {"x": 100, "y": 100},
                 "size": {"width": 300, "height": 200}, "children": [
                    {"kind": "boundary", "id": "inner", "at": {"x": 30, "y": 30},
                     "size": {"width": 100, "height": 60}, "children": []}
                 ]}
            ]
        }"#;
        let scene = parse_scene(doc).unwrap();
        let result = enforce_boundaries(&scene).unwrap();
        let requirements = collect_containment_requirements(&scene, &result);
        let inner = requirements
            .clip_paths
            .iter()
            .find(|def| def.id == "clip-inner")
            .unwrap();
        assert_eq!(inner.rect.x, 130.0);
        assert_eq!(inner.rect.y, 130.0);
        assert_eq!(inner.rect.w, 100.0);
    }
}
