use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};

/// A local position relative to the parent node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

/// Containment mode of a boundary. Strict violations are errors, loose
/// violations are warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    Strict,
    Loose,
}

/// How overflowing content is visually contained: hard clip edges or a
/// soft-edged mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    Clip,
    Mask,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapSpec {
    pub grid: f32,
}

/// Enforcement configuration attached to a boundary node.
///
/// A boundary with no policy behaves exactly like one carrying
/// [`BoundaryPolicy::default()`]: strict mode, clip overflow, 1px tolerance,
/// positions snapped to a 2px grid. Each boundary's policy governs only its
/// direct children; nested boundaries never inherit or compose ancestor
/// settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPolicy {
    #[serde(default = "default_mode")]
    pub mode: PolicyMode,
    #[serde(default = "default_overflow")]
    pub overflow: Overflow,
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    #[serde(default = "default_snap")]
    pub snap: Option<SnapSpec>,
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            overflow: default_overflow(),
            tolerance: default_tolerance(),
            snap: default_snap(),
        }
    }
}

fn default_mode() -> PolicyMode {
    PolicyMode::Strict
}

fn default_overflow() -> Overflow {
    Overflow::Clip
}

fn default_tolerance() -> f32 {
    1.0
}

fn default_snap() -> Option<SnapSpec> {
    Some(SnapSpec { grid: 2.0 })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rect,
    Rounded,
    Circle,
    Ellipse,
}

/// Per-node paint overrides; unset fields fall back to the theme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default)]
    pub stroke_width: Option<f32>,
}

/// A scene node. Variants are dispatched by the `kind` tag in the JSON
/// document (`"boundary"`, `"group"`, `"sprite"`, `"shape"`, `"text"`,
/// `"raw-svg"`).
///
/// Any node may carry children (generic nesting), but only boundary nodes
/// enforce a containment policy on their direct children.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Node {
    Boundary {
        id: String,
        #[serde(default)]
        title: Option<String>,
        at: Point,
        size: Size,
        #[serde(default)]
        policy: Option<BoundaryPolicy>,
        #[serde(default)]
        children: Vec<Node>,
    },
    Group {
        id: String,
        at: Point,
        #[serde(default)]
        size: Option<Size>,
        #[serde(default)]
        children: Vec<Node>,
    },
    Sprite {
        id: String,
        at: Point,
        size: Size,
        /// Identifier of a symbol in the scene's defs bag.
        symbol: String,
    },
    Shape {
        id: String,
        at: Point,
        size: Size,
        #[serde(default)]
        shape: ShapeKind,
        #[serde(default)]
        style: Option<NodeStyle>,
    },
    Text {
        id: String,
        at: Point,
        content: String,
        #[serde(default)]
        size: Option<Size>,
    },
    RawSvg {
        id: String,
        at: Point,
        markup: String,
        #[serde(default)]
        size: Option<Size>,
    },
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Boundary { id, .. }
            | Node::Group { id, .. }
            | Node::Sprite { id, .. }
            | Node::Shape { id, .. }
            | Node::Text { id, .. }
            | Node::RawSvg { id, .. } => id,
        }
    }

    pub fn at(&self) -> Point {
        match self {
            Node::Boundary { at, .. }
            | Node::Group { at, .. }
            | Node::Sprite { at, .. }
            | Node::Shape { at, .. }
            | Node::Text { at, .. }
            | Node::RawSvg { at, .. } => *at,
        }
    }

    /// Declared size; zero for nodes without one. A zero-area rect is still
    /// containment-tested by its origin point.
    pub fn size(&self) -> Size {
        match self {
            Node::Boundary { size, .. } | Node::Sprite { size, .. } | Node::Shape { size, .. } => {
                *size
            }
            Node::Group { size, .. } | Node::Text { size, .. } | Node::RawSvg { size, .. } => {
                size.unwrap_or_default()
            }
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Boundary { children, .. } | Node::Group { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, Node::Boundary { .. })
    }
}

/// Reusable definitions referenced by the painted output: sprite symbols and
/// verbatim markup (filters, gradients).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Def {
    Symbol {
        id: String,
        markup: String,
        #[serde(default)]
        view_box: Option<String>,
    },
    Raw { markup: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorRoute {
    Straight,
    Elbow,
}

/// A line routed between two nodes. Connectors are rendering-only: the
/// enforcement pass treats them as opaque and never containment-tests them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_directed")]
    pub directed: bool,
    #[serde(default = "default_route")]
    pub route: ConnectorRoute,
}

fn default_directed() -> bool {
    true
}

fn default_route() -> ConnectorRoute {
    ConnectorRoute::Straight
}

/// A connector with a traveling-dot animation along its path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_flow_duration")]
    pub duration: f32,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_flow_duration() -> f32 {
    3.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// An attachment point drawn on a node's edge. Rendering-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub node: String,
    pub side: PortSide,
    #[serde(default = "default_port_offset")]
    pub offset: f32,
}

fn default_port_offset() -> f32 {
    0.5
}

/// Root scene container, owned by the caller.
///
/// The enforcement pass reads a scene by reference and never mutates it; all
/// derived state (absolute rectangles, diagnostics) lives in the returned
/// [`crate::enforce::EnforcementResult`]. Because of that, concurrent
/// enforcement calls over the same `Scene` are safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub canvas: Canvas,
    #[serde(default)]
    pub bg: Option<String>,
    #[serde(default)]
    pub defs: Vec<Def>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl Scene {
    /// Validates structural invariants: unique non-empty node identifiers,
    /// finite geometry, non-negative policy tolerances.
    ///
    /// Violating these is a [`SceneError::Structure`]; boundary overflow is
    /// not structural and never fails validation.
    pub fn validate(&self) -> SceneResult<()> {
        if !self.canvas.width.is_finite() || !self.canvas.height.is_finite() {
            return Err(SceneError::structure("canvas size must be finite"));
        }
        let mut seen = HashSet::new();
        let mut stack: Vec<&Node> = self.nodes.iter().collect();
        while let Some(node) = stack.pop() {
            let id = node.id();
            if id.is_empty() {
                return Err(SceneError::structure("node with empty identifier"));
            }
            if !seen.insert(id.to_string()) {
                return Err(SceneError::structure(format!(
                    "duplicate node identifier '{id}'"
                )));
            }
            let at = node.at();
            let size = node.size();
            if !at.x.is_finite()
                || !at.y.is_finite()
                || !size.width.is_finite()
                || !size.height.is_finite()
            {
                return Err(SceneError::structure(format!(
                    "node '{id}' has non-finite geometry"
                )));
            }
            if let Node::Boundary {
                policy: Some(policy),
                ..
            } = node
            {
                if !policy.tolerance.is_finite() || policy.tolerance < 0.0 {
                    return Err(SceneError::structure(format!(
                        "boundary '{id}' has invalid tolerance {}",
                        policy.tolerance
                    )));
                }
                if let Some(snap) = &policy.snap
                    && !snap.grid.is_finite()
                {
                    return Err(SceneError::structure(format!(
                        "boundary '{id}' has non-finite snap grid"
                    )));
                }
            }
            stack.extend(node.children());
        }
        Ok(())
    }
}

/// Parses a scene document. Plain JSON is tried first; on failure the input
/// is retried as JSON5 so hand-authored scenes may use comments and trailing
/// commas.
pub fn parse_scene(input: &str) -> SceneResult<Scene> {
    if let Ok(scene) = serde_json::from_str::<Scene>(input) {
        return Ok(scene);
    }
    json5::from_str::<Scene>(input).map_err(|err| SceneError::parse(err.to_string()))
}
