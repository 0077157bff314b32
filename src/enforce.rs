use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::error::SceneResult;
use crate::geometry::{Rect, clamp_to, contains};
use crate::scene::{BoundaryPolicy, Node, Point, PolicyMode, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    OutOfBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One detected policy violation.
///
/// Violations are expected, recoverable output. The `suggested_fix` is the
/// clamped rectangle that would reposition the node inside its boundary; it
/// is advisory and is never applied by the pipeline itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub node_id: String,
    pub boundary_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<Rect>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_nodes: usize,
    pub boundaries_processed: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Output of one enforcement pass.
///
/// The `absolute` side table maps node identifiers to canvas-coordinate
/// rectangles; it is the "annotated scene" without mutating the input. The
/// recorded position of a boundary child reflects its snap correction but
/// never the advisory clamp from a suggested fix.
#[derive(Debug, Clone)]
pub struct EnforcementResult {
    pub absolute: BTreeMap<String, Rect>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

impl EnforcementResult {
    pub fn absolute_rect(&self, node_id: &str) -> Option<&Rect> {
        self.absolute.get(node_id)
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}

struct Frame<'a> {
    boundary_id: &'a str,
    rect: Rect,
    policy: BoundaryPolicy,
}

/// Walks the scene tree depth-first, computing absolute rectangles and
/// applying each boundary's policy to its direct children.
///
/// Fails only on structural problems ([`Scene::validate`]); a scene full of
/// overflowing children is a normal, successful result. The input scene is
/// never mutated, so concurrent calls over the same scene are safe.
pub fn enforce_boundaries(scene: &Scene) -> SceneResult<EnforcementResult> {
    scene.validate()?;
    let mut result = EnforcementResult {
        absolute: BTreeMap::new(),
        diagnostics: Vec::new(),
        summary: Summary::default(),
    };
    let origin = Point { x: 0.0, y: 0.0 };
    for node in &scene.nodes {
        visit(node, origin, None, &mut result);
    }
    debug!(
        "enforced scene '{}': {} nodes, {} boundaries, {} errors, {} warnings",
        scene.id,
        result.summary.total_nodes,
        result.summary.boundaries_processed,
        result.summary.errors,
        result.summary.warnings
    );
    Ok(result)
}

fn visit(node: &Node, base: Point, frame: Option<&Frame<'_>>, out: &mut EnforcementResult) {
    out.summary.total_nodes += 1;

    let at = node.at();
    let size = node.size();
    let mut rect = Rect::new(base.x + at.x, base.y + at.y, size.width, size.height);

    if let Some(frame) = frame {
        if let Some(snap) = &frame.policy.snap {
            rect = rect.snapped(snap.grid);
        }
        if !contains(&frame.rect, &rect, frame.policy.tolerance) {
            let diagnostic = violation(node.id(), &rect, frame, &mut out.summary);
            out.diagnostics.push(diagnostic);
        }
    }

    out.absolute.insert(node.id().to_string(), rect);

    // The snapped absolute position is the base offset for descendants.
    let child_base = Point {
        x: rect.x,
        y: rect.y,
    };

    if let Node::Boundary { id, policy, .. } = node {
        out.summary.boundaries_processed += 1;
        let child_frame = Frame {
            boundary_id: id,
            rect,
            policy: policy.clone().unwrap_or_default(),
        };
        debug!(
            "boundary '{id}' frame ({:.1},{:.1} {:.1}x{:.1})",
            rect.x, rect.y, rect.width, rect.height
        );
        for child in node.children() {
            visit(child, child_base, Some(&child_frame), out);
        }
    } else {
        // Plain groups nest children without establishing a frame: a policy
        // governs only the boundary's direct children.
        for child in node.children() {
            visit(child, child_base, None, out);
        }
    }
}

fn violation(node_id: &str, rect: &Rect, frame: &Frame<'_>, summary: &mut Summary) -> Diagnostic {
    let severity = match frame.policy.mode {
        PolicyMode::Strict => Severity::Error,
        PolicyMode::Loose => Severity::Warning,
    };
    match severity {
        Severity::Error => summary.errors += 1,
        Severity::Warning => summary.warnings += 1,
    }
    // A degenerate child (negative extent) gets no proposed position; a
    // clamp against a nonsensical size is worse than no proposal.
    let suggested_fix = if rect.width < 0.0 || rect.height < 0.0 {
        None
    } else {
        Some(clamp_to(&frame.rect, rect))
    };
    let message = format!(
        "node '{node_id}' at ({:.1},{:.1} {:.1}x{:.1}) overflows boundary '{}' ({:.1},{:.1} {:.1}x{:.1}) at tolerance {:.1}",
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        frame.boundary_id,
        frame.rect.x,
        frame.rect.y,
        frame.rect.width,
        frame.rect.height,
        frame.policy.tolerance
    );
    debug!("{message}");
    Diagnostic {
        code: DiagnosticCode::OutOfBounds,
        severity,
        node_id: node_id.to_string(),
        boundary_id: frame.boundary_id.to_string(),
        message,
        suggested_fix,
    }
}
