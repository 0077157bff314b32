use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::warn;
use serde::Serialize;

use crate::enforce::{Diagnostic, EnforcementResult, Summary, enforce_boundaries};
use crate::scene::{Point, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionKind {
    MoveNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestedChanges {
    pub at: Point,
}

/// A machine-applicable fix derived from one diagnostic. Moving is the only
/// modeled fix; resizing is never proposed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub node_id: String,
    pub changes: SuggestedChanges,
    pub confidence: Confidence,
}

/// The standalone diagnostics product, meant to be serialized as JSON for
/// machine consumption (for example by an automated layout-fixing agent).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub scene_id: String,
    pub summary: Summary,
    pub diagnostics: Vec<Diagnostic>,
    pub suggestions: Vec<Suggestion>,
}

/// Runs enforcement and packages the outcome as a [`Report`].
///
/// This is a best-effort QA entry point and is total: a structurally invalid
/// scene degrades to an empty report (scene id preserved) instead of an
/// error, because the report itself is the product. A clean report with zero
/// findings is a normal terminal state.
pub fn generate_diagnostic_report(scene: &Scene) -> Report {
    match enforce_boundaries(scene) {
        Ok(result) => {
            let suggestions = generate_auto_fix_suggestions(&result);
            Report {
                scene_id: scene.id.clone(),
                summary: result.summary,
                diagnostics: result.diagnostics,
                suggestions,
            }
        }
        Err(err) => {
            warn!("diagnostic report for '{}' degraded to empty: {err}", scene.id);
            Report {
                scene_id: scene.id.clone(),
                summary: Summary::default(),
                diagnostics: Vec::new(),
                suggestions: Vec::new(),
            }
        }
    }
}

/// Derives MOVE_NODE suggestions from an enforcement result.
///
/// Confidence is "high" when applying the proposed position fully resolves
/// the violation, "low" when the child exceeds its boundary's extent on some
/// axis and repositioning alone cannot contain it. Diagnostics without a
/// computable fix yield no suggestion.
pub fn generate_auto_fix_suggestions(result: &EnforcementResult) -> Vec<Suggestion> {
    result
        .diagnostics
        .iter()
        .filter_map(|diag| {
            let fix = diag.suggested_fix?;
            let confidence = match result.absolute.get(&diag.boundary_id) {
                Some(frame) if fix.width <= frame.width && fix.height <= frame.height => {
                    Confidence::High
                }
                _ => Confidence::Low,
            };
            Some(Suggestion {
                kind: SuggestionKind::MoveNode,
                node_id: diag.node_id.clone(),
                changes: SuggestedChanges {
                    at: Point { x: fix.x, y: fix.y },
                },
                confidence,
            })
        })
        .collect()
}

pub fn write_report(path: &Path, report: &Report) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::parse_scene;

    fn overflow_scene(mode: &str) -> Scene {
        let doc = format!(
            r#"{{
                "id": "qa", "canvas": {{"width": 400, "height": 300}},
                "nodes": [{{"kind": "boundary", "id": "b", "at": {{"x": 50, "y": 50}},
                           "size": {{"width": 200, "height": 150}},
                           "policy": {{"mode": "{mode}", "tolerance": 0, "snap": null}},
                           "children": [
                               {{"kind": "shape", "id": "child", "at": {{"x": 180, "y": 120}},
                                 "size": {{"width": 50, "height": 50}}}}
                           ]}}]
            }}"#
        );
        parse_scene(&doc).unwrap()
    }

    #[test]
    fn report_matches_enforcement_diagnostics() {
        let scene = overflow_scene("strict");
        let direct = enforce_boundaries(&scene).unwrap();
        let report = generate_diagnostic_report(&scene);
        assert_eq!(report.diagnostics.len(), direct.diagnostics.len());
        for (a, b) in report.diagnostics.iter().zip(direct.diagnostics.iter()) {
            assert_eq!(a.code, b.code);
        }
        assert_eq!(report.scene_id, "qa");
        assert_eq!(report.summary.errors, 1);
    }

    #[test]
    fn fitting_child_gets_high_confidence() {
        let scene = overflow_scene("strict");
        let result = enforce_boundaries(&scene).unwrap();
        let suggestions = generate_auto_fix_suggestions(&result);
        assert_eq!(suggestions.len(), 1);
        let suggestion = &suggestions[0];
        assert_eq!(suggestion.kind, SuggestionKind::MoveNode);
        assert_eq!(suggestion.node_id, "child");
        assert_eq!(suggestion.confidence, Confidence::High);
        // Clamped against frame (50,50 200x150): x 230 -> 200, y 170 -> 150.
        assert_eq!(suggestion.changes.at.x, 200.0);
        assert_eq!(suggestion.changes.at.y, 150.0);
    }

    #[test]
    fn oversized_child_gets_low_confidence() {
        let doc = r#"{
            "id": "qa", "canvas": {"width": 400, "height": 300},
            "nodes": [{"kind": "boundary", "id": "b", "at": {"x": 0, "y": 0},
                       "size": {"width": 60, "height": 60},
                       "policy": {"tolerance": 0, "snap": null},
                       "children": [
                           {"kind": "shape", "id": "wide", "at": {"x": 10, "y": 10},
                            "size": {"width": 120, "height": 20}}
                       ]}]
        }"#;
        let scene = parse_scene(doc).unwrap();
        let result = enforce_boundaries(&scene).unwrap();
        let suggestions = generate_auto_fix_suggestions(&result);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].confidence, Confidence::Low);
    }

    #[test]
    fn malformed_scene_degrades_to_empty_report() {
        let doc = r#"{
            "id": "broken", "canvas": {"width": 100, "height": 100},
            "nodes": [
                {"kind": "shape", "id": "x", "at": {"x": 0, "y": 0}, "size": {"width": 1, "height": 1}},
                {"kind": "shape", "id": "x", "at": {"x": 5, "y": 5}, "size": {"width": 1, "height": 1}}
            ]
        }"#;
        let scene = parse_scene(doc).unwrap();
        let report = generate_diagnostic_report(&scene);
        assert_eq!(report.scene_id, "broken");
        assert!(report.diagnostics.is_empty());
        assert!(report.suggestions.is_empty());
        assert_eq!(report.summary.errors, 0);
    }

    #[test]
    fn report_serializes_machine_shape() {
        let scene = overflow_scene("loose");
        let report = generate_diagnostic_report(&scene);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"sceneId\":\"qa\""));
        assert!(json.contains("\"totalNodes\""));
        assert!(json.contains("\"boundariesProcessed\""));
        assert!(json.contains("\"OUT_OF_BOUNDS\""));
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"type\":\"MOVE_NODE\""));
        assert!(json.contains("\"confidence\":\"high\""));
    }
}
