#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod containment;
pub mod diagnostics;
pub mod enforce;
pub mod error;
pub mod geometry;
pub mod render;
pub mod scene;
pub mod text_metrics;
pub mod theme;
pub mod timeline;

pub use config::{Config, RenderConfig, load_config};
pub use containment::{
    ClipDefinition, ContainmentKind, ContainmentRequirements, collect_containment_requirements,
    generate_clip_path, needs_containment,
};
pub use diagnostics::{
    Confidence, Report, Suggestion, generate_auto_fix_suggestions, generate_diagnostic_report,
    write_report,
};
pub use enforce::{
    Diagnostic, DiagnosticCode, EnforcementResult, Severity, Summary, enforce_boundaries,
};
pub use error::{SceneError, SceneResult};
pub use geometry::{Rect, clamp_to, contains, snap};
#[cfg(feature = "png")]
pub use render::write_output_png;
pub use render::{RenderOutput, render_scene, render_svg, write_output_svg};
pub use scene::{BoundaryPolicy, Node, Overflow, PolicyMode, Scene, parse_scene};
pub use theme::Theme;
pub use timeline::{shift_timeline, stagger_flow_timings};

#[cfg(feature = "cli")]
pub use cli::run;
