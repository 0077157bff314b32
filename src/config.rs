use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Paint-pass knobs. These shape the emitted markup only; enforcement
/// semantics (policies, tolerances, snap grids) live on the scene itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Raster size for PNG export.
    pub width: f32,
    pub height: f32,
    pub boundary_corner_radius: f32,
    pub boundary_stroke_width: f32,
    pub boundary_title_inset_x: f32,
    pub boundary_title_inset_y: f32,
    pub shape_corner_radius: f32,
    pub shape_stroke_width: f32,
    pub connector_stroke_width: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
    pub label_line_height: f32,
    pub flow_dot_radius: f32,
    /// Seconds between successive flow animation starts.
    pub flow_stagger_step: f32,
    /// Blur radius for soft mask edges (overflow: mask).
    pub mask_edge_blur: f32,
    pub port_radius: f32,
    /// Skip font queries and estimate label widths from font size alone.
    pub fast_text_metrics: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            boundary_corner_radius: 10.0,
            boundary_stroke_width: 1.2,
            boundary_title_inset_x: 12.0,
            boundary_title_inset_y: 20.0,
            shape_corner_radius: 6.0,
            shape_stroke_width: 1.4,
            connector_stroke_width: 1.4,
            label_padding_x: 6.0,
            label_padding_y: 4.0,
            label_line_height: 1.2,
            flow_dot_radius: 4.0,
            flow_stagger_step: 0.6,
            mask_edge_blur: 3.0,
            port_radius: 3.5,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: Theme,
    pub render: RenderConfig,
}

/// Loads a JSON5 config file merged over defaults; `None` yields defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let config: Config = json5::from_str(&content)?;
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = json5::from_str(
            r#"{
                // only override the stagger
                render: { flow_stagger_step: 1.5 },
            }"#,
        )
        .unwrap();
        assert_eq!(config.render.flow_stagger_step, 1.5);
        assert_eq!(config.render.boundary_corner_radius, 10.0);
        assert_eq!(config.theme.background, Theme::light().background);
    }
}
