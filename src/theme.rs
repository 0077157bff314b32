use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub title_font_size: f32,
    pub background: String,
    pub boundary_fill: String,
    pub boundary_border: String,
    pub boundary_title_color: String,
    pub shape_fill: String,
    pub shape_border: String,
    pub text_color: String,
    pub connector_color: String,
    pub connector_label_background: String,
    pub flow_color: String,
    pub port_fill: String,
    pub port_border: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            title_font_size: 14.0,
            background: "#FFFFFF".to_string(),
            boundary_fill: "#F7FAFF".to_string(),
            boundary_border: "#C7D2E5".to_string(),
            boundary_title_color: "#1C2430".to_string(),
            shape_fill: "#F8FAFF".to_string(),
            shape_border: "#C7D2E5".to_string(),
            text_color: "#1C2430".to_string(),
            connector_color: "#7A8AA6".to_string(),
            connector_label_background: "#FFFFFF".to_string(),
            flow_color: "#4C7DFF".to_string(),
            port_fill: "#FFFFFF".to_string(),
            port_border: "#7A8AA6".to_string(),
        }
    }

    pub fn midnight() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            title_font_size: 14.0,
            background: "#0E1420".to_string(),
            boundary_fill: "#16202F".to_string(),
            boundary_border: "#31415C".to_string(),
            boundary_title_color: "#D8E2F4".to_string(),
            shape_fill: "#1B2738".to_string(),
            shape_border: "#3A4D6E".to_string(),
            text_color: "#D8E2F4".to_string(),
            connector_color: "#6C7FA3".to_string(),
            connector_label_background: "#16202F".to_string(),
            flow_color: "#6FA8FF".to_string(),
            port_fill: "#0E1420".to_string(),
            port_border: "#6C7FA3".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
