use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static MEASURER: Lazy<Mutex<Measurer>> = Lazy::new(|| Mutex::new(Measurer::new()));

/// Measures the advance width of `text` using a system font matching
/// `font_family`. Returns `None` when no usable face resolves (headless
/// containers without fonts); callers fall back to
/// [`estimate_text_width`].
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

/// Width estimate from font size alone; also the per-glyph fallback for
/// characters the resolved face does not cover.
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().filter(|ch| *ch != '\n').count() as f32 * font_size * 0.56
}

struct Measurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<StoredFace>>,
}

struct StoredFace {
    data: Vec<u8>,
    index: u32,
}

impl Measurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_string();
        if !self.faces.contains_key(&key) {
            let stored = self.resolve(font_family);
            self.faces.insert(key.clone(), stored);
        }
        let stored = self.faces.get(&key)?.as_ref()?;
        let face = Face::parse(&stored.data, stored.index).ok()?;
        let scale = font_size / face.units_per_em().max(1) as f32;
        let fallback = font_size * 0.56;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            match face
                .glyph_index(ch)
                .and_then(|id| face.glyph_hor_advance(id))
            {
                Some(advance) => width += advance as f32 * scale,
                None => width += fallback,
            }
        }
        Some(width.max(0.0))
    }

    fn resolve(&mut self, font_family: &str) -> Option<StoredFace> {
        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = Vec::with_capacity(names.len() + 1);
        for name in &names {
            match name.to_ascii_lowercase().as_str() {
                "serif" => families.push(Family::Serif),
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    families.push(Family::SansSerif)
                }
                "monospace" | "ui-monospace" => families.push(Family::Monospace),
                "cursive" => families.push(Family::Cursive),
                "fantasy" => families.push(Family::Fantasy),
                _ => families.push(Family::Name(name.as_str())),
            }
        }
        families.push(Family::SansSerif);

        let id = self.db.query(&Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        })?;
        let mut stored = None;
        self.db.with_face_data(id, |data, index| {
            stored = Some(StoredFace {
                data: data.to_vec(),
                index,
            });
        });
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_measures_zero() {
        assert_eq!(measure_text_width("", 13.0, "sans-serif"), Some(0.0));
    }

    #[test]
    fn estimate_scales_with_length_and_size() {
        let short = estimate_text_width("ab", 10.0);
        let long = estimate_text_width("abcd", 10.0);
        assert!(long > short);
        assert_eq!(estimate_text_width("ab", 20.0), short * 2.0);
    }

    #[test]
    fn newlines_are_ignored_in_estimates() {
        assert_eq!(
            estimate_text_width("ab\ncd", 10.0),
            estimate_text_width("abcd", 10.0)
        );
    }
}
