use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static BEGIN_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"begin="(-?[0-9]+(?:\.[0-9]+)?)s""#).expect("begin pattern"));

/// Rewrites every `begin="…s"` attribute so successive animations start
/// `step` seconds apart, in document order. Emitted flows all start at 0s;
/// this pass turns them into a staggered timeline.
pub fn stagger_flow_timings(svg: &str, step: f32) -> String {
    let mut index = 0usize;
    BEGIN_ATTR
        .replace_all(svg, |_caps: &Captures<'_>| {
            let begin = index as f32 * step.max(0.0);
            index += 1;
            format!("begin=\"{begin:.2}s\"")
        })
        .into_owned()
}

/// Adds `offset` seconds to every `begin="…s"` attribute, clamping at zero.
pub fn shift_timeline(svg: &str, offset: f32) -> String {
    BEGIN_ATTR
        .replace_all(svg, |caps: &Captures<'_>| {
            let value: f32 = caps[1].parse().unwrap_or(0.0);
            format!("begin=\"{:.2}s\"", (value + offset).max(0.0))
        })
        .into_owned()
}
