use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (x + width).
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (y + height).
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns a copy with x/y rounded to the nearest multiple of `grid`.
    /// Width and height are taken as declared.
    pub fn snapped(&self, grid: f32) -> Self {
        Self {
            x: snap(self.x, grid),
            y: snap(self.y, grid),
            width: self.width,
            height: self.height,
        }
    }
}

/// Rounds `value` to the nearest multiple of `grid`.
///
/// A zero or negative grid means "no snapping" and returns the value
/// unchanged. Ties round half-up (`snap(15.0, 4.0) == 16.0`), matching
/// arithmetic rounding rather than truncation.
pub fn snap(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// Repositions `child` so it fits inside `container` without resizing it.
///
/// Each axis is adjusted by the minimum amount needed: the right/bottom edge
/// is pulled back inside the container, then the left/top edge is pushed
/// forward if it fell short. A child larger than the container on some axis
/// ends up at the container's origin on that axis and still overflows;
/// clamping corrects position, never size.
pub fn clamp_to(container: &Rect, child: &Rect) -> Rect {
    let x = if child.width > container.width {
        container.x
    } else {
        child.x.min(container.right() - child.width).max(container.x)
    };
    let y = if child.height > container.height {
        container.y
    } else {
        child.y.min(container.bottom() - child.height).max(container.y)
    };
    Rect {
        x,
        y,
        width: child.width,
        height: child.height,
    }
}

/// True iff `candidate` lies within `container` expanded outward by
/// `tolerance` pixels on every side.
pub fn contains(container: &Rect, candidate: &Rect, tolerance: f32) -> bool {
    candidate.x >= container.x - tolerance
        && candidate.y >= container.y - tolerance
        && candidate.right() <= container.right() + tolerance
        && candidate.bottom() <= container.bottom() + tolerance
}
