use serde::{Deserialize, Serialize};

/// A point on the canvas, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Element dimensions. Wire keys are the short `w`/`h` used by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

impl Size {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }
}

impl Default for Size {
    /// Default class footprint used by the palette when dropping a new class.
    fn default() -> Self {
        Self { w: 180.0, h: 110.0 }
    }
}
