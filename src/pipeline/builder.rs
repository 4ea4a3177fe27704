//! Builder for creating Detection objects from connected-component statistics.

use nalgebra::Vector2;

use crate::tracker::{Detection, Rect};

/// Builder for creating `Detection` objects from various input formats.
///
/// The centroid defaults to the centre of the bounding box when not set.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    label_id: u32,
    bbox: Rect,
    centroid: Option<Vector2<f32>>,
    area: Option<u32>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label_id: u32) -> Self {
        self.label_id = label_id;
        self
    }

    /// Set bounding box in TLWH format, as reported by connected-component stats.
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(x, y, w, h);
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set the mass centroid, which may differ from the box centre.
    pub fn centroid(mut self, x: f32, y: f32) -> Self {
        self.centroid = Some(Vector2::new(x, y));
        self
    }

    /// Offset everything by a region origin, for detectors working on a crop.
    pub fn offset(mut self, dx: f32, dy: f32) -> Self {
        self.bbox.x += dx;
        self.bbox.y += dy;
        if let Some(c) = self.centroid.as_mut() {
            c.x += dx;
            c.y += dy;
        }
        self
    }

    /// Set the pixel area. Defaults to the bounding box area.
    pub fn area(mut self, area: u32) -> Self {
        self.area = Some(area);
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        let centroid = self.centroid.unwrap_or_else(|| self.bbox.center());
        let area = self.area.unwrap_or(self.bbox.area().max(0.0) as u32);
        Detection::new(self.label_id, centroid, self.bbox, area)
    }
}
