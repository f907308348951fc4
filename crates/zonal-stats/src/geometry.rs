//! Planar geometry for labelled features.

use grid_processor::BoundingBox;

/// Polygon rings or a single point, in raster coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Outer and inner rings of one or more parts; holes follow the
    /// even-odd rule.
    Polygon(Vec<Vec<(f64, f64)>>),
    Point(f64, f64),
}

impl Geometry {
    /// Smallest box containing every vertex.
    pub fn bounds(&self) -> Option<BoundingBox> {
        match self {
            Self::Polygon(rings) => BoundingBox::from_points(rings.iter().flatten().copied()),
            Self::Point(x, y) => Some(BoundingBox::new(*x, *y, *x, *y)),
        }
    }

    /// Even-odd point-in-polygon test. Points never contain anything.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let Self::Polygon(rings) = self else {
            return false;
        };

        let mut inside = false;
        for ring in rings {
            if ring.len() < 3 {
                continue;
            }
            let mut j = ring.len() - 1;
            for i in 0..ring.len() {
                let (xi, yi) = ring[i];
                let (xj, yj) = ring[j];
                if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                    inside = !inside;
                }
                j = i;
            }
        }
        inside
    }

    /// Whether any vertex falls inside the box.
    pub fn has_vertex_in(&self, bbox: &BoundingBox) -> bool {
        match self {
            Self::Polygon(rings) => rings.iter().flatten().any(|&(x, y)| bbox.contains(x, y)),
            Self::Point(x, y) => bbox.contains(*x, *y),
        }
    }
}

/// A geometry with its output label.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub label: String,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(label: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            label: label.into(),
            geometry,
        }
    }
}
