//! Detection geometry in pixel coordinates.
//!
//! A detection is either an axis-aligned [`Rect`] or an arbitrary simple
//! [`Polygon`]. Rect/rect overlaps are computed directly; anything involving a
//! polygon goes through `geo` boolean operations.

use geo::{Area, BooleanOps, Intersects, Line, LineString};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

pub const MIN_POLYGON_VERTICES: usize = 3;
pub const MAX_POLYGON_VERTICES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned box, `min` inclusive, `max` exclusive in pixel terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Rect {
    /// Builds a rect from two opposite corners in any order.
    pub fn from_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x_min: x1.min(x2),
            y_min: y1.min(y2),
            x_max: x1.max(x2),
            y_max: y1.max(y2),
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x_min: self.x_min + dx,
            y_min: self.y_min + dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    /// Overlapping region, or `None` when the rects only touch or are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x_min.max(other.x_min);
        let y_min = self.y_min.max(other.y_min);
        let x_max = self.x_max.min(other.x_max);
        let y_max = self.y_max.min(other.y_max);

        if x_min >= x_max || y_min >= y_max {
            return None;
        }

        Some(Rect {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Corners clockwise from the top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x_min, self.y_min),
            Point::new(self.x_max, self.y_min),
            Point::new(self.x_max, self.y_max),
            Point::new(self.x_min, self.y_max),
        ]
    }
}

/// Simple polygon given by its vertices; the ring is implicitly closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Shoelace area. Zero for fewer than three vertices.
    pub fn area(&self) -> f32 {
        if self.points.len() < MIN_POLYGON_VERTICES {
            return 0.0;
        }

        let n = self.points.len();
        let mut twice_area = 0.0f64;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            twice_area += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
        }
        (twice_area.abs() / 2.0) as f32
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.points.iter().map(|p| p.translate(dx, dy)).collect())
    }

    /// First pair of non-adjacent edges that touch or cross, if any.
    ///
    /// The shoelace area is only meaningful for simple rings.
    fn crossing_edges(&self) -> Option<(usize, usize)> {
        let n = self.points.len();
        let edge = |i: usize| {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            Line::new((a.x as f64, a.y as f64), (b.x as f64, b.y as f64))
        };

        for i in 0..n {
            let first = edge(i);
            for j in i + 2..n {
                // edges n-1 and 0 share a vertex
                if i == 0 && j == n - 1 {
                    continue;
                }
                if first.intersects(&edge(j)) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Tightest axis-aligned rect around the vertices.
    pub fn bounds(&self) -> Rect {
        let mut bounds = Rect {
            x_min: f32::INFINITY,
            y_min: f32::INFINITY,
            x_max: f32::NEG_INFINITY,
            y_max: f32::NEG_INFINITY,
        };
        for p in &self.points {
            bounds.x_min = bounds.x_min.min(p.x);
            bounds.y_min = bounds.y_min.min(p.y);
            bounds.x_max = bounds.x_max.max(p.x);
            bounds.y_max = bounds.y_max.max(p.y);
        }
        bounds
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Rect(Rect),
    Polygon(Polygon),
}

impl Geometry {
    pub fn area(&self) -> f32 {
        match self {
            Geometry::Rect(rect) => rect.area(),
            Geometry::Polygon(polygon) => polygon.area(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Geometry::Rect(rect) => *rect,
            Geometry::Polygon(polygon) => polygon.bounds(),
        }
    }

    /// Shifts every coordinate, keeping the variant.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        match self {
            Geometry::Rect(rect) => Geometry::Rect(rect.translate(dx, dy)),
            Geometry::Polygon(polygon) => Geometry::Polygon(polygon.translate(dx, dy)),
        }
    }

    /// Rejects geometry that cannot take part in overlap computations.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Geometry::Rect(rect) => {
                let coords = [rect.x_min, rect.y_min, rect.x_max, rect.y_max];
                if coords.iter().any(|c| !c.is_finite()) {
                    return Err(GeometryError::NonFinite);
                }
            }
            Geometry::Polygon(polygon) => {
                let count = polygon.points.len();
                if !(MIN_POLYGON_VERTICES..=MAX_POLYGON_VERTICES).contains(&count) {
                    return Err(GeometryError::VertexCount {
                        count,
                        min: MIN_POLYGON_VERTICES,
                        max: MAX_POLYGON_VERTICES,
                    });
                }
                if polygon
                    .points
                    .iter()
                    .any(|p| !p.x.is_finite() || !p.y.is_finite())
                {
                    return Err(GeometryError::NonFinite);
                }
                if let Some((first, second)) = polygon.crossing_edges() {
                    return Err(GeometryError::SelfIntersecting { first, second });
                }
            }
        }

        if self.area() <= 0.0 {
            return Err(GeometryError::ZeroArea);
        }
        Ok(())
    }

    /// Shared area together with the intersection-over-area it implies.
    ///
    /// The intersection is computed once, so callers that need both values
    /// should prefer this over [`Geometry::intersection_area`] plus
    /// [`Geometry::ioa`].
    pub fn overlap(&self, other: &Geometry) -> (f32, f32) {
        let shared = self.intersection_area(other);
        let smaller = self.area().min(other.area());
        if shared <= 0.0 || smaller <= 0.0 {
            return (shared.max(0.0), 0.0);
        }
        (shared, (shared / smaller).min(1.0))
    }

    /// Area shared by the two geometries.
    pub fn intersection_area(&self, other: &Geometry) -> f32 {
        let Some(overlap) = self.bounds().intersection(&other.bounds()) else {
            return 0.0;
        };

        match (self, other) {
            (Geometry::Rect(_), Geometry::Rect(_)) => overlap.area(),
            _ => {
                let shared = self.to_geo().intersection(&other.to_geo());
                shared.unsigned_area() as f32
            }
        }
    }

    /// Intersection over the area of the smaller of the two geometries.
    ///
    /// A fragment cut off at a tile edge is (nearly) contained in the full
    /// observation from the neighbouring tile, so this stays close to 1 where
    /// IoU would drop with the size ratio.
    pub fn ioa(&self, other: &Geometry) -> f32 {
        self.overlap(other).1
    }

    fn to_geo(&self) -> geo::Polygon<f64> {
        let ring: Vec<(f64, f64)> = match self {
            Geometry::Rect(rect) => rect
                .corners()
                .iter()
                .map(|p| (p.x as f64, p.y as f64))
                .collect(),
            Geometry::Polygon(polygon) => polygon
                .points
                .iter()
                .map(|p| (p.x as f64, p.y as f64))
                .collect(),
        };
        geo::Polygon::new(LineString::from(ring), vec![])
    }
}
