//! Point-to-segment distance with a bounded extension tolerance.
//!
//! A damper is matched against a duct by dropping a perpendicular onto each
//! segment of the duct's polyline. The projection parameter `t` tells where
//! the foot lands: `t = 0` at the segment start, `t = 1` at its end.
//!
//! ```text
//!        extension         segment          extension
//!   |<--- E --->|<==================>|<--- E --->|
//!  t=-E/L      t=0                  t=1       t=1+E/L
//! ```
//!
//! The extension `E` is an absolute distance, so it is converted into a
//! fraction of the segment length `L`; short segments get proportionally
//! more slack than long ones.

use crate::domain::model::{Duct, Intersection, Point, Segment};

/// Result of measuring a point against one segment (or one polyline).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDistance {
    pub distance: f64,
    pub intersection: Intersection,
    /// Closest point used for `distance`: the perpendicular foot for
    /// `Actual`/`Extended`, the nearer endpoint for `None`.
    pub foot: Point,
}

/// Perpendicular distance from `point` to `segment`, classified by where the
/// foot of the perpendicular lands.
///
/// For `Intersection::None` the returned distance is the distance to the
/// nearer endpoint and carries no association meaning.
pub fn distance_to_segment(point: Point, segment: Segment, extension_distance: f64) -> SegmentDistance {
    let Segment { start, end } = segment;
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    // 線段退化為單點
    if length_sq == 0.0 {
        return SegmentDistance {
            distance: point.distance_to(&start),
            intersection: Intersection::Actual,
            foot: start,
        };
    }

    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq;
    let extension_ratio = extension_distance / length_sq.sqrt();

    let intersection = if (0.0..=1.0).contains(&t) {
        Intersection::Actual
    } else if (-extension_ratio..=1.0 + extension_ratio).contains(&t) {
        Intersection::Extended
    } else {
        Intersection::None
    };

    match intersection {
        Intersection::Actual | Intersection::Extended => {
            let foot = Point::new(start.x + t * dx, start.y + t * dy);
            SegmentDistance {
                distance: point.distance_to(&foot),
                intersection,
                foot,
            }
        }
        Intersection::None => {
            let to_start = point.distance_to(&start);
            let to_end = point.distance_to(&end);
            let (distance, foot) = if to_start <= to_end {
                (to_start, start)
            } else {
                (to_end, end)
            };
            SegmentDistance {
                distance,
                intersection,
                foot,
            }
        }
    }
}

/// Duct-level distance: the closest segment among those the point actually
/// intersects (or intersects once extended).
///
/// Segments classified `None` are ignored. Ties keep the earlier segment.
/// Returns `None` when no segment qualifies.
pub fn distance_to_duct(point: Point, duct: &Duct, extension_distance: f64) -> Option<SegmentDistance> {
    let mut best: Option<SegmentDistance> = None;

    for segment in duct.segments() {
        let measured = distance_to_segment(point, segment, extension_distance);
        if measured.intersection == Intersection::None {
            continue;
        }
        if best.map_or(true, |b| measured.distance < b.distance) {
            best = Some(measured);
        }
    }

    best
}
