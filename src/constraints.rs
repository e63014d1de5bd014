//! Acceptance checks for candidate viewpoints.
//!
//! Pure functions over boxes and positions; the search loop and the
//! assembler decide what to do with the answers.

use crate::types::{xz_distance, BoundingBox, Vec3};

/// True if the box is fully defined and its area lies strictly inside
/// (`min`, `max`).
pub fn accepts_target_size(bbox: &BoundingBox, min: f64, max: f64) -> bool {
    if !bbox.is_defined() {
        return false;
    }
    let area = bbox.area();
    min < area && area < max
}

/// True if `candidate` is at least `min_dist` away, in the x-z plane, from
/// every position in `existing`. Vacuously true for an empty set.
pub fn far_enough(candidate: &Vec3, existing: &[Vec3], min_dist: f64) -> bool {
    existing.iter().all(|p| xz_distance(candidate, p) >= min_dist)
}

/// True if every tracked target and receptacle box is smaller than `cap`.
/// Undefined boxes fail; an empty channel sees nothing and passes.
pub fn below_salience_cap(targets: &[BoundingBox], receptacles: &[BoundingBox], cap: f64) -> bool {
    targets
        .iter()
        .chain(receptacles)
        .all(|b| b.is_defined() && b.area() < cap)
}
