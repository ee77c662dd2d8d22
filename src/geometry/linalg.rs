//! Row-wise vector helpers over body batches

use crate::simulation::states::NVec3;

/// Unit vector along `v`, the zero vector stays zero
pub fn normalize_or_zero(v: &NVec3) -> NVec3 {
    v.try_normalize(0.0).unwrap_or_else(NVec3::zeros)
}

/// Normalize every row, zero rows stay zero
pub fn normalize(vectors: &[NVec3]) -> Vec<NVec3> {
    vectors.iter().map(normalize_or_zero).collect()
}

/// Projection of `a` onto `b`: (a . b) b, `b` expected unit length
pub fn project(a: &NVec3, b: &NVec3) -> NVec3 {
    b * a.dot(b)
}

/// Replace `±inf` components with 0
pub fn clear_infinite(v: &NVec3) -> NVec3 {
    v.map(|c| if c.is_infinite() { 0.0 } else { c })
}
