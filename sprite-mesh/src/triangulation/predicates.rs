//! Geometric predicates in double precision

use glam::DVec2;

/// Twice the signed area of `(a, b, c)`; positive when counter-clockwise.
#[inline]
pub(crate) fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Signed distance of `p` from the line `a -> b` (positive on the left).
#[inline]
pub(crate) fn line_distance(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    let len = a.distance(b);
    if len == 0.0 {
        return a.distance(p);
    }
    orient(a, b, p) / len
}

/// Positive when `d` lies strictly inside the circumcircle of CCW `(a, b, c)`.
pub(crate) fn incircle(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> f64 {
    let ad = a - d;
    let bd = b - d;
    let cd = c - d;
    let alift = ad.length_squared();
    let blift = bd.length_squared();
    let clift = cd.length_squared();
    alift * bd.perp_dot(cd) + blift * cd.perp_dot(ad) + clift * ad.perp_dot(bd)
}

/// Circumcenter of `(a, b, c)`, `None` for collinear points.
pub(crate) fn circumcenter(a: DVec2, b: DVec2, c: DVec2) -> Option<DVec2> {
    let ab = b - a;
    let ac = c - a;
    let d = 2.0 * ab.perp_dot(ac);
    if d.abs() <= f64::EPSILON * ab.length_squared().max(ac.length_squared()) {
        return None;
    }
    let ab2 = ab.length_squared();
    let ac2 = ac.length_squared();
    let offset = DVec2::new(ac.y * ab2 - ab.y * ac2, ab.x * ac2 - ac.x * ab2) / d;
    Some(a + offset)
}

/// Interior angles (radians) of triangle `(a, b, c)` at `a`, `b`, `c`.
pub(crate) fn angles(a: DVec2, b: DVec2, c: DVec2) -> [f64; 3] {
    let angle = |p: DVec2, q: DVec2, r: DVec2| {
        let u = q - p;
        let v = r - p;
        u.perp_dot(v).abs().atan2(u.dot(v))
    };
    [angle(a, b, c), angle(b, c, a), angle(c, a, b)]
}

/// Whether `p` lies strictly inside the diametral circle of segment `a`-`b`.
#[inline]
pub(crate) fn in_diametral_circle(a: DVec2, b: DVec2, p: DVec2) -> bool {
    (a - p).dot(b - p) < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orient_and_incircle_signs() {
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(1.0, 0.0);
        let c = DVec2::new(0.0, 1.0);
        assert!(orient(a, b, c) > 0.0);
        assert!(orient(a, c, b) < 0.0);
        assert!(incircle(a, b, c, DVec2::new(0.5, 0.5)) > 0.0);
        assert!(incircle(a, b, c, DVec2::new(2.0, 2.0)) < 0.0);
    }

    #[test]
    fn test_circumcenter_right_triangle() {
        let center = circumcenter(
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(0.0, 2.0),
        )
        .unwrap();
        assert!((center - DVec2::new(1.0, 1.0)).length() < 1e-12);
        assert!(circumcenter(DVec2::ZERO, DVec2::X, DVec2::X * 2.0).is_none());
    }

    #[test]
    fn test_angles_sum_to_pi() {
        let sum: f64 = angles(
            DVec2::new(0.0, 0.0),
            DVec2::new(3.0, 0.0),
            DVec2::new(1.0, 2.0),
        )
        .iter()
        .sum();
        assert!((sum - std::f64::consts::PI).abs() < 1e-12);
    }
}
