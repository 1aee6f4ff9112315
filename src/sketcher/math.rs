//! Small plane-geometry helpers shared by the layout passes.

use super::point::PointF;

/// Which side of the directed line through `line_p1` and `line_p2` a point lies on.
///
/// Positive is left, negative is right, zero is on the line.
pub fn side_of_line(p: PointF, line_p1: PointF, line_p2: PointF) -> f32 {
    (line_p2 - line_p1).cross(p - line_p1)
}
pub fn project_on_line(p: PointF, sp1: PointF, sp2: PointF) -> PointF {
    let l1 = p - sp1;
    let l3 = sp2 - sp1;
    let sl2 = l3.sq_length().max(f32::EPSILON);
    let t = l1.dot(l3) / sl2;
    sp1 + l3 * t
}
/// Squared distance from `p` to the segment, and the clamped segment parameter of the
/// closest point.
pub fn sq_dist_point_segment(p: PointF, sp1: PointF, sp2: PointF) -> (f32, f32) {
    let l1 = p - sp1;
    let l3 = sp2 - sp1;
    let sl2 = l3.sq_length().max(f32::EPSILON);
    let t = (l1.dot(l3) / sl2).clamp(0.0, 1.0);
    let proj = sp1 + l3 * t;
    ((p - proj).sq_length(), t)
}
/// Reflect `p` across the line through `sp1` and `sp2`.
pub fn mirror_point(p: PointF, sp1: PointF, sp2: PointF) -> PointF {
    let proj = project_on_line(p, sp1, sp2);
    proj * 2.0 - p
}
/// Rotation angle that best maps the `from` vectors onto the `to` vectors (least squares).
pub fn best_fit_rotation(from: &[PointF], to: &[PointF]) -> f32 {
    let (cross, dot) = from
        .iter()
        .zip(to)
        .fold((0.0, 0.0), |(c, d), (&f, &t)| (c + f.cross(t), d + f.dot(t)));
    if cross.abs() < f32::EPSILON && dot.abs() < f32::EPSILON {
        0.0
    } else {
        cross.atan2(dot)
    }
}
pub fn centroid(points: impl IntoIterator<Item = PointF>) -> PointF {
    let mut count = 0;
    let sum: PointF = points
        .into_iter()
        .inspect(|_| count += 1)
        .sum();
    if count == 0 {
        sum
    } else {
        sum / count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_across_diagonal() {
        let p = mirror_point(PointF(1.0, 0.0), PointF(0.0, 0.0), PointF(1.0, 1.0));
        assert!((p.0 - 0.0).abs() < 1e-6);
        assert!((p.1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn segment_distance_clamps() {
        let (d2, t) = sq_dist_point_segment(PointF(3.0, 0.0), PointF(0.0, 0.0), PointF(1.0, 0.0));
        assert!((d2 - 4.0).abs() < 1e-5);
        assert_eq!(t, 1.0);
    }

    #[test]
    fn fitted_rotation_recovers_angle() {
        let from = [PointF(1.0, 0.0), PointF(-1.0, 0.0), PointF(0.0, 2.0)];
        let to: Vec<_> = from
            .iter()
            .map(|p| p.rotated_around(PointF::ORIGIN, 0.7))
            .collect();
        assert!((best_fit_rotation(&from, &to) - 0.7).abs() < 1e-4);
    }
}
