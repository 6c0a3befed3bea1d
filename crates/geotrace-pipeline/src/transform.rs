//! Point-correspondence transforms from image space to a reference space.
//!
//! Two models are supported:
//!
//! - **Projective** (homography): estimated from at least four pairs by a
//!   Hartley-normalized direct linear transform. Four pairs give an exact
//!   fit, more give the algebraic least-squares fit. An optional seeded
//!   RANSAC wrapper rejects outlying pairs first.
//! - **Affine**: determined exactly by the *first three* pairs. Any
//!   further pairs are ignored, not used for a best fit.
//!
//! Degenerate configurations (collinear points, rank-deficient systems,
//! singular matrices) are reported as
//! [`PipelineError::DegenerateTransform`] rather than producing a
//! meaningless matrix.

use nalgebra::{DMatrix, Matrix2x3, Matrix3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::types::{Contour, PipelineError, Point, PointPair};

/// Sine of the smallest angle at which three points still count as a
/// triangle.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Relative eigenvalue floor below which the DLT system is rank deficient.
const RANK_TOLERANCE: f64 = 1e-12;

/// Relative determinant floor below which a matrix is singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Homogeneous coordinate below which a projected point is at infinity.
const VANISHING_W: f64 = 1e-15;

// ── Model ────────────────────────────────────────────────────────────────

/// A fitted plane-to-plane mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// 3x3 homography, applied with perspective division.
    Projective(Matrix3<f64>),
    /// 2x3 affine matrix `[A | t]`.
    Affine(Matrix2x3<f64>),
}

impl Transform {
    /// Map one point.
    ///
    /// A projective transform whose homogeneous coordinate vanishes at
    /// `point` yields NaN coordinates.
    #[must_use]
    pub fn apply(&self, point: Point) -> Point {
        match self {
            Self::Projective(h) => {
                let p = h * Vector3::new(point.x, point.y, 1.0);
                if p[2].abs() < VANISHING_W {
                    return Point::new(f64::NAN, f64::NAN);
                }
                Point::new(p[0] / p[2], p[1] / p[2])
            }
            Self::Affine(m) => Point::new(
                m[(0, 2)] + m[(0, 0)].mul_add(point.x, m[(0, 1)] * point.y),
                m[(1, 2)] + m[(1, 0)].mul_add(point.x, m[(1, 1)] * point.y),
            ),
        }
    }

    /// Map every vertex of one contour.
    #[must_use = "returns the transformed contour"]
    pub fn apply_contour(&self, contour: &Contour) -> Contour {
        Contour::new(contour.points().iter().map(|&p| self.apply(p)).collect())
    }

    /// Map every vertex of every contour, preserving counts and order.
    #[must_use = "returns the transformed contours"]
    pub fn apply_contours(&self, contours: &[Contour]) -> Vec<Contour> {
        contours.iter().map(|c| self.apply_contour(c)).collect()
    }

    /// Matrix rows, for reporting.
    #[must_use]
    pub fn rows(&self) -> Vec<[f64; 3]> {
        match self {
            Self::Projective(h) => (0..3).map(|r| [h[(r, 0)], h[(r, 1)], h[(r, 2)]]).collect(),
            Self::Affine(m) => (0..2).map(|r| [m[(r, 0)], m[(r, 1)], m[(r, 2)]]).collect(),
        }
    }
}

/// Euclidean distance between each mapped source and its destination.
#[must_use]
pub fn reprojection_errors(transform: &Transform, pairs: &[PointPair]) -> Vec<f64> {
    pairs
        .iter()
        .map(|pair| transform.apply(pair.source).distance(pair.destination))
        .collect()
}

// ── Homography ───────────────────────────────────────────────────────────

/// RANSAC settings for homography fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Number of random 4-pair samples to try.
    pub max_iters: usize,
    /// Reprojection distance below which a pair is an inlier.
    pub inlier_threshold: f64,
    /// Fewest inliers accepted for a model.
    pub min_inliers: usize,
    /// RNG seed.
    pub seed: u64,
}

impl RansacConfig {
    pub const DEFAULT_MAX_ITERS: usize = 2000;
    pub const DEFAULT_INLIER_THRESHOLD: f64 = 3.0;
    pub const DEFAULT_MIN_INLIERS: usize = 4;
    pub const DEFAULT_SEED: u64 = 0;
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: Self::DEFAULT_MAX_ITERS,
            inlier_threshold: Self::DEFAULT_INLIER_THRESHOLD,
            min_inliers: Self::DEFAULT_MIN_INLIERS,
            seed: Self::DEFAULT_SEED,
        }
    }
}

/// How a homography is fitted to the correspondences.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum HomographyMethod {
    /// Use every pair (exact for four, least squares for more).
    #[default]
    LeastSquares,
    /// Fit on the RANSAC consensus set only.
    Ransac(RansacConfig),
}

/// Estimate the homography mapping each source point to its destination.
///
/// The result is scaled so `H[2][2] = 1` whenever that entry is not zero.
///
/// # Errors
///
/// - [`PipelineError::InsufficientCorrespondences`] with fewer than four
///   pairs (or, with RANSAC, fewer inliers than `min_inliers`).
/// - [`PipelineError::InvalidParameter`] if a coordinate is not finite.
/// - [`PipelineError::DegenerateTransform`] if all source points are
///   collinear, if exactly four pairs are given and any three source or
///   destination points are collinear, if the linear system is rank
///   deficient, or if the fitted matrix is singular.
pub fn estimate_homography(
    pairs: &[PointPair],
    method: HomographyMethod,
) -> Result<Matrix3<f64>, PipelineError> {
    match method {
        HomographyMethod::LeastSquares => homography_dlt(pairs),
        HomographyMethod::Ransac(config) => homography_ransac(pairs, &config),
    }
}

fn homography_dlt(pairs: &[PointPair]) -> Result<Matrix3<f64>, PipelineError> {
    let n = pairs.len();
    if n < 4 {
        return Err(PipelineError::InsufficientCorrespondences { needed: 4, got: n });
    }
    check_finite(pairs)?;

    let src: Vec<Point> = pairs.iter().map(|p| p.source).collect();
    let dst: Vec<Point> = pairs.iter().map(|p| p.destination).collect();

    if all_collinear(&src) {
        return Err(PipelineError::DegenerateTransform(
            "all source points are collinear".into(),
        ));
    }
    if n == 4 {
        if any_three_collinear(&src) {
            return Err(PipelineError::DegenerateTransform(
                "three of the four source points are collinear".into(),
            ));
        }
        if any_three_collinear(&dst) {
            return Err(PipelineError::DegenerateTransform(
                "three of the four destination points are collinear".into(),
            ));
        }
    }

    let (t_src, src_n) = normalize_points(&src);
    let (t_dst, dst_n) = normalize_points(&dst);

    // Two rows per pair of the 2n x 9 system A h = 0.
    let mut a = DMatrix::zeros(2 * n, 9);
    for (i, (s, d)) in src_n.iter().zip(&dst_n).enumerate() {
        a[(2 * i, 3)] = -s.x;
        a[(2 * i, 4)] = -s.y;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = d.y * s.x;
        a[(2 * i, 7)] = d.y * s.y;
        a[(2 * i, 8)] = d.y;

        a[(2 * i + 1, 0)] = s.x;
        a[(2 * i + 1, 1)] = s.y;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -d.x * s.x;
        a[(2 * i + 1, 7)] = -d.x * s.y;
        a[(2 * i + 1, 8)] = -d.x;
    }

    // h is the eigenvector of AᵀA with the smallest eigenvalue.
    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);
    let mut order: Vec<usize> = (0..9).collect();
    order.sort_by(|&i, &j| eig.eigenvalues[i].abs().total_cmp(&eig.eigenvalues[j].abs()));

    let largest = eig.eigenvalues[order[8]].abs();
    let second = eig.eigenvalues[order[1]].abs();
    if largest <= 0.0 || second <= RANK_TOLERANCE * largest {
        return Err(PipelineError::DegenerateTransform(
            "correspondences do not determine a unique homography".into(),
        ));
    }

    let col = eig.eigenvectors.column(order[0]);
    let h_norm = Matrix3::new(
        col[0], col[1], col[2], col[3], col[4], col[5], col[6], col[7], col[8],
    );

    let t_dst_inv = t_dst.try_inverse().ok_or_else(|| {
        PipelineError::DegenerateTransform("destination normalization is not invertible".into())
    })?;
    let h = t_dst_inv * h_norm * t_src;

    let norm = h.norm();
    if h.determinant().abs() <= SINGULAR_TOLERANCE * norm.powi(3) {
        return Err(PipelineError::DegenerateTransform(
            "fitted homography is singular".into(),
        ));
    }

    let scale = h[(2, 2)];
    if scale.abs() <= f64::EPSILON * norm {
        Ok(h / norm)
    } else {
        Ok(h / scale)
    }
}

fn homography_ransac(
    pairs: &[PointPair],
    config: &RansacConfig,
) -> Result<Matrix3<f64>, PipelineError> {
    let n = pairs.len();
    if n < 4 {
        return Err(PipelineError::InsufficientCorrespondences { needed: 4, got: n });
    }
    check_finite(pairs)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;

    for _ in 0..config.max_iters {
        let sample: Vec<PointPair> = rand::seq::index::sample(&mut rng, n, 4)
            .into_iter()
            .map(|i| pairs[i])
            .collect();
        let Ok(h) = homography_dlt(&sample) else {
            continue;
        };

        let errors = reprojection_errors(&Transform::Projective(h), pairs);
        let inliers: Vec<bool> = errors
            .iter()
            .map(|e| *e < config.inlier_threshold)
            .collect();
        let count = inliers.iter().filter(|&&b| b).count();

        if best.as_ref().is_none_or(|(_, _, c)| count > *c) {
            best = Some((h, inliers, count));
            if count == n {
                break;
            }
        }
    }

    let found = best.as_ref().map_or(0, |(_, _, c)| *c);
    let Some((best_h, inliers, count)) = best.filter(|(_, _, c)| *c >= config.min_inliers.max(4))
    else {
        return Err(PipelineError::InsufficientCorrespondences {
            needed: config.min_inliers.max(4),
            got: found,
        });
    };

    let consensus: Vec<PointPair> = pairs
        .iter()
        .zip(&inliers)
        .filter(|(_, keep)| **keep)
        .map(|(p, _)| *p)
        .collect();
    debug_assert_eq!(consensus.len(), count);

    // A consensus set can be degenerate as a whole even when the winning
    // sample was not; fall back to the sample fit then.
    Ok(homography_dlt(&consensus).unwrap_or(best_h))
}

/// Translate the centroid to the origin and scale the mean distance from
/// it to sqrt(2).
#[allow(clippy::cast_precision_loss)]
fn normalize_points(points: &[Point]) -> (Matrix3<f64>, Vec<Point>) {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let centroid = Point::new(cx, cy);
    let mean_dist = points.iter().map(|p| p.distance(centroid)).sum::<f64>() / n;

    let s = if mean_dist > VANISHING_W {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| Point::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    (t, normalized)
}

// ── Affine ───────────────────────────────────────────────────────────────

/// Solve the affine map sending the first three sources to their
/// destinations.
///
/// Pairs beyond the third are ignored entirely.
///
/// # Errors
///
/// - [`PipelineError::InsufficientCorrespondences`] with fewer than three
///   pairs.
/// - [`PipelineError::InvalidParameter`] if a used coordinate is not finite.
/// - [`PipelineError::DegenerateTransform`] if the three sources are
///   collinear.
pub fn estimate_affine(pairs: &[PointPair]) -> Result<Matrix2x3<f64>, PipelineError> {
    let [p0, p1, p2] = match pairs {
        [a, b, c, ..] => [*a, *b, *c],
        _ => {
            return Err(PipelineError::InsufficientCorrespondences {
                needed: 3,
                got: pairs.len(),
            });
        }
    };
    let used = [p0, p1, p2];
    check_finite(&used)?;
    if collinear(p0.source, p1.source, p2.source) {
        return Err(PipelineError::DegenerateTransform(
            "the first three source points are collinear".into(),
        ));
    }

    let m = Matrix3::new(
        p0.source.x, p0.source.y, 1.0,
        p1.source.x, p1.source.y, 1.0,
        p2.source.x, p2.source.y, 1.0,
    );
    let lu = m.lu();
    let solve = |rhs: Vector3<f64>| {
        lu.solve(&rhs).ok_or_else(|| {
            PipelineError::DegenerateTransform("affine system is singular".into())
        })
    };
    let row_x = solve(Vector3::new(p0.destination.x, p1.destination.x, p2.destination.x))?;
    let row_y = solve(Vector3::new(p0.destination.y, p1.destination.y, p2.destination.y))?;

    Ok(Matrix2x3::new(
        row_x[0], row_x[1], row_x[2],
        row_y[0], row_y[1], row_y[2],
    ))
}

// ── Geometry checks ──────────────────────────────────────────────────────

fn check_finite(pairs: &[PointPair]) -> Result<(), PipelineError> {
    let finite = pairs.iter().all(|p| {
        p.source.x.is_finite()
            && p.source.y.is_finite()
            && p.destination.x.is_finite()
            && p.destination.y.is_finite()
    });
    if finite {
        Ok(())
    } else {
        Err(PipelineError::InvalidParameter(
            "correspondence coordinates must be finite".into(),
        ))
    }
}

/// Whether `c` lies on the line through `a` and `b`. Coincident points
/// count as collinear.
fn collinear(a: Point, b: Point, c: Point) -> bool {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let (acx, acy) = (c.x - a.x, c.y - a.y);
    let scale = a.distance(b) * a.distance(c);
    if scale <= f64::EPSILON {
        return true;
    }
    let cross = abx.mul_add(acy, -(aby * acx));
    cross.abs() <= COLLINEAR_TOLERANCE * scale
}

fn all_collinear(points: &[Point]) -> bool {
    let Some(&first) = points.first() else {
        return true;
    };
    let Some(&far) = points
        .iter()
        .max_by(|p, q| p.distance_squared(first).total_cmp(&q.distance_squared(first)))
    else {
        return true;
    };
    if far.distance(first) <= f64::EPSILON {
        return true;
    }
    points.iter().all(|&p| collinear(first, far, p))
}

fn any_three_collinear(points: &[Point]) -> bool {
    let n = points.len();
    (0..n).any(|i| {
        (i + 1..n).any(|j| (j + 1..n).any(|k| collinear(points[i], points[j], points[k])))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pair(sx: f64, sy: f64, dx: f64, dy: f64) -> PointPair {
        PointPair::new(Point::new(sx, sy), Point::new(dx, dy))
    }

    fn known_homography() -> Matrix3<f64> {
        Matrix3::new(
            3.5, 0.1, 640.0,
            -0.05, 3.3, 480.0,
            0.0001, -0.00005, 1.0,
        )
    }

    fn pairs_through(h: &Matrix3<f64>, sources: &[(f64, f64)]) -> Vec<PointPair> {
        let t = Transform::Projective(*h);
        sources
            .iter()
            .map(|&(x, y)| PointPair::new(Point::new(x, y), t.apply(Point::new(x, y))))
            .collect()
    }

    fn grid() -> Vec<(f64, f64)> {
        (0..5)
            .flat_map(|i| (0..5).map(move |j| (f64::from(i) * 20.0, f64::from(j) * 20.0)))
            .collect()
    }

    fn assert_close(a: Point, b: Point, tol: f64) {
        assert!(
            (a.x - b.x).abs() <= tol && (a.y - b.y).abs() <= tol,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn identity_pairs_give_identity() {
        let pairs = vec![
            pair(0.0, 0.0, 0.0, 0.0),
            pair(10.0, 0.0, 10.0, 0.0),
            pair(10.0, 10.0, 10.0, 10.0),
            pair(0.0, 10.0, 0.0, 10.0),
        ];
        let h = estimate_homography(&pairs, HomographyMethod::LeastSquares).unwrap();
        assert!((h - Matrix3::identity()).norm() < 1e-9, "{h}");

        let contour = Contour::new(vec![
            Point::new(1.0, 2.0),
            Point::new(7.5, 3.0),
            Point::new(4.0, 9.0),
        ]);
        let mapped = Transform::Projective(h).apply_contour(&contour);
        for (a, b) in contour.points().iter().zip(mapped.points()) {
            assert_close(*a, *b, 1e-9);
        }
    }

    #[test]
    fn four_pairs_fit_exactly() {
        let h_true = known_homography();
        let pairs = pairs_through(&h_true, &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let h = estimate_homography(&pairs, HomographyMethod::LeastSquares).unwrap();
        assert!((h[(2, 2)] - 1.0).abs() < 1e-12);
        for e in reprojection_errors(&Transform::Projective(h), &pairs) {
            assert!(e < 1e-6, "error {e}");
        }
    }

    #[test]
    fn overdetermined_fit_recovers_homography() {
        let h_true = known_homography();
        let pairs = pairs_through(&h_true, &grid());
        let h = estimate_homography(&pairs, HomographyMethod::LeastSquares).unwrap();
        for e in reprojection_errors(&Transform::Projective(h), &pairs) {
            assert!(e < 1e-6, "error {e}");
        }
    }

    #[test]
    fn too_few_pairs_for_homography() {
        let pairs = vec![
            pair(0.0, 0.0, 0.0, 0.0),
            pair(1.0, 0.0, 1.0, 0.0),
            pair(1.0, 1.0, 1.0, 1.0),
        ];
        let err = estimate_homography(&pairs, HomographyMethod::LeastSquares).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientCorrespondences { needed: 4, got: 3 }
        ));
    }

    #[test]
    fn three_collinear_sources_are_degenerate() {
        let pairs = vec![
            pair(0.0, 0.0, 0.0, 0.0),
            pair(5.0, 0.0, 5.0, 1.0),
            pair(10.0, 0.0, 10.0, 0.0),
            pair(0.0, 10.0, 0.0, 10.0),
        ];
        let err = estimate_homography(&pairs, HomographyMethod::LeastSquares).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateTransform(_)));
    }

    #[test]
    fn three_collinear_destinations_are_degenerate() {
        let pairs = vec![
            pair(0.0, 0.0, 0.0, 0.0),
            pair(10.0, 0.0, 5.0, 5.0),
            pair(10.0, 10.0, 10.0, 10.0),
            pair(0.0, 10.0, 0.0, 10.0),
        ];
        let err = estimate_homography(&pairs, HomographyMethod::LeastSquares).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateTransform(_)));
    }

    #[test]
    fn all_collinear_sources_are_degenerate() {
        let pairs: Vec<PointPair> = (0..6)
            .map(|i| {
                let v = f64::from(i);
                pair(v, 2.0 * v, v * v, v)
            })
            .collect();
        let err = estimate_homography(&pairs, HomographyMethod::LeastSquares).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateTransform(_)));
    }

    #[test]
    fn non_finite_pairs_are_rejected() {
        let pairs = vec![
            pair(0.0, 0.0, 0.0, 0.0),
            pair(10.0, 0.0, f64::NAN, 0.0),
            pair(10.0, 10.0, 10.0, 10.0),
            pair(0.0, 10.0, 0.0, 10.0),
        ];
        let err = estimate_homography(&pairs, HomographyMethod::LeastSquares).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter(_)));
    }

    #[test]
    fn ransac_ignores_outliers() {
        let h_true = known_homography();
        let mut pairs = pairs_through(&h_true, &grid());
        for (i, p) in pairs.iter_mut().enumerate().filter(|(i, _)| i % 6 == 1) {
            let shift = 300.0 + f64::from(u32::try_from(i).unwrap()) * 17.0;
            p.destination = Point::new(p.destination.x + shift, p.destination.y - shift);
        }
        let config = RansacConfig {
            inlier_threshold: 1.0,
            ..RansacConfig::default()
        };
        let h = estimate_homography(&pairs, HomographyMethod::Ransac(config)).unwrap();
        let errors = reprojection_errors(&Transform::Projective(h), &pairs);
        for (i, e) in errors.iter().enumerate() {
            if i % 6 == 1 {
                assert!(*e > 100.0, "outlier {i} fits with error {e}");
            } else {
                assert!(*e < 1e-6, "inlier {i} has error {e}");
            }
        }
    }

    #[test]
    fn ransac_without_consensus_fails() {
        let sources = [
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 100.0),
            (0.0, 100.0),
            (50.0, 30.0),
            (20.0, 70.0),
        ];
        let pairs = pairs_through(&known_homography(), &sources);
        let config = RansacConfig {
            min_inliers: 10,
            ..RansacConfig::default()
        };
        let err = estimate_homography(&pairs, HomographyMethod::Ransac(config)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientCorrespondences { needed: 10, got: 6 }
        ));
    }

    #[test]
    fn vanishing_denominator_gives_nan() {
        let t = Transform::Projective(Matrix3::new(
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            1.0, 0.0, 0.0,
        ));
        let contour = Contour::new(vec![Point::new(0.0, 5.0), Point::new(2.0, 4.0)]);
        let mapped = t.apply_contour(&contour);
        assert_eq!(mapped.len(), 2);
        assert!(mapped.points()[0].x.is_nan() && mapped.points()[0].y.is_nan());
        assert_close(mapped.points()[1], Point::new(1.0, 2.0), 1e-12);
    }

    #[test]
    fn affine_uses_only_first_three_pairs() {
        let pairs = vec![
            pair(0.0, 0.0, 10.0, 5.0),
            pair(1.0, 0.0, 11.0, 5.0),
            pair(0.0, 1.0, 10.0, 6.0),
            pair(50.0, 50.0, -999.0, 1234.0),
        ];
        let m = estimate_affine(&pairs).unwrap();
        let expected = Matrix2x3::new(1.0, 0.0, 10.0, 0.0, 1.0, 5.0);
        assert!((m - expected).norm() < 1e-12, "{m}");

        let t = Transform::Affine(m);
        assert_close(t.apply(Point::new(50.0, 50.0)), Point::new(60.0, 55.0), 1e-9);
        let errors = reprojection_errors(&t, &pairs);
        assert!(errors[..3].iter().all(|e| *e < 1e-9));
        assert!(errors[3] > 1000.0);
    }

    #[test]
    fn affine_recovers_rotation_and_scale() {
        let pairs = vec![
            pair(0.0, 0.0, 3.0, 4.0),
            pair(2.0, 0.0, 3.0, 8.0),
            pair(0.0, 2.0, -1.0, 4.0),
        ];
        let t = Transform::Affine(estimate_affine(&pairs).unwrap());
        // 90 degree rotation, scale 2, translation (3, 4).
        assert_close(t.apply(Point::new(1.0, 1.0)), Point::new(1.0, 6.0), 1e-9);
    }

    #[test]
    fn affine_needs_three_pairs() {
        let pairs = vec![pair(0.0, 0.0, 0.0, 0.0), pair(1.0, 0.0, 1.0, 0.0)];
        let err = estimate_affine(&pairs).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientCorrespondences { needed: 3, got: 2 }
        ));
    }

    #[test]
    fn affine_collinear_sources_are_degenerate() {
        let pairs = vec![
            pair(0.0, 0.0, 0.0, 0.0),
            pair(1.0, 1.0, 1.0, 0.0),
            pair(2.0, 2.0, 0.0, 1.0),
            pair(0.0, 5.0, 3.0, 3.0),
        ];
        let err = estimate_affine(&pairs).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateTransform(_)));
    }

    #[test]
    fn transforms_preserve_contour_shape_counts() {
        let contours = vec![
            Contour::new(vec![Point::new(0.0, 0.0)]),
            Contour::new(vec![Point::new(1.0, 1.0), Point::new(2.0, 3.0), Point::new(4.0, 1.0)]),
            Contour::default(),
        ];
        let t = Transform::Affine(Matrix2x3::new(2.0, 0.0, 1.0, 0.0, 2.0, 1.0));
        let mapped = t.apply_contours(&contours);
        assert_eq!(mapped.len(), contours.len());
        for (a, b) in contours.iter().zip(&mapped) {
            assert_eq!(a.len(), b.len());
        }
    }

    #[test]
    fn rows_match_matrix_shape() {
        assert_eq!(Transform::Projective(Matrix3::identity()).rows().len(), 3);
        let affine = Transform::Affine(Matrix2x3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        assert_eq!(affine.rows(), vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }
}
