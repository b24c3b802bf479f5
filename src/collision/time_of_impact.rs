//! Time of impact by conservative advancement over a separating axis.
//!
//! The routine repeatedly picks a separating axis from the GJK simplex and
//! pushes the first time bound forward until the separation along that axis
//! reaches the target distance, finding the crossing with a root finder that
//! alternates bisection and the secant rule.

use crate::collision::distance::{compute_distance, DistanceInput, DistanceProxy, SimplexCache};
use crate::core::settings::{LINEAR_SLOP, MAX_POLYGON_VERTICES};
use crate::math::{Sweep, Transform, Vector2};
use tracing::trace;

/// Maximum number of outer (distance) iterations
const MAX_ITERATIONS: usize = 20;

/// Maximum number of root finder iterations per push-back
const MAX_ROOT_ITERATIONS: usize = 50;

/// Input of `time_of_impact`
#[derive(Debug, Clone, Copy)]
pub struct ToiInput<'a> {
    pub proxy_a: &'a DistanceProxy,
    pub proxy_b: &'a DistanceProxy,
    pub sweep_a: Sweep,
    pub sweep_b: Sweep,

    /// Upper bound of the sweep interval, in `[0, 1]`
    pub t_max: f32,
}

/// Outcome of a time-of-impact query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToiState {
    #[default]
    Unknown,

    /// The iteration budget ran out; `t` is the best safe time found
    Failed,

    /// The proxies overlap at the start of the sweep
    Overlapped,

    /// The proxies reach the target separation at `t`
    Touching,

    /// The proxies stay apart for the whole interval
    Separated,
}

/// Counters of a single query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToiStats {
    /// Outer iterations used
    pub iterations: usize,

    /// Root finder iterations used in total
    pub root_iterations: usize,

    /// Largest root finder iteration count of a single push-back
    pub max_root_iterations: usize,
}

/// Result of `time_of_impact`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ToiOutput {
    pub state: ToiState,

    /// Sweep parameter of the result, in `[0, t_max]`
    pub t: f32,

    pub stats: ToiStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeparationKind {
    Points,
    FaceA,
    FaceB,
}

/// Separation of two proxies along an axis that moves with the bodies
///
/// Lives on the stack for the duration of one query, so concurrent queries
/// never share state.
struct SeparationFunction<'a> {
    proxy_a: &'a DistanceProxy,
    proxy_b: &'a DistanceProxy,
    sweep_a: Sweep,
    sweep_b: Sweep,
    kind: SeparationKind,
    local_point: Vector2,
    axis: Vector2,
}

impl<'a> SeparationFunction<'a> {
    /// Builds the axis from the GJK simplex at time `t1`
    ///
    /// Returns the function and the initial separation, which is non-negative.
    fn new(
        cache: &SimplexCache,
        proxy_a: &'a DistanceProxy,
        sweep_a: Sweep,
        proxy_b: &'a DistanceProxy,
        sweep_b: Sweep,
        t1: f32,
    ) -> (Self, f32) {
        let xf_a = sweep_a.get_transform(t1);
        let xf_b = sweep_b.get_transform(t1);

        let mut function = SeparationFunction {
            proxy_a,
            proxy_b,
            sweep_a,
            sweep_b,
            kind: SeparationKind::Points,
            local_point: Vector2::zero(),
            axis: Vector2::zero(),
        };

        if cache.count == 1 {
            let point_a = xf_a.transform_point(proxy_a.vertex(cache.index_a[0]));
            let point_b = xf_b.transform_point(proxy_b.vertex(cache.index_b[0]));
            function.axis = point_b - point_a;
            let s = function.axis.normalize_mut();
            return (function, s);
        }

        if cache.index_a[0] == cache.index_a[1] {
            // Two points on B and one on A.
            function.kind = SeparationKind::FaceB;
            let local_b1 = proxy_b.vertex(cache.index_b[0]);
            let local_b2 = proxy_b.vertex(cache.index_b[1]);

            function.axis = (local_b2 - local_b1).cross_scalar(1.0).normalize();
            let normal = xf_b.transform_vector(function.axis);

            function.local_point = (local_b1 + local_b2) * 0.5;
            let point_b = xf_b.transform_point(function.local_point);
            let point_a = xf_a.transform_point(proxy_a.vertex(cache.index_a[0]));

            let mut s = (point_a - point_b).dot(&normal);
            if s < 0.0 {
                function.axis = -function.axis;
                s = -s;
            }
            (function, s)
        } else {
            // Two points on A and one or two on B.
            function.kind = SeparationKind::FaceA;
            let local_a1 = proxy_a.vertex(cache.index_a[0]);
            let local_a2 = proxy_a.vertex(cache.index_a[1]);

            function.axis = (local_a2 - local_a1).cross_scalar(1.0).normalize();
            let normal = xf_a.transform_vector(function.axis);

            function.local_point = (local_a1 + local_a2) * 0.5;
            let point_a = xf_a.transform_point(function.local_point);
            let point_b = xf_b.transform_point(proxy_b.vertex(cache.index_b[0]));

            let mut s = (point_b - point_a).dot(&normal);
            if s < 0.0 {
                function.axis = -function.axis;
                s = -s;
            }
            (function, s)
        }
    }

    fn transforms(&self, t: f32) -> (Transform, Transform) {
        (self.sweep_a.get_transform(t), self.sweep_b.get_transform(t))
    }

    /// Deepest points along the axis at time `t`: `(separation, index_a, index_b)`
    ///
    /// The index on the side that owns the reference face is unused.
    fn find_min_separation(&self, t: f32) -> (f32, usize, usize) {
        let (xf_a, xf_b) = self.transforms(t);

        match self.kind {
            SeparationKind::Points => {
                let axis_a = xf_a.inverse_transform_vector(self.axis);
                let axis_b = xf_b.inverse_transform_vector(-self.axis);

                let index_a = self.proxy_a.support(axis_a);
                let index_b = self.proxy_b.support(axis_b);

                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(&self.axis), index_a, index_b)
            }
            SeparationKind::FaceA => {
                let normal = xf_a.transform_vector(self.axis);
                let point_a = xf_a.transform_point(self.local_point);

                let axis_b = xf_b.inverse_transform_vector(-normal);
                let index_b = self.proxy_b.support(axis_b);
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(&normal), 0, index_b)
            }
            SeparationKind::FaceB => {
                let normal = xf_b.transform_vector(self.axis);
                let point_b = xf_b.transform_point(self.local_point);

                let axis_a = xf_a.inverse_transform_vector(-normal);
                let index_a = self.proxy_a.support(axis_a);
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));

                ((point_a - point_b).dot(&normal), index_a, 0)
            }
        }
    }

    /// Separation of the given vertex pair along the axis at time `t`
    fn evaluate(&self, index_a: usize, index_b: usize, t: f32) -> f32 {
        let (xf_a, xf_b) = self.transforms(t);

        match self.kind {
            SeparationKind::Points => {
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(&self.axis)
            }
            SeparationKind::FaceA => {
                let normal = xf_a.transform_vector(self.axis);
                let point_a = xf_a.transform_point(self.local_point);
                let point_b = xf_b.transform_point(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(&normal)
            }
            SeparationKind::FaceB => {
                let normal = xf_b.transform_vector(self.axis);
                let point_b = xf_b.transform_point(self.local_point);
                let point_a = xf_a.transform_point(self.proxy_a.vertex(index_a));
                (point_a - point_b).dot(&normal)
            }
        }
    }
}

/// Computes the upper bound on time before two moving proxies come within
/// `target` of each other
///
/// The result is conservative: at `t` the proxies are at least
/// `target - tolerance` apart, where the target leaves a small slop inside
/// the combined radius. Sweeps are normalized before use.
pub fn time_of_impact(input: &ToiInput) -> ToiOutput {
    let mut output = ToiOutput {
        state: ToiState::Unknown,
        t: input.t_max,
        stats: ToiStats::default(),
    };

    let proxy_a = input.proxy_a;
    let proxy_b = input.proxy_b;

    let mut sweep_a = input.sweep_a;
    let mut sweep_b = input.sweep_b;

    // Large rotations make the root finder fail, so keep the angles small.
    sweep_a.normalize();
    sweep_b.normalize();

    let t_max = input.t_max;

    let total_radius = proxy_a.radius() + proxy_b.radius();
    let target = LINEAR_SLOP.max(total_radius - 3.0 * LINEAR_SLOP);
    let tolerance = 0.25 * LINEAR_SLOP;
    debug_assert!(target > tolerance);

    let mut t1 = 0.0;
    let mut cache = SimplexCache::default();

    // Walk t1 forward until the proxies are touching or the interval is exhausted.
    loop {
        let distance_input = DistanceInput {
            proxy_a,
            proxy_b,
            transform_a: sweep_a.get_transform(t1),
            transform_b: sweep_b.get_transform(t1),
            use_radii: false,
        };
        let distance = compute_distance(&distance_input, &mut cache);

        if distance.distance <= 0.0 {
            output.state = ToiState::Overlapped;
            output.t = 0.0;
            break;
        }

        if distance.distance < target + tolerance {
            output.state = ToiState::Touching;
            output.t = t1;
            break;
        }

        let (function, _) = SeparationFunction::new(&cache, proxy_a, sweep_a, proxy_b, sweep_b, t1);

        // Resolve the deepest points along the axis at t2, pushing t2 back
        // until those points stop being the deepest ones.
        let mut done = false;
        let mut t2 = t_max;
        let mut push_back_iterations = 0;
        loop {
            let (mut s2, index_a, index_b) = function.find_min_separation(t2);

            if s2 > target + tolerance {
                output.state = ToiState::Separated;
                output.t = t_max;
                done = true;
                break;
            }

            // The separation reaches the target at t2: advance the sweeps there.
            if s2 > target - tolerance {
                t1 = t2;
                break;
            }

            let mut s1 = function.evaluate(index_a, index_b, t1);

            // The root finder needs s1 above the target to bracket a root.
            if s1 < target - tolerance {
                output.state = ToiState::Failed;
                output.t = t1;
                done = true;
                break;
            }

            if s1 <= target + tolerance {
                output.state = ToiState::Touching;
                output.t = t1;
                done = true;
                break;
            }

            // 1D root of f(t) = s(t) - target on [t1, t2].
            let mut root_iterations = 0;
            let mut a1 = t1;
            let mut a2 = t2;
            loop {
                let t = if root_iterations & 1 == 1 {
                    a1 + (target - s1) * (a2 - a1) / (s2 - s1)
                } else {
                    0.5 * (a1 + a2)
                };
                root_iterations += 1;
                output.stats.root_iterations += 1;

                let s = function.evaluate(index_a, index_b, t);

                if (s - target).abs() < tolerance {
                    t2 = t;
                    break;
                }

                if s > target {
                    a1 = t;
                    s1 = s;
                } else {
                    a2 = t;
                    s2 = s;
                }

                if root_iterations == MAX_ROOT_ITERATIONS {
                    break;
                }
            }

            output.stats.max_root_iterations = output.stats.max_root_iterations.max(root_iterations);

            push_back_iterations += 1;
            if push_back_iterations == MAX_POLYGON_VERTICES {
                break;
            }
        }

        output.stats.iterations += 1;

        if done {
            break;
        }

        if output.stats.iterations == MAX_ITERATIONS {
            // Root finder got stuck; report the last safe time.
            output.state = ToiState::Failed;
            output.t = t1;
            break;
        }
    }

    trace!(
        state = ?output.state,
        t = output.t,
        iterations = output.stats.iterations,
        "time of impact"
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn moving_sweep(from: Vector2, to: Vector2) -> Sweep {
        let mut sweep = Sweep::new(Vector2::zero(), from, 0.0);
        sweep.c = to;
        sweep
    }

    #[test]
    fn test_fast_circle_hits_wall() {
        let bullet = DistanceProxy::circle(Vector2::zero(), 0.1);
        let wall = DistanceProxy::boxed(0.1, 2.0);

        let input = ToiInput {
            proxy_a: &bullet,
            proxy_b: &wall,
            sweep_a: moving_sweep(Vector2::new(-5.0, 0.0), Vector2::new(5.0, 0.0)),
            sweep_b: Sweep::new(Vector2::zero(), Vector2::zero(), 0.0),
            t_max: 1.0,
        };

        let output = time_of_impact(&input);
        assert_eq!(output.state, ToiState::Touching);

        // The circle center stops `target` short of the wall face at x = -0.1.
        let x = -5.0 + 10.0 * output.t;
        let target = bullet.radius() + wall.radius() - 3.0 * LINEAR_SLOP;
        assert_relative_eq!(x, -0.1 - target, epsilon = 0.25 * LINEAR_SLOP + 1e-4);
    }

    #[test]
    fn test_separated_when_paths_miss() {
        let a = DistanceProxy::circle(Vector2::zero(), 0.2);
        let b = DistanceProxy::circle(Vector2::zero(), 0.2);

        let input = ToiInput {
            proxy_a: &a,
            proxy_b: &b,
            sweep_a: moving_sweep(Vector2::new(-5.0, 3.0), Vector2::new(5.0, 3.0)),
            sweep_b: Sweep::new(Vector2::zero(), Vector2::zero(), 0.0),
            t_max: 1.0,
        };

        let output = time_of_impact(&input);
        assert_eq!(output.state, ToiState::Separated);
        assert_eq!(output.t, 1.0);
    }

    #[test]
    fn test_overlapped_at_start() {
        let a = DistanceProxy::boxed(1.0, 1.0);
        let b = DistanceProxy::boxed(1.0, 1.0);

        let input = ToiInput {
            proxy_a: &a,
            proxy_b: &b,
            sweep_a: moving_sweep(Vector2::new(0.2, 0.0), Vector2::new(3.0, 0.0)),
            sweep_b: Sweep::new(Vector2::zero(), Vector2::zero(), 0.0),
            t_max: 1.0,
        };

        let output = time_of_impact(&input);
        assert_eq!(output.state, ToiState::Overlapped);
        assert_eq!(output.t, 0.0);
    }
}
