use crate::core::settings::{MAX_POLYGON_VERTICES, POLYGON_RADIUS};
use crate::error::PhysicsError;
use crate::math::{Transform, Vector2, EPSILON};
use crate::Result;

/// Maximum number of GJK iterations
const MAX_ITERATIONS: usize = 20;

/// A convex shape as seen by the distance and time-of-impact routines
///
/// Circles are a single vertex with a radius, polygons carry their skin radius.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceProxy {
    vertices: Vec<Vector2>,
    radius: f32,
}

impl DistanceProxy {
    /// A circle of the given radius centered at a body-local point
    pub fn circle(center: Vector2, radius: f32) -> Self {
        Self {
            vertices: vec![center],
            radius,
        }
    }

    /// A line segment with the polygon skin radius
    pub fn segment(a: Vector2, b: Vector2) -> Self {
        Self {
            vertices: vec![a, b],
            radius: POLYGON_RADIUS,
        }
    }

    /// A convex polygon with the polygon skin radius
    pub fn polygon(vertices: &[Vector2]) -> Result<Self> {
        Self::polygon_with_radius(vertices, POLYGON_RADIUS)
    }

    /// A convex polygon with an explicit skin radius
    pub fn polygon_with_radius(vertices: &[Vector2], radius: f32) -> Result<Self> {
        if vertices.is_empty() {
            return Err(PhysicsError::InvalidParameter(
                "a proxy needs at least one vertex".to_string(),
            ));
        }
        if vertices.len() > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::CapacityExceeded(format!(
                "{} vertices exceed the polygon limit of {}",
                vertices.len(),
                MAX_POLYGON_VERTICES
            )));
        }
        Ok(Self {
            vertices: vertices.to_vec(),
            radius,
        })
    }

    /// An axis-aligned box centered on the body origin
    pub fn boxed(half_width: f32, half_height: f32) -> Self {
        Self {
            vertices: vec![
                Vector2::new(-half_width, -half_height),
                Vector2::new(half_width, -half_height),
                Vector2::new(half_width, half_height),
                Vector2::new(-half_width, half_height),
            ],
            radius: POLYGON_RADIUS,
        }
    }

    /// The skin radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// The vertices in body-local coordinates
    pub fn vertices(&self) -> &[Vector2] {
        &self.vertices
    }

    /// A vertex by index
    #[inline]
    pub fn vertex(&self, index: usize) -> Vector2 {
        self.vertices[index]
    }

    /// Index of the vertex furthest along `d`
    pub fn support(&self, d: Vector2) -> usize {
        let mut best_index = 0;
        let mut best_value = self.vertices[0].dot(&d);
        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let value = v.dot(&d);
            if value > best_value {
                best_index = i;
                best_value = value;
            }
        }
        best_index
    }
}

/// Simplex state kept between distance queries to warm-start GJK
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimplexCache {
    /// Length or area of the cached simplex
    pub metric: f32,

    /// Number of cached vertices
    pub count: usize,

    /// Vertex indices on shape A
    pub index_a: [usize; 3],

    /// Vertex indices on shape B
    pub index_b: [usize; 3],
}

/// Input of `compute_distance`
#[derive(Debug, Clone, Copy)]
pub struct DistanceInput<'a> {
    pub proxy_a: &'a DistanceProxy,
    pub proxy_b: &'a DistanceProxy,
    pub transform_a: Transform,
    pub transform_b: Transform,

    /// Whether to shrink the result by the proxies' radii
    pub use_radii: bool,
}

/// Output of `compute_distance`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceOutput {
    /// Closest point on A
    pub point_a: Vector2,

    /// Closest point on B
    pub point_b: Vector2,

    pub distance: f32,

    /// Number of GJK iterations used
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimplexVertex {
    /// Support point on A
    w_a: Vector2,
    /// Support point on B
    w_b: Vector2,
    /// `w_b - w_a`
    w: Vector2,
    /// Barycentric coordinate of the closest point
    a: f32,
    index_a: usize,
    index_b: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn read_cache(
        cache: &SimplexCache,
        proxy_a: &DistanceProxy,
        xf_a: &Transform,
        proxy_b: &DistanceProxy,
        xf_b: &Transform,
    ) -> Self {
        let mut simplex = Simplex {
            count: cache.count,
            ..Default::default()
        };

        for i in 0..simplex.count {
            let v = &mut simplex.v[i];
            v.index_a = cache.index_a[i];
            v.index_b = cache.index_b[i];
            v.w_a = xf_a.transform_point(proxy_a.vertex(v.index_a));
            v.w_b = xf_b.transform_point(proxy_b.vertex(v.index_b));
            v.w = v.w_b - v.w_a;
            v.a = 0.0;
        }

        // Flush the cache if the simplex changed shape too much since it was stored.
        if simplex.count > 1 {
            let metric1 = cache.metric;
            let metric2 = simplex.metric();
            if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < EPSILON {
                simplex.count = 0;
            }
        }

        if simplex.count == 0 {
            let v = &mut simplex.v[0];
            v.index_a = 0;
            v.index_b = 0;
            v.w_a = xf_a.transform_point(proxy_a.vertex(0));
            v.w_b = xf_b.transform_point(proxy_b.vertex(0));
            v.w = v.w_b - v.w_a;
            v.a = 1.0;
            simplex.count = 1;
        }

        simplex
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count;
        for i in 0..self.count {
            cache.index_a[i] = self.v[i].index_a;
            cache.index_b[i] = self.v[i].index_b;
        }
    }

    fn search_direction(&self) -> Vector2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = e12.cross(&-self.v[0].w);
                if sgn > 0.0 {
                    // Origin is left of e12.
                    Vector2::scalar_cross(1.0, &e12)
                } else {
                    e12.cross_scalar(1.0)
                }
            }
            _ => Vector2::zero(),
        }
    }

    fn witness_points(&self) -> (Vector2, Vector2) {
        let [v1, v2, v3] = self.v;
        match self.count {
            1 => (v1.w_a, v1.w_b),
            2 => (
                v1.w_a * v1.a + v2.w_a * v2.a,
                v1.w_b * v1.a + v2.w_b * v2.a,
            ),
            3 => {
                let p = v1.w_a * v1.a + v2.w_a * v2.a + v3.w_a * v3.a;
                (p, p)
            }
            _ => (Vector2::zero(), Vector2::zero()),
        }
    }

    fn metric(&self) -> f32 {
        match self.count {
            2 => self.v[0].w.distance(&self.v[1].w),
            3 => (self.v[1].w - self.v[0].w).cross(&(self.v[2].w - self.v[0].w)),
            _ => 0.0,
        }
    }

    /// Closest point on a segment to the origin, via barycentric coordinates
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        // w1 region
        let d12_2 = -w1.dot(&e12);
        if d12_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // w2 region
        let d12_1 = w2.dot(&e12);
        if d12_1 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    /// Closest point on a triangle to the origin, by Voronoi region
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        let e12 = w2 - w1;
        let d12_1 = w2.dot(&e12);
        let d12_2 = -w1.dot(&e12);

        let e13 = w3 - w1;
        let d13_1 = w3.dot(&e13);
        let d13_2 = -w1.dot(&e13);

        let e23 = w3 - w2;
        let d23_1 = w3.dot(&e23);
        let d23_2 = -w2.dot(&e23);

        let n123 = e12.cross(&e13);
        let d123_1 = n123 * w2.cross(&w3);
        let d123_2 = n123 * w3.cross(&w1);
        let d123_3 = n123 * w1.cross(&w2);

        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv;
            self.v[1].a = d12_2 * inv;
            self.count = 2;
            return;
        }

        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv;
            self.v[2].a = d13_2 * inv;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[2].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[2];
            return;
        }

        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv;
            self.v[2].a = d23_2 * inv;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // Origin inside the triangle.
        let inv = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv;
        self.v[1].a = d123_2 * inv;
        self.v[2].a = d123_3 * inv;
        self.count = 3;
    }
}

/// Computes the closest points between two convex proxies with GJK
///
/// `cache` is read to warm-start the simplex and overwritten with the final one.
pub fn compute_distance(input: &DistanceInput, cache: &mut SimplexCache) -> DistanceOutput {
    let proxy_a = input.proxy_a;
    let proxy_b = input.proxy_b;
    let xf_a = &input.transform_a;
    let xf_b = &input.transform_b;

    let mut simplex = Simplex::read_cache(cache, proxy_a, xf_a, proxy_b, xf_b);

    let mut save_a = [0usize; 3];
    let mut save_b = [0usize; 3];

    let mut iterations = 0;
    while iterations < MAX_ITERATIONS {
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.v[i].index_a;
            save_b[i] = simplex.v[i].index_b;
        }

        match simplex.count {
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            _ => {}
        }

        // The origin is inside the triangle: overlap.
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();
        if d.length_squared() < EPSILON * EPSILON {
            // The origin is probably on the simplex; the overlap case is handled
            // by the caller through the returned distance.
            break;
        }

        let vertex = &mut simplex.v[simplex.count];
        vertex.index_a = proxy_a.support(xf_a.inverse_transform_vector(-d));
        vertex.w_a = xf_a.transform_point(proxy_a.vertex(vertex.index_a));
        vertex.index_b = proxy_b.support(xf_b.inverse_transform_vector(d));
        vertex.w_b = xf_b.transform_point(proxy_b.vertex(vertex.index_b));
        vertex.w = vertex.w_b - vertex.w_a;
        let (new_a, new_b) = (vertex.index_a, vertex.index_b);

        iterations += 1;

        // A repeated support point means no further progress.
        let duplicate = (0..save_count).any(|i| new_a == save_a[i] && new_b == save_b[i]);
        if duplicate {
            break;
        }

        simplex.count += 1;
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut distance = point_a.distance(&point_b);
    simplex.write_cache(cache);

    if input.use_radii {
        let r_a = proxy_a.radius();
        let r_b = proxy_b.radius();

        if distance > r_a + r_b && distance > EPSILON {
            distance -= r_a + r_b;
            let normal = (point_b - point_a).normalize();
            point_a += normal * r_a;
            point_b -= normal * r_b;
        } else {
            let p = (point_a + point_b) * 0.5;
            point_a = p;
            point_b = p;
            distance = 0.0;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance,
        iterations,
    }
}
