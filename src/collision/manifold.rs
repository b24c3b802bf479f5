use crate::core::settings::MAX_MANIFOLD_POINTS;
use crate::error::PhysicsError;
use crate::math::{Transform, Vector2, EPSILON};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Identifies a contact point across steps so impulses can be carried over
pub type ContactId = u32;

/// How the manifold geometry is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ManifoldType {
    /// Two circles: `local_point` is the center of A, the point holds the center of B
    #[default]
    Circles,

    /// Face of A: `local_normal`/`local_point` describe the face in A's frame,
    /// points are B's clip points in B's frame
    FaceA,

    /// Face of B: mirror of `FaceA`
    FaceB,
}

/// A contact point of a manifold
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ManifoldPoint {
    /// Point in the frame of the body opposite the reference face
    pub local_point: Vector2,

    /// Accumulated non-penetration impulse
    pub normal_impulse: f32,

    /// Accumulated friction impulse
    pub tangent_impulse: f32,

    /// Feature id used to match points between steps
    pub id: ContactId,
}

impl ManifoldPoint {
    /// Creates a point with zero accumulated impulses
    pub fn new(local_point: Vector2, id: ContactId) -> Self {
        Self {
            local_point,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            id,
        }
    }
}

/// Up to two contact points between two convex shapes, in local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Manifold {
    /// The contact points; only the first `point_count` are meaningful
    pub points: [ManifoldPoint; MAX_MANIFOLD_POINTS],

    /// Face normal for `FaceA`/`FaceB`, unused for `Circles`
    pub local_normal: Vector2,

    /// Reference point whose meaning depends on `manifold_type`
    pub local_point: Vector2,

    pub manifold_type: ManifoldType,

    /// Number of valid points (0, 1 or 2)
    pub point_count: usize,
}

impl Manifold {
    /// Creates an empty manifold of the given type
    pub fn new(manifold_type: ManifoldType, local_normal: Vector2, local_point: Vector2) -> Self {
        Self {
            points: [ManifoldPoint::default(); MAX_MANIFOLD_POINTS],
            local_normal,
            local_point,
            manifold_type,
            point_count: 0,
        }
    }

    /// Manifold of two touching circles
    pub fn circles(center_a: Vector2, center_b: Vector2) -> Self {
        let mut manifold = Self::new(ManifoldType::Circles, Vector2::zero(), center_a);
        manifold.points[0] = ManifoldPoint::new(center_b, 0);
        manifold.point_count = 1;
        manifold
    }

    /// Adds a point to the manifold
    pub fn add_point(&mut self, point: ManifoldPoint) -> Result<()> {
        if self.point_count >= MAX_MANIFOLD_POINTS {
            return Err(PhysicsError::CapacityExceeded(format!(
                "manifold already holds {} points",
                MAX_MANIFOLD_POINTS
            )));
        }
        self.points[self.point_count] = point;
        self.point_count += 1;
        Ok(())
    }

    /// The valid points
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    /// Returns whether the manifold has no points
    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    /// Copies accumulated impulses from `old` for points whose ids match
    pub fn carry_impulses_from(&mut self, old: &Manifold) {
        for point in self.points[..self.point_count].iter_mut() {
            point.normal_impulse = 0.0;
            point.tangent_impulse = 0.0;

            if let Some(previous) = old.points().iter().find(|p| p.id == point.id) {
                point.normal_impulse = previous.normal_impulse;
                point.tangent_impulse = previous.tangent_impulse;
            }
        }
    }
}

/// Manifold data evaluated in world space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldManifold {
    /// Unit normal pointing from A to B
    pub normal: Vector2,

    /// Midpoints between the two surfaces
    pub points: [Vector2; MAX_MANIFOLD_POINTS],

    /// Negative when the shapes overlap
    pub separations: [f32; MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    /// Evaluates the manifold at the given transforms and shape radii
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut world = WorldManifold::default();
        if manifold.point_count == 0 {
            return world;
        }

        match manifold.manifold_type {
            ManifoldType::Circles => {
                world.normal = Vector2::unit_x();
                let point_a = xf_a.transform_point(manifold.local_point);
                let point_b = xf_b.transform_point(manifold.points[0].local_point);
                if point_a.distance_squared(&point_b) > EPSILON * EPSILON {
                    world.normal = (point_b - point_a).normalize();
                }

                let c_a = point_a + world.normal * radius_a;
                let c_b = point_b - world.normal * radius_b;
                world.points[0] = (c_a + c_b) * 0.5;
                world.separations[0] = (c_b - c_a).dot(&world.normal);
            }
            ManifoldType::FaceA => {
                world.normal = xf_a.transform_vector(manifold.local_normal);
                let plane_point = xf_a.transform_point(manifold.local_point);

                for i in 0..manifold.point_count {
                    let clip_point = xf_b.transform_point(manifold.points[i].local_point);
                    let c_a = clip_point
                        + world.normal * (radius_a - (clip_point - plane_point).dot(&world.normal));
                    let c_b = clip_point - world.normal * radius_b;
                    world.points[i] = (c_a + c_b) * 0.5;
                    world.separations[i] = (c_b - c_a).dot(&world.normal);
                }
            }
            ManifoldType::FaceB => {
                world.normal = xf_b.transform_vector(manifold.local_normal);
                let plane_point = xf_b.transform_point(manifold.local_point);

                for i in 0..manifold.point_count {
                    let clip_point = xf_a.transform_point(manifold.points[i].local_point);
                    let c_b = clip_point
                        + world.normal * (radius_b - (clip_point - plane_point).dot(&world.normal));
                    let c_a = clip_point - world.normal * radius_a;
                    world.points[i] = (c_a + c_b) * 0.5;
                    world.separations[i] = (c_a - c_b).dot(&world.normal);
                }

                // Ensure the normal points from A to B.
                world.normal = -world.normal;
            }
        }

        world
    }
}
