use crate::bodies::Material;
use crate::collision::distance::DistanceProxy;
use crate::collision::manifold::{Manifold, WorldManifold};
use crate::collision::narrow_phase::Narrowphase;
use crate::core::BodyHandle;
use crate::math::Transform;

/// Flags describing the state of a contact
pub mod contact_flags {
    use bitflags::bitflags;

    bitflags! {
        /// State bits of a contact
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct ContactFlags: u32 {
            /// The contact takes part in the solver
            const ENABLED = 0x01;

            /// The manifold has at least one point
            const TOUCHING = 0x02;

            /// The contact was already added to the island being built
            const ISLAND = 0x04;

            /// `toi` holds a valid time of impact for this step
            const TOI = 0x08;
        }
    }
}

use self::contact_flags::ContactFlags;

/// A potential or actual contact between two bodies
///
/// The manifold is produced by a `Narrowphase`; the proxies describe the
/// convex shapes for time-of-impact queries and narrow-phase evaluation.
#[derive(Debug, Clone)]
pub struct Contact {
    body_a: BodyHandle,
    body_b: BodyHandle,

    /// Shape of A in A's local frame
    proxy_a: DistanceProxy,

    /// Shape of B in B's local frame
    proxy_b: DistanceProxy,

    manifold: Manifold,

    /// Mixed friction coefficient
    friction: f32,

    /// Mixed restitution coefficient
    restitution: f32,

    /// Desired surface speed along the tangent, for conveyor belts
    tangent_speed: f32,

    flags: ContactFlags,

    /// Time of impact within the current step, valid while `TOI` is set
    pub(crate) toi: f32,

    /// Number of TOI sub-steps this contact took part in during the current step
    pub(crate) toi_count: u32,
}

impl Contact {
    /// Creates an enabled, not yet touching contact
    pub fn new(
        body_a: BodyHandle,
        body_b: BodyHandle,
        proxy_a: DistanceProxy,
        proxy_b: DistanceProxy,
    ) -> Self {
        let material = Material::default();
        Self {
            body_a,
            body_b,
            proxy_a,
            proxy_b,
            manifold: Manifold::default(),
            friction: material.mix_friction(&material),
            restitution: material.mix_restitution(&material),
            tangent_speed: 0.0,
            flags: ContactFlags::ENABLED,
            toi: 1.0,
            toi_count: 0,
        }
    }

    /// Sets friction and restitution from the two surface materials
    pub fn with_materials(mut self, material_a: &Material, material_b: &Material) -> Self {
        self.friction = material_a.mix_friction(material_b);
        self.restitution = material_a.mix_restitution(material_b);
        self
    }

    /// Sets an initial manifold
    pub fn with_manifold(mut self, manifold: Manifold) -> Self {
        self.set_manifold(manifold);
        self
    }

    /// The first body
    pub fn get_body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// The second body
    pub fn get_body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// The body on the other side of the contact, if `body` takes part in it
    pub fn get_other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if body == self.body_a {
            Some(self.body_b)
        } else if body == self.body_b {
            Some(self.body_a)
        } else {
            None
        }
    }

    /// Shape of A
    pub fn get_proxy_a(&self) -> &DistanceProxy {
        &self.proxy_a
    }

    /// Shape of B
    pub fn get_proxy_b(&self) -> &DistanceProxy {
        &self.proxy_b
    }

    /// The current manifold
    pub fn get_manifold(&self) -> &Manifold {
        &self.manifold
    }

    pub(crate) fn manifold_mut(&mut self) -> &mut Manifold {
        &mut self.manifold
    }

    /// Replaces the manifold, keeping impulses of points with matching ids
    pub fn set_manifold(&mut self, manifold: Manifold) {
        let old = self.manifold;
        self.manifold = manifold;
        self.manifold.carry_impulses_from(&old);
        self.flags.set(ContactFlags::TOUCHING, self.manifold.point_count > 0);
    }

    /// Evaluates the manifold in world space
    pub fn get_world_manifold(&self, xf_a: &Transform, xf_b: &Transform) -> WorldManifold {
        WorldManifold::new(
            &self.manifold,
            xf_a,
            self.proxy_a.radius(),
            xf_b,
            self.proxy_b.radius(),
        )
    }

    /// Re-evaluates the manifold at the given transforms
    ///
    /// Re-enables the contact. Returns whether the contact is touching.
    pub fn update(&mut self, narrowphase: &mut dyn Narrowphase, xf_a: &Transform, xf_b: &Transform) -> bool {
        self.flags.insert(ContactFlags::ENABLED);
        let manifold = narrowphase.evaluate(self, xf_a, xf_b);
        self.set_manifold(manifold);
        self.is_touching()
    }

    /// The friction coefficient
    pub fn get_friction(&self) -> f32 {
        self.friction
    }

    /// Overrides the friction coefficient
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    /// The restitution coefficient
    pub fn get_restitution(&self) -> f32 {
        self.restitution
    }

    /// Overrides the restitution coefficient
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    /// The target tangent speed
    pub fn get_tangent_speed(&self) -> f32 {
        self.tangent_speed
    }

    /// Sets the target tangent speed in meters per second
    pub fn set_tangent_speed(&mut self, speed: f32) {
        self.tangent_speed = speed;
    }

    /// Returns whether the contact takes part in the solver
    pub fn is_enabled(&self) -> bool {
        self.flags.contains(ContactFlags::ENABLED)
    }

    /// Enables or disables the contact until its next update
    pub fn set_enabled(&mut self, enabled: bool) {
        self.flags.set(ContactFlags::ENABLED, enabled);
    }

    /// Returns whether the manifold has points
    pub fn is_touching(&self) -> bool {
        self.flags.contains(ContactFlags::TOUCHING)
    }

    pub(crate) fn flags(&self) -> ContactFlags {
        self.flags
    }

    pub(crate) fn set_flag(&mut self, flag: ContactFlags, value: bool) {
        self.flags.set(flag, value);
    }
}
