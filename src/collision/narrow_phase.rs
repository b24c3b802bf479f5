use crate::collision::contact::Contact;
use crate::collision::manifold::Manifold;
use crate::math::Transform;

/// The collision layer that turns two posed proxies into a manifold
///
/// The world calls this at the start of every step for each awake contact and
/// again during continuous collision after bodies have been moved to their
/// time of impact.
pub trait Narrowphase {
    /// Computes the manifold of `contact` with its bodies at the given transforms
    ///
    /// Returned point ids are matched against the current manifold to carry
    /// accumulated impulses over.
    fn evaluate(&mut self, contact: &Contact, xf_a: &Transform, xf_b: &Transform) -> Manifold;
}

/// A narrow phase that keeps every manifold as the caller supplied it
#[derive(Debug, Default, Clone, Copy)]
pub struct RetainedManifolds;

impl Narrowphase for RetainedManifolds {
    fn evaluate(&mut self, contact: &Contact, _xf_a: &Transform, _xf_b: &Transform) -> Manifold {
        *contact.get_manifold()
    }
}

impl<F> Narrowphase for F
where
    F: FnMut(&Contact, &Transform, &Transform) -> Manifold,
{
    fn evaluate(&mut self, contact: &Contact, xf_a: &Transform, xf_b: &Transform) -> Manifold {
        self(contact, xf_a, xf_b)
    }
}
