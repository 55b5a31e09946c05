use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::net::Pose;

/// Read/write access to a pose owned by the host environment.
pub trait PoseSource {
    fn pose(&self) -> Pose;
    fn set_pose(&mut self, pose: Pose);
}

/// Shared, single-threaded pose cell.
///
/// The host keeps one clone attached to its scene object and hands another to
/// the registry, so both sides see the same pose.
#[derive(Debug, Clone, Default)]
pub struct SharedPose(Rc<RefCell<Pose>>);

impl SharedPose {
    pub fn new(pose: Pose) -> Self {
        Self(Rc::new(RefCell::new(pose)))
    }

    pub fn get(&self) -> Pose {
        *self.0.borrow()
    }

    pub fn set(&self, pose: Pose) {
        *self.0.borrow_mut() = pose;
    }

    pub fn update(&self, f: impl FnOnce(&mut Pose)) {
        f(&mut *self.0.borrow_mut());
    }

    /// True when both handles point at the same pose.
    pub fn ptr_eq(&self, other: &SharedPose) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Pose> for SharedPose {
    fn from(pose: Pose) -> Self {
        Self::new(pose)
    }
}

impl PoseSource for SharedPose {
    fn pose(&self) -> Pose {
        self.get()
    }

    fn set_pose(&mut self, pose: Pose) {
        self.set(pose);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Allocated locally, awaiting an `IdAssignment`.
    Provisional(i32),
    /// Confirmed by (or allocated on) the authority.
    Authoritative(i32),
}

impl Identity {
    pub fn id(self) -> i32 {
        match self {
            Identity::Provisional(id) | Identity::Authoritative(id) => id,
        }
    }

    pub fn is_provisional(self) -> bool {
        matches!(self, Identity::Provisional(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Provisional(id) => write!(f, "local#{}", id),
            Identity::Authoritative(id) => write!(f, "global#{}", id),
        }
    }
}

#[derive(Debug)]
pub struct NetworkedObject<H> {
    identity: Identity,
    handle: H,
    last_observed: Pose,
    revision: u32,
    last_remote_timestamp: Option<u32>,
}

impl<H: PoseSource> NetworkedObject<H> {
    pub fn new(identity: Identity, handle: H) -> Self {
        let last_observed = handle.pose();
        Self {
            identity,
            handle,
            last_observed,
            revision: 1,
            last_remote_timestamp: None,
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn last_observed(&self) -> Pose {
        self.last_observed
    }

    pub fn last_remote_timestamp(&self) -> Option<u32> {
        self.last_remote_timestamp
    }

    pub(crate) fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    /// Returns the new pose if it moved by more than `epsilon` since the last
    /// observation, bumping the revision.
    pub(crate) fn observe(&mut self, epsilon: f32) -> Option<Pose> {
        let current = self.handle.pose();
        if current.approx_eq(&self.last_observed, epsilon) {
            return None;
        }

        self.last_observed = current;
        self.revision = self.revision.wrapping_add(1);
        Some(current)
    }

    /// Writes a peer's pose through to the host. `Err` carries the last
    /// applied timestamp when `timestamp` is not newer.
    pub(crate) fn apply_remote(&mut self, timestamp: u32, pose: Pose) -> Result<(), u32> {
        if let Some(last) = self.last_remote_timestamp {
            if timestamp <= last {
                return Err(last);
            }
        }

        self.handle.set_pose(pose);
        self.last_observed = pose;
        self.revision = self.revision.max(timestamp);
        self.last_remote_timestamp = Some(timestamp);
        Ok(())
    }

    /// Forgets the peer's ordering. A new peer session counts from scratch.
    pub(crate) fn reset_remote_timestamp(&mut self) {
        self.last_remote_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn shared_pose_is_shared() {
        let a = SharedPose::new(Pose::IDENTITY);
        let b = a.clone();

        a.set(Pose::from_position(Vec3::X));

        assert!(a.ptr_eq(&b));
        assert_eq!(b.get().position, Vec3::X);
    }

    #[test]
    fn revision_starts_at_one() {
        let object = NetworkedObject::new(Identity::Provisional(0), SharedPose::default());
        assert_eq!(object.revision(), 1);
        assert_eq!(object.last_remote_timestamp(), None);
    }

    #[test]
    fn remote_apply_keeps_revision_monotonic() {
        let handle = SharedPose::default();
        let mut object = NetworkedObject::new(Identity::Authoritative(1), handle.clone());

        handle.set(Pose::from_position(Vec3::Y));
        object.observe(1e-5);
        handle.set(Pose::from_position(Vec3::Z));
        object.observe(1e-5);
        assert_eq!(object.revision(), 3);

        object.apply_remote(2, Pose::IDENTITY).unwrap();
        assert_eq!(object.revision(), 3);
        assert_eq!(handle.get(), Pose::IDENTITY);

        object.apply_remote(10, Pose::from_position(Vec3::X)).unwrap();
        assert_eq!(object.revision(), 10);
        assert_eq!(object.apply_remote(10, Pose::IDENTITY), Err(10));
    }

    #[test]
    fn identity_display() {
        assert_eq!(Identity::Provisional(3).to_string(), "local#3");
        assert_eq!(Identity::Authoritative(100).to_string(), "global#100");
        assert_eq!(Identity::Authoritative(100).id(), 100);
    }
}
