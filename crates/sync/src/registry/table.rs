use std::collections::HashMap;

use crate::error::RegistryError;
use crate::net::{POSE_EPSILON, Pose};

use super::object::{Identity, NetworkedObject, PoseSource};

/// A pose that moved since the previous scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseChange {
    pub identity: Identity,
    pub pose: Pose,
    pub revision: u32,
}

/// All tracked objects, split by identity space.
///
/// An object lives in exactly one of the two maps. Promotion moves it.
#[derive(Debug)]
pub struct ObjectRegistry<H> {
    provisional: HashMap<i32, NetworkedObject<H>>,
    authoritative: HashMap<i32, NetworkedObject<H>>,
    next_local_id: i32,
    next_global_id: i32,
    epsilon: f32,
}

impl<H: PoseSource> Default for ObjectRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: PoseSource> ObjectRegistry<H> {
    pub fn new() -> Self {
        Self::with_epsilon(POSE_EPSILON)
    }

    pub fn with_epsilon(epsilon: f32) -> Self {
        Self {
            provisional: HashMap::new(),
            authoritative: HashMap::new(),
            next_local_id: 0,
            next_global_id: 0,
            epsilon,
        }
    }

    /// Inserts an object under a known global id.
    ///
    /// A duplicate id is a local bug, reported as [`RegistryError::DuplicateRegistration`].
    pub fn register_global(&mut self, global_id: i32, handle: H) -> Result<(), RegistryError> {
        if self.authoritative.contains_key(&global_id) {
            return Err(RegistryError::DuplicateRegistration(global_id));
        }

        self.authoritative.insert(
            global_id,
            NetworkedObject::new(Identity::Authoritative(global_id), handle),
        );
        self.reserve_global(global_id);
        Ok(())
    }

    /// Inserts a provisional object under a fresh, strictly increasing local id.
    pub fn register_local(&mut self, handle: H) -> i32 {
        let local_id = self.next_local_id;
        self.next_local_id += 1;

        self.provisional.insert(
            local_id,
            NetworkedObject::new(Identity::Provisional(local_id), handle),
        );
        local_id
    }

    /// Authority side: inserts an object under a fresh global id, greater than
    /// any id seen so far.
    pub fn allocate_global(&mut self, handle: H) -> i32 {
        let global_id = self.next_global_id;
        self.authoritative.insert(
            global_id,
            NetworkedObject::new(Identity::Authoritative(global_id), handle),
        );
        self.reserve_global(global_id);
        global_id
    }

    /// Moves `provisional[local_id]` to `authoritative[global_id]`.
    ///
    /// Nothing moves when the local id is unknown or the global id is taken.
    pub fn promote(&mut self, local_id: i32, global_id: i32) -> Result<(), RegistryError> {
        if !self.provisional.contains_key(&local_id) {
            return Err(RegistryError::UnknownObject(Identity::Provisional(local_id)));
        }
        if self.authoritative.contains_key(&global_id) {
            return Err(RegistryError::DuplicateRegistration(global_id));
        }

        let Some(mut object) = self.provisional.remove(&local_id) else {
            return Err(RegistryError::UnknownObject(Identity::Provisional(local_id)));
        };

        object.set_identity(Identity::Authoritative(global_id));
        self.authoritative.insert(global_id, object);
        self.reserve_global(global_id);
        Ok(())
    }

    /// Scans every object and returns those whose pose moved by more than the
    /// registry epsilon since the last scan. Order is unspecified.
    pub fn detect_changes(&mut self) -> Vec<PoseChange> {
        let epsilon = self.epsilon;

        self.provisional
            .values_mut()
            .chain(self.authoritative.values_mut())
            .filter_map(|object| {
                object.observe(epsilon).map(|pose| PoseChange {
                    identity: object.identity(),
                    pose,
                    revision: object.revision(),
                })
            })
            .collect()
    }

    /// Applies a peer's pose. Unknown objects and non-increasing timestamps
    /// are rejected without touching any state.
    pub fn apply_remote_update(
        &mut self,
        identity: Identity,
        timestamp: u32,
        pose: Pose,
    ) -> Result<(), RegistryError> {
        let object = self
            .get_mut(identity)
            .ok_or(RegistryError::UnknownObject(identity))?;

        object
            .apply_remote(timestamp, pose)
            .map_err(|last_applied| RegistryError::StaleUpdate {
                identity,
                timestamp,
                last_applied,
            })
    }

    /// Called when a peer session starts: its timestamps restart, so the
    /// previous session's high-water marks no longer apply.
    pub fn reset_remote_timestamps(&mut self) {
        for object in self
            .provisional
            .values_mut()
            .chain(self.authoritative.values_mut())
        {
            object.reset_remote_timestamp();
        }
    }

    pub fn get(&self, identity: Identity) -> Option<&NetworkedObject<H>> {
        match identity {
            Identity::Provisional(id) => self.provisional.get(&id),
            Identity::Authoritative(id) => self.authoritative.get(&id),
        }
    }

    pub fn get_mut(&mut self, identity: Identity) -> Option<&mut NetworkedObject<H>> {
        match identity {
            Identity::Provisional(id) => self.provisional.get_mut(&id),
            Identity::Authoritative(id) => self.authoritative.get_mut(&id),
        }
    }

    pub fn contains(&self, identity: Identity) -> bool {
        self.get(identity).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkedObject<H>> {
        self.provisional.values().chain(self.authoritative.values())
    }

    pub fn provisional_count(&self) -> usize {
        self.provisional.len()
    }

    pub fn authoritative_count(&self) -> usize {
        self.authoritative.len()
    }

    pub fn len(&self) -> usize {
        self.provisional.len() + self.authoritative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reserve_global(&mut self, global_id: i32) {
        if global_id >= self.next_global_id {
            self.next_global_id = global_id.saturating_add(1);
        }
    }
}
