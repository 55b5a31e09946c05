use posesync::SharedPose;

/// Objects the peer registered with the authority, kept alive for the host.
///
/// The server owns no objects of its own; every global id comes from the
/// peer, either announced directly or assigned on its request.
#[derive(Default)]
pub struct Scene {
    mirrored: Vec<(i32, SharedPose)>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, global_id: i32, handle: SharedPose) {
        self.mirrored.push((global_id, handle));
    }

    pub fn object_count(&self) -> usize {
        self.mirrored.len()
    }

    #[cfg(test)]
    pub fn get(&self, global_id: i32) -> Option<&SharedPose> {
        self.mirrored
            .iter()
            .find(|(id, _)| *id == global_id)
            .map(|(_, handle)| handle)
    }
}
