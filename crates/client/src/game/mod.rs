use glam::{Quat, Vec3};

use posesync::{Pose, SharedPose};

const ORBIT_RADIUS: f32 = 2.0;
const ORBIT_SPEED: f32 = 1.2;

/// Scene objects the demo host animates. Placed objects get fixed global
/// ids; spawned ones go through provisional registration.
pub struct DemoScene {
    placed: Vec<(i32, SharedPose)>,
    spawned: Vec<SharedPose>,
}

impl DemoScene {
    pub fn new(objects: usize) -> Self {
        let placed = (0..objects)
            .map(|i| {
                let position = Vec3::new(0.0, 1.0, i as f32 * 3.0);
                (i as i32, SharedPose::new(Pose::from_position(position)))
            })
            .collect();

        Self {
            placed,
            spawned: Vec::new(),
        }
    }

    pub fn placed(&self) -> impl Iterator<Item = (i32, &SharedPose)> {
        self.placed.iter().map(|(id, pose)| (*id, pose))
    }

    /// Creates a new object at `position` and returns a handle for the registry.
    pub fn spawn(&mut self, position: Vec3) -> SharedPose {
        let handle = SharedPose::new(Pose::from_position(position));
        self.spawned.push(handle.clone());
        handle
    }

    pub fn spawned_count(&self) -> usize {
        self.spawned.len()
    }

    /// Even-indexed placed objects orbit; spawned objects spin in place.
    pub fn animate(&mut self, time: f32) {
        for (id, handle) in self.placed.iter().filter(|(id, _)| id % 2 == 0) {
            let angle = time * ORBIT_SPEED + *id as f32;
            let base_z = *id as f32 * 3.0;
            handle.update(|pose| {
                pose.position.x = angle.cos() * ORBIT_RADIUS;
                pose.position.z = base_z + angle.sin() * ORBIT_RADIUS;
                pose.rotation = Quat::from_rotation_y(-angle);
            });
        }

        for handle in &self.spawned {
            handle.update(|pose| pose.rotation = Quat::from_rotation_y(time));
        }
    }
}
