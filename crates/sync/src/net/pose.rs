use glam::{Quat, Vec3};

use crate::error::PoseError;

/// Encoded size: 3 position floats followed by 4 rotation floats, all LE.
pub const POSE_SIZE: usize = 7 * 4;

/// Component-wise tolerance used when deciding whether a pose moved.
pub const POSE_EPSILON: f32 = 1e-5;

/// Position and orientation of a tracked object.
///
/// `rotation` is expected to be a unit quaternion. Neither the codec nor the
/// registry renormalizes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// True when every component differs by at most `epsilon`.
    pub fn approx_eq(&self, other: &Pose, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && self.rotation.abs_diff_eq(other.rotation, epsilon)
    }

    pub fn encode(&self) -> [u8; POSE_SIZE] {
        let mut buf = [0u8; POSE_SIZE];
        let components = self
            .position
            .to_array()
            .into_iter()
            .chain(self.rotation.to_array());

        for (chunk, value) in buf.chunks_exact_mut(4).zip(components) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        buf
    }

    /// Decodes the first [`POSE_SIZE`] bytes of `data`. Trailing bytes are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, PoseError> {
        if data.len() < POSE_SIZE {
            return Err(PoseError::TooShort {
                expected: POSE_SIZE,
                actual: data.len(),
            });
        }

        let mut values = [0f32; 7];
        for (value, chunk) in values.iter_mut().zip(data[..POSE_SIZE].chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(PoseError::NotFinite);
        }

        Ok(Self {
            position: Vec3::new(values[0], values[1], values[2]),
            rotation: Quat::from_xyzw(values[3], values[4], values[5], values[6]),
        })
    }
}
