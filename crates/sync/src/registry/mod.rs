mod object;
mod table;

pub use object::{Identity, NetworkedObject, PoseSource, SharedPose};
pub use table::{ObjectRegistry, PoseChange};
