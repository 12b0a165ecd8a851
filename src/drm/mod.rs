//! DRM/KMS display pipeline reset

pub mod device;
pub mod node;
pub mod object;
pub mod reset;

pub use device::Device;
pub use node::find_primary_node;
pub use reset::build_reset;
