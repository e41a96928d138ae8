mod descriptor;
mod loader;

pub use descriptor::{ImageDescriptor, ResourceSet};
pub use loader::{GROUP_PRIORITY_STRIDE, InputGroup, load_images};
