//! Window registry (C3) and resource cache (C4).

pub mod record;
pub mod registry;
pub mod resources;

pub use record::{Geometry, MapState, Mode, VisualClass, WindowRecord, WindowResources, WindowType};
pub use registry::{CirculatePlace, WindowRegistry};
