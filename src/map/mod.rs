pub mod compositor;
pub mod layer;
pub mod transform;
pub mod view;

pub use compositor::{Canvas, Overlay, Scene, render};
pub use layer::{RobotMap, decode_map};
pub use transform::{BoundingBox, ViewTransform, compute_bounding_box};
pub use view::MapViewState;
