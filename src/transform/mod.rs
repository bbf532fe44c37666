pub mod selection;
pub mod viewport;

pub use selection::SelectionBox;
pub use viewport::{Viewport, ViewportKey, ViewportRegistry};
