//! Scene rendering: the coordinator and the pieces it drives.

pub mod coordinator;
pub mod frame;
pub mod interaction;
pub mod scene;
pub mod style;
pub mod sync;
pub mod text;
pub mod viewport;

pub use coordinator::{RenderCoordinator, RenderError};
pub use interaction::InteractionManager;
pub use scene::{ElementId, ElementKind, RetainedScene, Scene};
pub use style::{d_ratio, NodeStyle, NodeUiAttributes};
pub use text::{EguiTextMeasure, FixedAdvanceMeasure, TextMeasure};
pub use viewport::Viewport;
