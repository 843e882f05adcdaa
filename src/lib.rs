//! Incremental visualization of a graph that is still being downloaded.
//!
//! A [`render::RenderCoordinator`] owns one render cycle at a time: it adds a
//! visual node for every graph node as it streams in, steps the layout once
//! per refresh, and once the layout converges draws the links and turns
//! pointer input into [`events::UiEvent`]s for the host.

pub mod events;
pub mod graph;
pub mod layout;
pub mod progress;
pub mod render;
pub mod settings;
