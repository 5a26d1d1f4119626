pub mod components;
mod render;
pub mod state;
pub mod util;

/// A trait for UI components that enforces a standard rendering interface.
pub use render::Component;
/// Renders a complete frame for the selected tab.
pub use render::render;
