pub mod config;
pub mod diff;
pub mod editor;
pub mod error;
pub mod logging;
pub mod render;
pub mod sentence;
pub mod surface;
pub mod theme;

#[cfg(test)]
mod test_support;

pub use editor::ReviewEditor;
pub use error::{Result, ReviewError};
