//! Engine implementations
//!
//! - Image engine (in-process decode, pixel transform, PNG encode)
//! - Command engine (pipes each file through an external program)

pub mod command;
pub mod local;

// Test utilities for engine testing
#[cfg(test)]
pub mod test_utils;

pub use self::command::{CommandEngine, CommandEngineFactory};
pub use self::local::{
    EngineAssets, IdentityTransform, ImageEngine, ImageEngineFactory, PixelTransform,
};
