//! Supporting services shared by engines, the coordinator and frontends

pub mod format;
pub mod render;

pub use format::OutputFormatHandler;
pub use render::{
    ConsoleRenderSink, NoOpRenderSink, RecordingRenderSink, RenderEvent, RenderSink,
};
