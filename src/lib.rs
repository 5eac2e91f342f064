pub mod api;
pub mod core;
pub mod pipeline;

pub use crate::core::mask::{ColorMaskClassifier, HueRange, MaskConfig, StructuringElement};
pub use crate::core::video::{ColorFrame, MaskFrame, PixelOrder};
pub use crate::pipeline::{FramePipeline, PipelineConfig, PipelineError, RunReport};

/// 初始化日志，默认 info 级别，可通过 RUST_LOG 覆盖。重复调用无副作用。
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .try_init();
}
