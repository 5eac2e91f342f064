use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaskError {
    #[error("Invalid input frame: {0}")]
    InvalidInput(String),
    #[error("At least one hue range is required")]
    EmptyRanges,
    #[error("Invalid structuring element size {width}x{height}")]
    InvalidKernel { width: u32, height: u32 },
}
