pub mod mask;
pub mod video;
