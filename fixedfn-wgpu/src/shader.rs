//! WGSL source for every fixed-function pipeline

/// The single shader module shared by all pipelines (`vs` / `fs`)
pub const SHADER_SOURCE: &str = include_str!("shaders/fixedfn.wgsl");
