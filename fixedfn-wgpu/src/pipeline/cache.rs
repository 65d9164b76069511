//! Pipeline cache management

use hashbrown::HashMap;

use super::bind_groups::{create_frame_bind_group_layout, create_texture_bind_group_layout};
use super::creation::create_pipeline;
use super::key::PipelineKey;

/// Compiled pipelines keyed by the fixed-function state they bake in.
///
/// Every pipeline shares one shader module and one pipeline layout, so bind
/// groups built from [`frame_layout`](Self::frame_layout) and
/// [`texture_layout`](Self::texture_layout) work with all of them.
pub struct PipelineCache {
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    shader_module: wgpu::ShaderModule,
    frame_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    target_format: wgpu::TextureFormat,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fixedfn shader"),
            source: wgpu::ShaderSource::Wgsl(crate::shader::SHADER_SOURCE.into()),
        });
        let frame_layout = create_frame_bind_group_layout(device);
        let texture_layout = create_texture_bind_group_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        Self {
            pipelines: HashMap::new(),
            shader_module,
            frame_layout,
            texture_layout,
            pipeline_layout,
            target_format,
        }
    }

    /// Get or create the pipeline for `key`
    pub fn get_or_create(&mut self, device: &wgpu::Device, key: PipelineKey) -> &wgpu::RenderPipeline {
        self.pipelines.entry(key).or_insert_with(|| {
            tracing::debug!("Creating pipeline: {:?}", key);
            create_pipeline(device, &self.pipeline_layout, &self.shader_module, self.target_format, &key)
        })
    }

    /// Cached pipeline for `key`, if created
    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub fn frame_layout(&self) -> &wgpu::BindGroupLayout {
        &self.frame_layout
    }

    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
