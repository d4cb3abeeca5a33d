use std::ops::Range;

use rustc_hash::FxHashMap;

use super::pipeline;

const BLIT_WGSL: &str = r"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var pos = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 3.0, -1.0),
        vec2<f32>(-1.0,  3.0),
    );
    var out: VertexOutput;
    out.position = vec4<f32>(pos[index], 0.0, 1.0);
    out.uv = pos[index] * 0.5 + 0.5;
    out.uv.y = 1.0 - out.uv.y;
    return out;
}

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(source, source_sampler, in.uv);
}
";

/// Downsampling blit that fills mip levels from the level above.
///
/// Every layer is rendered as a separate 2D view, so arrays and cube maps
/// share the same pipeline as plain 2D textures.
pub(super) struct MipmapGenerator {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    shader: wgpu::ShaderModule,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl MipmapGenerator {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mipmap Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_WGSL.into()),
        });
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Mipmap Layout"),
                entries: &[
                    pipeline::texture_2d(0),
                    pipeline::filtering_sampler(1),
                ],
            });
        let sampler = pipeline::linear_sampler(device, "Mipmap Sampler");
        Self {
            layout,
            sampler,
            shader,
            pipelines: FxHashMap::default(),
        }
    }

    /// Fill `levels.start + 1 .. levels.end` of every layer in `layers`.
    pub(super) fn generate(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
        format: wgpu::TextureFormat,
        levels: Range<u32>,
        layers: Range<u32>,
    ) {
        if levels.len() < 2 {
            return;
        }
        let layout = &self.layout;
        let shader = &self.shader;
        let pipeline = self.pipelines.entry(format).or_insert_with(|| {
            pipeline::create_screen_space_pipeline(
                device,
                &format!("Mipmap {format:?}"),
                shader,
                format,
                &[layout],
            )
        });

        for layer in layers {
            for level in levels.start..levels.end - 1 {
                let view = |mip: u32, usage: wgpu::TextureUsages| {
                    texture.create_view(&wgpu::TextureViewDescriptor {
                        label: Some("Mipmap Level"),
                        format: Some(format),
                        dimension: Some(wgpu::TextureViewDimension::D2),
                        usage: Some(usage),
                        aspect: wgpu::TextureAspect::All,
                        base_mip_level: mip,
                        mip_level_count: Some(1),
                        base_array_layer: layer,
                        array_layer_count: Some(1),
                    })
                };
                let src = view(level, wgpu::TextureUsages::TEXTURE_BINDING);
                let dst =
                    view(level + 1, wgpu::TextureUsages::RENDER_ATTACHMENT);
                let bind_group =
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("Mipmap Bind Group"),
                        layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: wgpu::BindingResource::TextureView(
                                    &src,
                                ),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: wgpu::BindingResource::Sampler(
                                    &self.sampler,
                                ),
                            },
                        ],
                    });

                let mut pass =
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Mipmap Pass"),
                        color_attachments: &[Some(
                            wgpu::RenderPassColorAttachment {
                                view: &dst,
                                depth_slice: None,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(
                                        wgpu::Color::TRANSPARENT,
                                    ),
                                    store: wgpu::StoreOp::Store,
                                },
                            },
                        )],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }
    }
}
