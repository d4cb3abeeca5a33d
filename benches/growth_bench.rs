use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use gpu_objects::gpu::{
    binding::{BindingState, BufferTarget},
    buffer::{Buffer, GrowthPolicy},
    driver::{
        BufferId, FramebufferId, FramebufferTarget, MemoryDriver,
        RenderbufferId, SamplerId, TextureId, VertexArrayId,
    },
};

struct NoBindings;

impl BindingState for NoBindings {
    fn bind_buffer(&mut self, _: BufferTarget, _: BufferId) {}
    fn bind_texture_unit(&mut self, _: u32, _: TextureId) {}
    fn bind_sampler(&mut self, _: u32, _: SamplerId) {}
    fn bind_renderbuffer(&mut self, _: RenderbufferId) {}
    fn bind_framebuffer(&mut self, _: FramebufferTarget, _: FramebufferId) {}
    fn bind_vertex_array(&mut self, _: VertexArrayId) {}
    fn buffer_replaced(&mut self, _: BufferId, _: BufferId) {}
}

fn next_size_benchmark(c: &mut Criterion) {
    let policy = GrowthPolicy::default();
    let mut group = c.benchmark_group("next_size");

    for (current, requested) in [(64, 100), (100_000, 100_001), (1 << 30, 1 << 31)]
    {
        group.bench_function(format!("{current}->{requested}"), |b| {
            b.iter(|| {
                black_box(
                    policy.next_size(black_box(current), black_box(requested)),
                )
            });
        });
    }

    group.finish();
}

fn grow_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow_to_1mib");

    for fixed in [false, true] {
        let name = if fixed { "fixed" } else { "mutable" };
        group.bench_function(name, |b| {
            b.iter(|| {
                let driver = MemoryDriver::new();
                let mut bindings = NoBindings;
                let mut buffer = Buffer::new(&driver);
                let usage = wgpu::BufferUsages::STORAGE;
                let allocated = if fixed {
                    buffer.allocate_fixed_empty(&driver, 16, usage)
                } else {
                    buffer.allocate_mutable_empty(&driver, 16, usage)
                };
                if allocated.is_err() {
                    return;
                }
                let mut requested = 16;
                while requested < 1 << 20 {
                    requested += 4096;
                    let _ = buffer.grow(&driver, &mut bindings, requested);
                }
                let _ = black_box(buffer.size());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, next_size_benchmark, grow_benchmark);
criterion_main!(benches);
