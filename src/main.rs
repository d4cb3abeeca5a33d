use gpu_objects::{
    error::GpuObjectsError,
    gpu::{
        attachment::Attachment,
        binding::{BindingState, BufferTarget},
        buffer::{Buffer, GrowthPolicy},
        driver::{
            BufferId, FramebufferId, FramebufferTarget,
            RenderbufferId, SamplerId, TextureId, TextureKind, VertexArrayId,
            WgpuDriver,
        },
        framebuffer::Framebuffer,
        renderbuffer::Renderbuffer,
        texture::Texture,
    },
    options::Options,
};

/// Binding state that only logs what it is asked to do.
#[derive(Default)]
struct LoggedBindings {
    array_buffer: Option<BufferId>,
}

impl BindingState for LoggedBindings {
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        if target == BufferTarget::Array {
            self.array_buffer = Some(buffer);
        }
        log::debug!("bind {buffer} to {target:?}");
    }

    fn bind_texture_unit(&mut self, unit: u32, texture: TextureId) {
        log::debug!("bind {texture} to unit {unit}");
    }

    fn bind_sampler(&mut self, unit: u32, sampler: SamplerId) {
        log::debug!("bind {sampler} to unit {unit}");
    }

    fn bind_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        log::debug!("bind {renderbuffer}");
    }

    fn bind_framebuffer(
        &mut self,
        target: FramebufferTarget,
        framebuffer: FramebufferId,
    ) {
        log::debug!("bind {framebuffer} to {target:?}");
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        log::debug!("bind {vertex_array}");
    }

    fn buffer_replaced(&mut self, old: BufferId, new: BufferId) {
        if self.array_buffer == Some(old) {
            self.array_buffer = Some(new);
        }
        log::info!("{old} replaced by {new}");
    }
}

fn grow_both_paths(
    driver: &WgpuDriver,
    options: &Options,
    bindings: &mut LoggedBindings,
) -> Result<(), GpuObjectsError> {
    let policy = GrowthPolicy::from(&options.buffer);
    let seed: Vec<u32> = (0..64).collect();

    let mut fixed = Buffer::with_policy(driver, policy);
    fixed.allocate_fixed(
        driver,
        &seed,
        wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    )?;
    fixed.bind(bindings, BufferTarget::Array);

    let mut mutable = Buffer::with_policy(driver, policy);
    mutable.allocate_mutable(driver, &seed, wgpu::BufferUsages::STORAGE)?;

    for requested in [300, 1_000, 40_000] {
        let fixed_grew = fixed.grow(driver, bindings, requested);
        let mutable_grew = mutable.grow(driver, bindings, requested);
        log::info!(
            "requested {requested}: fixed {} bytes ({fixed_grew}), \
             mutable {} bytes ({mutable_grew})",
            fixed.size(),
            mutable.size()
        );
    }

    fixed.destroy(driver);
    mutable.destroy(driver);
    Ok(())
}

fn build_framebuffer(
    driver: &WgpuDriver,
    options: &Options,
) -> Result<(), GpuObjectsError> {
    let mut color = Texture::new(driver, TextureKind::D2);
    color.allocate(driver, 1, wgpu::TextureFormat::Rgba8Unorm, 256, 256, 1);
    let mut depth = Renderbuffer::new(driver);
    depth.allocate(driver, wgpu::TextureFormat::Depth24Plus, 256, 256);

    let mut framebuffer = Framebuffer::with_options(driver, &options.framebuffer);
    framebuffer.attach_texture(driver, Attachment::Color(0), color.id())?;
    framebuffer.attach_renderbuffer(driver, Attachment::Depth, depth.id())?;
    framebuffer.set_draw_targets(driver, &[0]);

    let status = framebuffer.check_status(driver, FramebufferTarget::Draw);
    match &status {
        Ok(()) => log::info!("{} is complete", framebuffer.id()),
        Err(e) => log::error!("{} is incomplete: {e}", framebuffer.id()),
    }

    framebuffer.destroy(driver);
    depth.destroy(driver);
    color.destroy(driver);
    status.map_err(GpuObjectsError::from)
}

fn run() -> Result<(), GpuObjectsError> {
    let options = match std::env::args().nth(1) {
        Some(path) => Options::load(path.as_ref())?,
        None => Options::default(),
    };
    let driver = pollster::block_on(WgpuDriver::headless())?;
    let mut bindings = LoggedBindings::default();

    grow_both_paths(&driver, &options, &mut bindings)?;
    build_framebuffer(&driver, &options)?;
    let _ = driver.device().poll(wgpu::PollType::Poll);
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
