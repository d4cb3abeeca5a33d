//! Sampler objects.

use super::{
    binding::BindingState,
    driver::{Driver, SamplerId, SamplerParameter},
};

/// A sampler that owns its driver name.
///
/// Setters taking `Option`s leave `None` parameters untouched.
#[derive(Debug)]
pub struct Sampler {
    id: SamplerId,
}

impl Sampler {
    /// Create a sampler with default state.
    pub fn new(driver: &impl Driver) -> Self {
        Self {
            id: driver.create_sampler(),
        }
    }

    /// Driver name.
    #[must_use]
    pub const fn id(&self) -> SamplerId {
        self.id
    }

    /// Set the minification and magnification filters.
    pub fn filter_mode(
        &self,
        driver: &impl Driver,
        min: Option<wgpu::FilterMode>,
        mag: Option<wgpu::FilterMode>,
    ) {
        if let Some(min) = min {
            driver.sampler_parameter(self.id, SamplerParameter::MinFilter(min));
        }
        if let Some(mag) = mag {
            driver.sampler_parameter(self.id, SamplerParameter::MagFilter(mag));
        }
    }

    /// Set the filter used between mip levels.
    pub fn mipmap_filter(&self, driver: &impl Driver, mode: wgpu::FilterMode) {
        driver.sampler_parameter(self.id, SamplerParameter::MipmapFilter(mode));
    }

    /// Set the wrap modes along s, t and r.
    pub fn wrap_mode(
        &self,
        driver: &impl Driver,
        s: Option<wgpu::AddressMode>,
        t: Option<wgpu::AddressMode>,
        r: Option<wgpu::AddressMode>,
    ) {
        let updates = [
            s.map(SamplerParameter::WrapS),
            t.map(SamplerParameter::WrapT),
            r.map(SamplerParameter::WrapR),
        ];
        for parameter in updates.into_iter().flatten() {
            driver.sampler_parameter(self.id, parameter);
        }
    }

    /// Enable depth comparison with `function`, or disable it with `None`.
    pub fn compare_mode(
        &self,
        driver: &impl Driver,
        function: Option<wgpu::CompareFunction>,
    ) {
        driver.sampler_parameter(self.id, SamplerParameter::Compare(function));
    }

    /// Set the clamp-to-border color.
    pub fn border_color(&self, driver: &impl Driver, color: glam::Vec4) {
        driver.sampler_parameter(
            self.id,
            SamplerParameter::BorderColor(color.to_array()),
        );
    }

    /// Bind to texture unit `unit`.
    pub fn bind(&self, bindings: &mut impl BindingState, unit: u32) {
        bindings.bind_sampler(unit, self.id);
    }

    /// Release the driver name.
    pub fn destroy(self, driver: &impl Driver) {
        driver.delete_sampler(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{
        binding::recording::{Call, RecordingBindings},
        driver::{MemoryDriver, SamplerState},
    };

    #[test]
    fn none_leaves_parameters_untouched() {
        let driver = MemoryDriver::new();
        let sampler = Sampler::new(&driver);
        sampler.filter_mode(&driver, None, Some(wgpu::FilterMode::Nearest));
        sampler.wrap_mode(
            &driver,
            Some(wgpu::AddressMode::ClampToEdge),
            None,
            Some(wgpu::AddressMode::MirrorRepeat),
        );

        let state = driver.sampler_state(sampler.id()).unwrap();
        let defaults = SamplerState::default();
        assert_eq!(state.min_filter, defaults.min_filter);
        assert_eq!(state.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(
            state.wrap,
            [
                wgpu::AddressMode::ClampToEdge,
                defaults.wrap[1],
                wgpu::AddressMode::MirrorRepeat,
            ]
        );
    }

    #[test]
    fn comparison_and_border() {
        let driver = MemoryDriver::new();
        let sampler = Sampler::new(&driver);
        sampler.compare_mode(&driver, Some(wgpu::CompareFunction::LessEqual));
        sampler.border_color(&driver, glam::Vec4::new(1.0, 1.0, 1.0, 1.0));
        sampler.mipmap_filter(&driver, wgpu::FilterMode::Nearest);

        let state = driver.sampler_state(sampler.id()).unwrap();
        assert_eq!(state.compare, Some(wgpu::CompareFunction::LessEqual));
        assert_eq!(
            state.wgpu_border_color(),
            wgpu::SamplerBorderColor::OpaqueWhite
        );
        assert_eq!(state.mipmap_filter, wgpu::FilterMode::Nearest);

        sampler.compare_mode(&driver, None);
        assert_eq!(driver.sampler_state(sampler.id()).unwrap().compare, None);
    }

    #[test]
    fn bind_to_unit() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let sampler = Sampler::new(&driver);
        sampler.bind(&mut bindings, 5);
        assert_eq!(bindings.calls, vec![Call::Sampler(5, sampler.id())]);
        let id = sampler.id();
        sampler.destroy(&driver);
        assert_eq!(driver.sampler_state(id), None);
    }
}
