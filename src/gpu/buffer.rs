//! GPU buffers with amortized growth.
//!
//! A [`Buffer`] is allocated in one of two mutually exclusive modes:
//!
//! - **fixed** storage ([`Buffer::allocate_fixed`]) can never be
//!   re-specified. Growing it creates a new buffer name, copies the old
//!   contents across and reports the replacement through
//!   [`BindingState::buffer_replaced`].
//! - **mutable** storage ([`Buffer::allocate_mutable`]) is re-specified in
//!   place. Growing it round-trips the contents through a temporary buffer
//!   and keeps the same name.
//!
//! Writes never grow the buffer implicitly; call [`Buffer::grow`] first.

use std::fmt;

use super::{
    binding::{BindingState, BufferTarget},
    driver::{BufferId, Driver},
};
use crate::options::BufferOptions;

/// Default boundary between doubling and 1.25x growth.
pub const DEFAULT_SMALL_BUFFER_THRESHOLD: usize = 16_384;

/// Errors raised by buffer preconditions. The buffer is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The buffer already has fixed storage.
    AlreadyImmutable(BufferId),
    /// A ranged write asked for more bytes than were supplied.
    RangeExceedsData {
        /// Bytes requested.
        size: usize,
        /// Bytes supplied.
        available: usize,
    },
    /// An indexed write whose byte offset does not fit in `usize`.
    OffsetOverflow {
        /// Element index.
        index: usize,
        /// Size of one element in bytes.
        element_size: usize,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyImmutable(id) => {
                write!(f, "{id} already has fixed storage")
            }
            Self::RangeExceedsData { size, available } => write!(
                f,
                "write of {size} bytes requested but only {available} supplied"
            ),
            Self::OffsetOverflow {
                index,
                element_size,
            } => write!(
                f,
                "element {index} of size {element_size} overflows the offset"
            ),
        }
    }
}

impl std::error::Error for BufferError {}

/// Growth policy: double small buffers, grow large ones by 1.25x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPolicy {
    /// Buffers smaller than this double; larger ones grow by 1.25x.
    pub small_buffer_threshold: usize,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            small_buffer_threshold: DEFAULT_SMALL_BUFFER_THRESHOLD,
        }
    }
}

impl From<&BufferOptions> for GrowthPolicy {
    fn from(options: &BufferOptions) -> Self {
        Self {
            small_buffer_threshold: options.small_buffer_threshold,
        }
    }
}

impl GrowthPolicy {
    /// Size a buffer of `current` bytes grows to when `requested` bytes are
    /// needed, or `None` when `requested < current`.
    ///
    /// Requests beyond twice the current size are honored exactly. Small
    /// buffers double; large buffers grow by 1.25x until they cover the
    /// request, falling back to the exact request on overflow.
    #[must_use]
    pub fn next_size(&self, current: usize, requested: usize) -> Option<usize> {
        if requested < current {
            return None;
        }
        if requested > current.saturating_mul(2) {
            return Some(requested);
        }
        if current < self.small_buffer_threshold {
            return Some(current.checked_mul(2).unwrap_or(requested));
        }
        let mut size = current;
        while size < requested {
            match size.checked_add(size / 4) {
                Some(next) if next > size => size = next,
                _ => return Some(requested),
            }
        }
        Some(size)
    }
}

/// A GPU buffer that owns its driver name.
///
/// Not `Clone`: exactly one value owns each name. Release it with
/// [`Buffer::destroy`].
#[derive(Debug)]
pub struct Buffer {
    id: BufferId,
    size: usize,
    flags: wgpu::BufferUsages,
    immutable: bool,
    policy: GrowthPolicy,
}

impl Buffer {
    /// Create an unallocated buffer with the default growth policy.
    pub fn new(driver: &impl Driver) -> Self {
        Self::with_policy(driver, GrowthPolicy::default())
    }

    /// Create an unallocated buffer with a custom growth policy.
    pub fn with_policy(driver: &impl Driver, policy: GrowthPolicy) -> Self {
        Self {
            id: driver.create_buffer(),
            size: 0,
            flags: wgpu::BufferUsages::empty(),
            immutable: false,
            policy,
        }
    }

    /// Current driver name. Changes when fixed storage grows.
    #[must_use]
    pub const fn id(&self) -> BufferId {
        self.id
    }

    /// Allocation size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Usage flags of the last allocation.
    #[must_use]
    pub const fn flags(&self) -> wgpu::BufferUsages {
        self.flags
    }

    /// Whether the buffer has fixed storage.
    #[must_use]
    pub const fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Allocate fixed storage initialized from `data`.
    ///
    /// # Errors
    ///
    /// [`BufferError::AlreadyImmutable`] if fixed storage already exists.
    pub fn allocate_fixed<T: bytemuck::Pod>(
        &mut self,
        driver: &impl Driver,
        data: &[T],
        flags: wgpu::BufferUsages,
    ) -> Result<(), BufferError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.allocate(driver, bytes.len(), Some(bytes), flags, true)
    }

    /// Allocate `size` bytes of zeroed fixed storage.
    ///
    /// # Errors
    ///
    /// [`BufferError::AlreadyImmutable`] if fixed storage already exists.
    pub fn allocate_fixed_empty(
        &mut self,
        driver: &impl Driver,
        size: usize,
        flags: wgpu::BufferUsages,
    ) -> Result<(), BufferError> {
        self.allocate(driver, size, None, flags, true)
    }

    /// Allocate resizable storage initialized from `data`.
    ///
    /// # Errors
    ///
    /// [`BufferError::AlreadyImmutable`] if fixed storage already exists.
    pub fn allocate_mutable<T: bytemuck::Pod>(
        &mut self,
        driver: &impl Driver,
        data: &[T],
        usage: wgpu::BufferUsages,
    ) -> Result<(), BufferError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.allocate(driver, bytes.len(), Some(bytes), usage, false)
    }

    /// Allocate `size` bytes of zeroed resizable storage.
    ///
    /// # Errors
    ///
    /// [`BufferError::AlreadyImmutable`] if fixed storage already exists.
    pub fn allocate_mutable_empty(
        &mut self,
        driver: &impl Driver,
        size: usize,
        usage: wgpu::BufferUsages,
    ) -> Result<(), BufferError> {
        self.allocate(driver, size, None, usage, false)
    }

    fn allocate(
        &mut self,
        driver: &impl Driver,
        size: usize,
        data: Option<&[u8]>,
        flags: wgpu::BufferUsages,
        fixed: bool,
    ) -> Result<(), BufferError> {
        if self.immutable {
            log::error!("{}: allocation after fixed storage", self.id);
            return Err(BufferError::AlreadyImmutable(self.id));
        }
        if fixed {
            driver.buffer_storage(self.id, size, data, flags);
        } else {
            driver.buffer_data(self.id, size, data, flags);
        }
        log::debug!(
            "{}: allocated {size} bytes ({})",
            self.id,
            if fixed { "fixed" } else { "mutable" }
        );
        self.size = size;
        self.flags = flags;
        self.immutable = fixed;
        Ok(())
    }

    /// Overwrite bytes starting at byte `offset` with `data`.
    ///
    /// Range checking against [`Buffer::size`] is left to the driver.
    pub fn write<T: bytemuck::Pod>(
        &self,
        driver: &impl Driver,
        offset: usize,
        data: &[T],
    ) {
        driver.buffer_sub_data(self.id, offset, bytemuck::cast_slice(data));
    }

    /// Overwrite `size` bytes starting at `offset` with the first `size`
    /// bytes of `data`.
    ///
    /// # Errors
    ///
    /// [`BufferError::RangeExceedsData`] if `data` holds fewer than `size`
    /// bytes.
    pub fn write_range<T: bytemuck::Pod>(
        &self,
        driver: &impl Driver,
        offset: usize,
        size: usize,
        data: &[T],
    ) -> Result<(), BufferError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let Some(bytes) = bytes.get(..size) else {
            return Err(BufferError::RangeExceedsData {
                size,
                available: bytes.len(),
            });
        };
        driver.buffer_sub_data(self.id, offset, bytes);
        Ok(())
    }

    /// Overwrite element `index` of a buffer viewed as an array of `T`.
    ///
    /// # Errors
    ///
    /// [`BufferError::OffsetOverflow`] if the byte offset overflows.
    pub fn write_indexed<T: bytemuck::Pod>(
        &self,
        driver: &impl Driver,
        index: usize,
        element: &T,
    ) -> Result<(), BufferError> {
        let element_size = size_of::<T>();
        let offset = index.checked_mul(element_size).ok_or(
            BufferError::OffsetOverflow {
                index,
                element_size,
            },
        )?;
        driver.buffer_sub_data(
            self.id,
            offset,
            bytemuck::bytes_of(element),
        );
        Ok(())
    }

    /// Grow to hold at least `requested` bytes, preserving contents.
    ///
    /// Returns `false` without touching anything when `requested` is below
    /// the current size. Fixed storage is replaced by a new buffer name,
    /// reported through `bindings`; mutable storage keeps its name.
    pub fn grow(
        &mut self,
        driver: &impl Driver,
        bindings: &mut impl BindingState,
        requested: usize,
    ) -> bool {
        let Some(new_size) = self.policy.next_size(self.size, requested) else {
            return false;
        };
        let old_size = self.size;

        if self.immutable {
            let replacement = driver.create_buffer();
            driver.buffer_storage(replacement, new_size, None, self.flags);
            if old_size > 0 {
                driver.copy_buffer_sub_data(
                    self.id,
                    replacement,
                    0,
                    0,
                    old_size,
                );
            }
            driver.delete_buffer(self.id);
            bindings.buffer_replaced(self.id, replacement);
            log::debug!(
                "{} grew {old_size} -> {new_size} bytes as {replacement}",
                self.id
            );
            self.id = replacement;
        } else {
            if old_size > 0 {
                let scratch = driver.create_buffer();
                driver.buffer_data(
                    scratch,
                    old_size,
                    None,
                    wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
                );
                driver.copy_buffer_sub_data(self.id, scratch, 0, 0, old_size);
                driver.buffer_data(self.id, new_size, None, self.flags);
                driver.copy_buffer_sub_data(scratch, self.id, 0, 0, old_size);
                driver.delete_buffer(scratch);
            } else {
                driver.buffer_data(self.id, new_size, None, self.flags);
            }
            log::debug!("{} grew {old_size} -> {new_size} bytes", self.id);
        }

        self.size = new_size;
        true
    }

    /// Bind to `target` through the binding state.
    pub fn bind(&self, bindings: &mut impl BindingState, target: BufferTarget) {
        bindings.bind_buffer(target, self.id);
    }

    /// Release the driver name.
    pub fn destroy(self, driver: &impl Driver) {
        driver.delete_buffer(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{
        binding::recording::{Call, RecordingBindings},
        driver::MemoryDriver,
    };

    const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::VERTEX;

    #[test]
    fn growth_sizes() {
        let policy = GrowthPolicy::default();
        assert_eq!(policy.next_size(8192, 9000), Some(16384));
        assert_eq!(policy.next_size(20000, 50000), Some(50000));
        assert_eq!(policy.next_size(20000, 22000), Some(25000));
        assert_eq!(policy.next_size(20000, 19999), None);
    }

    #[test]
    fn large_growth_repeats_until_covered() {
        let policy = GrowthPolicy::default();
        // 20000 -> 25000 -> 31250 -> 39062
        assert_eq!(policy.next_size(20000, 39000), Some(39062));
    }

    #[test]
    fn growth_falls_back_to_request_on_overflow() {
        let policy = GrowthPolicy::default();
        let current = usize::MAX / 2 + 1;
        assert_eq!(policy.next_size(current, usize::MAX), Some(usize::MAX));
    }

    #[test]
    fn doubling_falls_back_to_request_on_overflow() {
        let policy = GrowthPolicy {
            small_buffer_threshold: usize::MAX,
        };
        let current = usize::MAX / 2 + 1;
        assert_eq!(policy.next_size(current, usize::MAX), Some(usize::MAX));
        assert_eq!(policy.next_size(current, current + 1), Some(current + 1));
    }

    #[test]
    fn zero_threshold_never_stalls() {
        let policy = GrowthPolicy {
            small_buffer_threshold: 0,
        };
        assert_eq!(policy.next_size(0, 0), Some(0));
        assert_eq!(policy.next_size(3, 4), Some(4));
    }

    #[test]
    fn growth_is_monotonic() {
        let policy = GrowthPolicy::default();
        let mut size = 16;
        for requested in (0..200_000).step_by(997) {
            if let Some(next) = policy.next_size(size, requested) {
                assert!(next >= size);
                assert!(next >= requested);
                size = next;
            }
        }
    }

    #[test]
    fn second_allocation_after_fixed_is_rejected() {
        let driver = MemoryDriver::new();
        let mut buffer = Buffer::new(&driver);
        buffer.allocate_fixed(&driver, &[1u8, 2, 3, 4], USAGE).unwrap();

        assert_eq!(
            buffer.allocate_fixed_empty(&driver, 64, USAGE),
            Err(BufferError::AlreadyImmutable(buffer.id()))
        );
        assert_eq!(
            buffer.allocate_mutable(&driver, &[0u32; 8], USAGE),
            Err(BufferError::AlreadyImmutable(buffer.id()))
        );
        assert_eq!(buffer.size(), 4);
        assert_eq!(driver.buffer_contents(buffer.id()), Some(vec![1, 2, 3, 4]));
        assert!(driver.take_errors().is_empty());
    }

    #[test]
    fn mutable_storage_can_be_respecified() {
        let driver = MemoryDriver::new();
        let mut buffer = Buffer::new(&driver);
        buffer.allocate_mutable_empty(&driver, 8, USAGE).unwrap();
        buffer.allocate_mutable(&driver, &[7u16; 3], USAGE).unwrap();
        assert_eq!(buffer.size(), 6);
        buffer.allocate_fixed_empty(&driver, 12, USAGE).unwrap();
        assert!(buffer.is_immutable());
        assert_eq!(driver.is_buffer_immutable(buffer.id()), Some(true));
    }

    #[test]
    fn grow_below_size_is_a_no_op() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let mut buffer = Buffer::new(&driver);
        buffer.allocate_fixed(&driver, &[9u8; 32], USAGE).unwrap();
        let id = buffer.id();

        assert!(!buffer.grow(&driver, &mut bindings, 31));
        assert_eq!(buffer.id(), id);
        assert_eq!(buffer.size(), 32);
        assert_eq!(driver.buffer_contents(id), Some(vec![9; 32]));
        assert!(bindings.calls.is_empty());
    }

    #[test]
    fn fixed_growth_replaces_the_name() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let mut buffer = Buffer::new(&driver);
        let data: Vec<u8> = (0..100).collect();
        buffer.allocate_fixed(&driver, &data, USAGE).unwrap();
        let old = buffer.id();

        assert!(buffer.grow(&driver, &mut bindings, 150));
        assert_ne!(buffer.id(), old);
        assert_eq!(buffer.size(), 200);
        assert_eq!(bindings.calls, vec![Call::Replaced(old, buffer.id())]);

        let contents = driver.buffer_contents(buffer.id()).unwrap();
        assert_eq!(contents.len(), 200);
        assert_eq!(&contents[..100], data.as_slice());
        assert_eq!(driver.buffer_contents(old), None);
        assert_eq!(driver.is_buffer_immutable(buffer.id()), Some(true));
        assert_eq!(driver.buffer_usage(buffer.id()), Some(USAGE));
        assert_eq!(driver.live_buffers(), 1);
        assert!(driver.take_errors().is_empty());
    }

    #[test]
    fn mutable_growth_keeps_the_name() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let mut buffer = Buffer::new(&driver);
        let data: Vec<u32> = (0..10).collect();
        buffer.allocate_mutable(&driver, &data, USAGE).unwrap();
        let id = buffer.id();

        assert!(buffer.grow(&driver, &mut bindings, 1000));
        assert_eq!(buffer.id(), id);
        assert_eq!(buffer.size(), 1000);
        assert!(bindings.calls.is_empty());

        let contents = driver.buffer_contents(id).unwrap();
        assert_eq!(&contents[..40], bytemuck::cast_slice::<u32, u8>(&data));
        assert!(contents[40..].iter().all(|&b| b == 0));
        assert_eq!(driver.live_buffers(), 1);
        assert!(driver.take_errors().is_empty());
    }

    #[test]
    fn growing_an_unallocated_buffer() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let mut buffer = Buffer::new(&driver);
        assert!(buffer.grow(&driver, &mut bindings, 48));
        assert_eq!(buffer.size(), 48);
        assert_eq!(driver.buffer_contents(buffer.id()), Some(vec![0; 48]));
        assert!(driver.take_errors().is_empty());
    }

    #[test]
    fn repeated_growth_preserves_prefix() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let mut buffer = Buffer::new(&driver);
        buffer.allocate_fixed(&driver, &[0xABu8; 16], USAGE).unwrap();
        let mut last = buffer.size();
        for requested in [20, 40, 100, 500, 17_000, 17_001] {
            assert!(buffer.grow(&driver, &mut bindings, requested));
            assert!(buffer.size() >= last && buffer.size() >= requested);
            last = buffer.size();
        }
        let contents = driver.buffer_contents(buffer.id()).unwrap();
        assert_eq!(contents.len(), buffer.size());
        assert_eq!(&contents[..16], &[0xAB; 16]);
    }

    #[test]
    fn writes_land_at_byte_offsets() {
        let driver = MemoryDriver::new();
        let mut buffer = Buffer::new(&driver);
        buffer.allocate_mutable_empty(&driver, 16, USAGE).unwrap();
        buffer.write(&driver, 4, &[1u16, 2]);
        buffer.write_indexed(&driver, 3, &0xFFFF_FFFFu32).unwrap();
        assert_eq!(
            driver.buffer_contents(buffer.id()),
            Some(vec![0, 0, 0, 0, 1, 0, 2, 0, 0, 0, 0, 0, 255, 255, 255, 255])
        );
    }

    #[test]
    fn write_range_uses_a_prefix_of_the_data() {
        let driver = MemoryDriver::new();
        let mut buffer = Buffer::new(&driver);
        buffer.allocate_mutable_empty(&driver, 4, USAGE).unwrap();
        buffer.write_range(&driver, 1, 2, &[5u8, 6, 7]).unwrap();
        assert_eq!(driver.buffer_contents(buffer.id()), Some(vec![0, 5, 6, 0]));

        assert_eq!(
            buffer.write_range(&driver, 0, 4, &[1u8, 2, 3]),
            Err(BufferError::RangeExceedsData {
                size: 4,
                available: 3,
            })
        );
        assert_eq!(driver.buffer_contents(buffer.id()), Some(vec![0, 5, 6, 0]));
    }

    #[test]
    fn indexed_write_offset_overflow() {
        let driver = MemoryDriver::new();
        let buffer = Buffer::new(&driver);
        assert_eq!(
            buffer.write_indexed(&driver, usize::MAX, &1u32),
            Err(BufferError::OffsetOverflow {
                index: usize::MAX,
                element_size: 4,
            })
        );
    }

    #[test]
    fn out_of_range_writes_are_left_to_the_driver() {
        let driver = MemoryDriver::new();
        let mut buffer = Buffer::new(&driver);
        buffer.allocate_mutable_empty(&driver, 4, USAGE).unwrap();
        buffer.write(&driver, 2, &[1u32]);
        assert_eq!(driver.take_errors().len(), 1);
        assert_eq!(driver.buffer_contents(buffer.id()), Some(vec![0; 4]));
    }

    #[test]
    fn bind_and_destroy() {
        let driver = MemoryDriver::new();
        let mut bindings = RecordingBindings::default();
        let buffer = Buffer::new(&driver);
        buffer.bind(&mut bindings, BufferTarget::Uniform);
        assert_eq!(
            bindings.calls,
            vec![Call::Buffer(BufferTarget::Uniform, buffer.id())]
        );
        buffer.destroy(&driver);
        assert_eq!(driver.live_buffers(), 0);
    }

    #[test]
    fn policy_from_options() {
        let options = BufferOptions {
            small_buffer_threshold: 64,
        };
        let policy = GrowthPolicy::from(&options);
        assert_eq!(policy.next_size(64, 70), Some(80));
    }
}
