use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::gpu::buffer::DEFAULT_SMALL_BUFFER_THRESHOLD;

/// Growth tuning for [`Buffer`](crate::gpu::buffer::Buffer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Buffers", inline)]
#[serde(default)]
pub struct BufferOptions {
    /// Sizes below this many bytes double on growth; larger sizes grow by
    /// a quarter per step.
    #[schemars(title = "Small Buffer Threshold", range(min = 1))]
    pub small_buffer_threshold: usize,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            small_buffer_threshold: DEFAULT_SMALL_BUFFER_THRESHOLD,
        }
    }
}
