//! Tunables for buffers and framebuffers with TOML file support.
//!
//! Every section uses `#[serde(default)]`, so a file that only overrides
//! `[buffer]` leaves the framebuffer settings at their defaults.

mod buffer;
mod framebuffer;

use std::path::Path;

pub use buffer::BufferOptions;
pub use framebuffer::FramebufferOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::GpuObjectsError;

/// Top-level options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Buffer growth tuning.
    pub buffer: BufferOptions,
    /// Framebuffer attachment table layout.
    pub framebuffer: FramebufferOptions,
}

impl Options {
    /// Generate JSON Schema describing the options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, GpuObjectsError> {
        let content =
            std::fs::read_to_string(path).map_err(GpuObjectsError::Io)?;
        toml::from_str(&content)
            .map_err(|e| GpuObjectsError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), GpuObjectsError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GpuObjectsError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(GpuObjectsError::Io)?;
        }
        std::fs::write(path, content).map_err(GpuObjectsError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[framebuffer]
exclusive_slots = true
";
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert!(opts.framebuffer.exclusive_slots);
        assert_eq!(opts.framebuffer.max_color_attachments, 8);
        assert_eq!(opts.buffer.small_buffer_threshold, 16_384);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = std::env::temp_dir()
            .join(format!("gpu-objects-options-{}", std::process::id()));
        let path = dir.join("bad.toml");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[buffer]\nsmall_buffer_threshold = \"big\"\n")
            .unwrap();

        let err = Options::load(&path).unwrap_err();
        assert!(matches!(err, GpuObjectsError::OptionsParse(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir()
            .join(format!("gpu-objects-save-{}", std::process::id()));
        let path = dir.join("nested").join("options.toml");
        let mut opts = Options::default();
        opts.buffer.small_buffer_threshold = 4096;
        opts.framebuffer.max_color_attachments = 4;

        opts.save(&path).unwrap();
        assert_eq!(Options::load(&path).unwrap(), opts);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Options::load(Path::new("/nonexistent/options.toml"))
            .unwrap_err();
        assert!(matches!(err, GpuObjectsError::Io(_)));
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("buffer"));
        assert!(props.contains_key("framebuffer"));

        let framebuffer = &props["framebuffer"]["properties"];
        assert!(framebuffer.get("max_color_attachments").is_some());
        assert!(framebuffer.get("exclusive_slots").is_some());
        assert!(props["buffer"]["properties"]
            .get("small_buffer_threshold")
            .is_some());
    }
}
