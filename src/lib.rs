// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Stateful handles over named GPU objects.
//!
//! Buffers that grow by amortized doubling while keeping their contents,
//! framebuffers that track what is attached at every attachment point and
//! report completeness as typed errors, and thin wrappers for textures,
//! samplers, renderbuffers and vertex arrays.
//!
//! # Key entry points
//!
//! - [`gpu::buffer::Buffer`] - fixed or mutable storage with `grow`
//! - [`gpu::framebuffer::Framebuffer`] - attachment table and status check
//! - [`gpu::driver::Driver`] - the named-object driver surface, implemented
//!   by [`gpu::driver::MemoryDriver`] and [`gpu::driver::WgpuDriver`]
//! - [`gpu::binding::BindingState`] - caller-owned binding cache
//! - [`options::Options`] - growth and attachment-table tunables
//!
//! Objects never bind themselves. Every bind goes through a
//! [`gpu::binding::BindingState`], which is also told when a fixed-storage
//! buffer changes name during growth.

pub mod error;
pub mod gpu;
pub mod options;
