//! Fossil-style binary deltas in Rust.
//!
//! A delta describes a TARGET buffer as a sequence of copies from a SOURCE
//! buffer and literal insertions, framed by the target length and a
//! checksum of the target. The crate provides:
//! - Rolling-hash block matching over an indexed source (`hash`)
//! - The wire format, its decoder and record inspection (`delta`)
//! - The public create / apply / output_size / analyze boundary (`engine`)
//! - Optional compression of finished deltas (`compress`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use fossil_delta::engine::{self, DeltaOptions};
//!
//! let source = b"hello old world, hello old world";
//! let target = b"hello new world, hello old world";
//!
//! let opts = DeltaOptions::default();
//! let delta = engine::create(source, target, &opts).unwrap();
//! assert_eq!(engine::output_size(&delta).unwrap() as usize, target.len());
//! assert_eq!(engine::apply(source, &delta, &opts).unwrap(), target);
//! ```

pub mod compress;
pub mod delta;
pub mod engine;
pub mod hash;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use delta::{DecodeError, DeltaStats};
pub use engine::{DeltaOptions, EncodeError, analyze, apply, apply_batch, create, output_size};
