//!
//! # Image field
//!
//! A bounded set of user supplied images, persisted across restarts, transformed (quality and
//! orientation) by a background worker and mirrored in a foreground state that UI code renders
//! and dispatches actions into.
//!
//! The moving parts, leaves first:
//! - [`validation`]: decides whether an image is acceptable;
//! - [`store`]: durable key-value persistence and the per-field slot repository;
//! - [`worker`]: the retrieval and modification workers;
//! - [`state`]: the foreground state and its pure reducer;
//! - [`field`]: the coordinator gluing all of the above together.

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod codec;
pub mod config;
pub mod field;
pub mod form;
pub mod logging;
pub mod slot;
pub mod state;
pub mod store;
pub mod validation;
pub mod worker;

mod error;

pub use error::{Error, ErrorKind, InvariantViolation, Result, ValidationError};

pub use field::{ImageField, ImageFieldBuilder};
pub use imf_actors::WorkerId;
