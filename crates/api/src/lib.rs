//! Lookup of video metadata from the Bilibili web API.
//!
//! A download directory is named after the numeric AV identifier of the
//! video it contains. This crate turns one such [`Identifier`] into a
//! classified [`Status`]: either the video's title and publish date, or the
//! error code the remote service answered with.
//!
//! The network is hidden behind the [`Lookup`] trait. [`ViewClient`] is the
//! real implementation; anything else implementing the trait (scripted test
//! stubs, for example) can be handed to the resolver instead.

mod client;
pub mod error;
pub mod models;

pub use crate::client::{ClientOptions, Lookup, ViewClient};
pub use crate::models::{Identifier, RECOGNIZED_CODES, Status, VideoInfo};
