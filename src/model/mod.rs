//! # Platform Resource Models
//!
//! Plain data for every resource kind the workspace platform hosts, plus the specs
//! sent to create or replace them. Hosting behavior lives in [`crate::platform`].

pub mod app_image_config;
pub mod domain;
pub mod identity;
pub mod image;
pub mod storage;
pub mod user_profile;

pub use app_image_config::*;
pub use domain::*;
pub use identity::*;
pub use image::*;
pub use storage::*;
pub use user_profile::*;

use std::collections::BTreeMap;

/// Key/value tags applied to taggable resources.
pub type Tags = BTreeMap<String, String>;
