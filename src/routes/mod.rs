//! Route table
//!
//! - [`normalize`] - path normalization shared by every entry point
//! - [`registry`] - normalized path to [`RouteDescriptor`](crate::types::RouteDescriptor)
//! - [`source`] - declarative navigation entries and the module naming convention

pub mod normalize;
pub mod registry;
pub mod source;

pub use normalize::{is_page_file, module_name_for, PathNormalizer};
pub use registry::RouteRegistry;
pub use source::{derive_routes, NavEntry, RouteConvention, RouteSource};
