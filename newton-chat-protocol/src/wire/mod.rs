//! Comm wire types.
//!
//! Every payload is a JSON object with an `operation` discriminator and an
//! `instance` address. The module is organized by direction:
//! - [`client`]: requests the client sends to the kernel
//! - [`kernel`]: messages the kernel sends to the client

pub mod client;
pub mod kernel;

pub use client::{ClientRequest, ConfigMode};
pub use kernel::{
    AutoCompleteItem, AutoCompleteResponse, InstanceState, KernelError, KernelMessage,
    KernelOperation, LoaderForm, SyncMeta,
};

/// Sentinel instance addressing the loader/instance registry.
pub const META_INSTANCE: &str = "<meta>";
/// Sentinel instance addressing every chat instance at once.
pub const ALL_INSTANCES: &str = "<all>";

/// Whether `name` is reserved for the registry or broadcast layer.
pub fn is_sentinel(name: &str) -> bool {
    name == META_INSTANCE || name == ALL_INSTANCES
}
