//! Provider descriptors, the registry that maps keys to them, and the
//! field-set slot a host form mounts them into.
//!
//! Modules:
//! - `descriptor`: the plugin contract every provider implements
//! - `registry`: key lookup, instantiation and failure downgrading
//! - `mount`: the single-instance field-set slot of a host form
//! - `builtin`: providers shipped with the crate

pub mod builtin;
mod descriptor;
mod mount;
mod registry;

pub use descriptor::{
    ConstructionProps, DescriptorError, Deps, FieldKind, FieldNode, FieldSet, ProviderDescriptor, ProviderInfo, RenderProps,
};
pub use mount::{FieldSetInstance, FieldSetMount};
pub use registry::{InstantiateOptions, ProviderRegistry, RegistryError};
