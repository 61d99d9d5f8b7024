//! Providers shipped with the engine.
//!
//! Adding a provider is one line in [`BUILTIN_PROVIDERS`]; keep the table
//! ASCII-sorted by key.

pub mod aliyun_cdn;
pub mod local;
pub mod ssh;
pub mod telegram;
pub mod webhook;

use std::sync::Arc;

use super::ProviderDescriptor;

pub(crate) type DescriptorFactory = fn() -> Arc<dyn ProviderDescriptor>;

pub(crate) const BUILTIN_PROVIDERS: &[DescriptorFactory] = &[
    aliyun_cdn::descriptor,
    local::descriptor,
    ssh::descriptor,
    telegram::descriptor,
    webhook::descriptor,
];

pub use aliyun_cdn::AliyunCdnProvider;
pub use local::LocalProvider;
pub use ssh::SshProvider;
pub use telegram::TelegramProvider;
pub use webhook::WebhookProvider;
