pub mod cloud_provider;
pub mod patch_manifest;

pub use cloud_provider::CloudProviderAware;
pub use patch_manifest::PatchManifestTask;
