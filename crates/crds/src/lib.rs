//! Boot service CRD definitions
//!
//! Kubernetes Custom Resource Definitions consumed by the boot script service.

pub mod boot_configuration;
pub mod node;

pub use boot_configuration::*;
pub use node::*;
