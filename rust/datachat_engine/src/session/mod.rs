//! Session Catalog Registry.
//!
//! Every conversation owns a private DataFusion `SessionContext`. Relations
//! are registered under a namespace derived from the session id, and only
//! that session's context can resolve it.

pub mod factory;
pub mod handle;
pub mod profiles;
pub mod registry;

pub use factory::{catalog_namespace, SessionFactory, DEFAULT_CATALOG};
pub use handle::SessionHandle;
pub use profiles::{EnvironmentClass, EnvironmentProfile};
pub use registry::SessionRegistry;
