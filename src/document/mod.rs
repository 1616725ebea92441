//! Document model modules and their registry

mod error;
mod registry;

pub use error::{RegistryError, Result};
pub use registry::{DocumentModelModule, DocumentModelRegistry};
