//! Document model registry
//!
//! Maps document-type identifiers to their model modules. The registry is
//! an explicit, constructible object; callers that need isolation (tests,
//! embedded reactors) create their own instance instead of sharing ambient
//! global state.

use super::error::{RegistryError, Result};
use crate::history::Action;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// The capability a document type brings to the core: a reducer validating
/// and applying one action to document state. Business reducers live
/// outside this crate; the trait is the seam they plug into.
pub trait DocumentModelModule: Send + Sync {
	/// Stable document-type identifier, e.g. `"powerhouse/todo-list"`.
	fn document_type(&self) -> &str;

	/// Apply one action to the document state in place.
	fn apply(&self, state: &mut serde_json::Value, action: &Action) -> Result<()>;
}

#[derive(Default)]
pub struct DocumentModelRegistry {
	modules: RwLock<HashMap<String, Arc<dyn DocumentModelModule>>>,
}

impl DocumentModelRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register modules one by one, validating each before insertion.
	///
	/// The first duplicate aborts before later modules are added, so a
	/// failed call can leave earlier modules registered. Callers should
	/// treat partial registration as possible and re-check.
	pub fn register_modules(
		&self,
		modules: impl IntoIterator<Item = Arc<dyn DocumentModelModule>>,
	) -> Result<()> {
		let mut loaded = self
			.modules
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner());

		for module in modules {
			let document_type = module.document_type().trim();
			if document_type.is_empty() {
				return Err(RegistryError::InvalidModule(
					"module has an empty document type".to_string(),
				));
			}
			if loaded.contains_key(document_type) {
				return Err(RegistryError::DuplicateModule(document_type.to_string()));
			}
			debug!(document_type, "registered document model module");
			loaded.insert(document_type.to_string(), module);
		}

		Ok(())
	}

	/// Remove modules by document type. Returns `false` if any requested
	/// type was not found; types that are found are still removed.
	pub fn unregister_modules<S: AsRef<str>>(&self, document_types: &[S]) -> bool {
		let mut loaded = self
			.modules
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner());

		let mut all_found = true;
		for document_type in document_types {
			if loaded.remove(document_type.as_ref()).is_none() {
				all_found = false;
			}
		}
		all_found
	}

	pub fn get_module(&self, document_type: &str) -> Result<Arc<dyn DocumentModelModule>> {
		self.modules
			.read()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.get(document_type)
			.cloned()
			.ok_or_else(|| RegistryError::ModuleNotFound(document_type.to_string()))
	}

	/// Currently loaded modules only; no lazy resolution.
	pub fn get_all_modules(&self) -> Vec<Arc<dyn DocumentModelModule>> {
		self.modules
			.read()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.values()
			.cloned()
			.collect()
	}

	pub fn contains(&self, document_type: &str) -> bool {
		self.modules
			.read()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.contains_key(document_type)
	}

	/// Reset to empty. Used between test runs and at reactor teardown.
	pub fn clear(&self) {
		self.modules
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct TestModule {
		document_type: String,
	}

	impl TestModule {
		fn new(document_type: &str) -> Arc<dyn DocumentModelModule> {
			Arc::new(Self {
				document_type: document_type.to_string(),
			})
		}
	}

	impl DocumentModelModule for TestModule {
		fn document_type(&self) -> &str {
			&self.document_type
		}

		fn apply(&self, state: &mut serde_json::Value, action: &Action) -> Result<()> {
			state[&action.kind] = action.input.clone();
			Ok(())
		}
	}

	#[test]
	fn registers_and_resolves_modules() {
		let registry = DocumentModelRegistry::new();
		registry
			.register_modules([TestModule::new("test/a"), TestModule::new("test/b")])
			.unwrap();

		assert_eq!(registry.get_module("test/a").unwrap().document_type(), "test/a");
		assert_eq!(registry.get_all_modules().len(), 2);
	}

	#[test]
	fn duplicate_registration_fails() {
		let registry = DocumentModelRegistry::new();
		registry.register_modules([TestModule::new("test/a")]).unwrap();

		let err = registry
			.register_modules([TestModule::new("test/a")])
			.unwrap_err();
		assert!(matches!(err, RegistryError::DuplicateModule(t) if t == "test/a"));
	}

	#[test]
	fn duplicate_mid_slice_keeps_earlier_modules() {
		let registry = DocumentModelRegistry::new();
		let err = registry
			.register_modules([
				TestModule::new("test/a"),
				TestModule::new("test/a"),
				TestModule::new("test/b"),
			])
			.unwrap_err();

		assert!(matches!(err, RegistryError::DuplicateModule(_)));
		assert!(registry.contains("test/a"));
		assert!(!registry.contains("test/b"));
	}

	#[test]
	fn empty_document_type_is_invalid() {
		let registry = DocumentModelRegistry::new();
		let err = registry
			.register_modules([TestModule::new("  ")])
			.unwrap_err();
		assert!(matches!(err, RegistryError::InvalidModule(_)));
	}

	#[test]
	fn missing_module_fails_lookup() {
		let registry = DocumentModelRegistry::new();
		let err = registry
			.get_module("test/missing")
			.map(|module| module.document_type().to_string())
			.unwrap_err();
		assert!(matches!(err, RegistryError::ModuleNotFound(t) if t == "test/missing"));
	}

	#[test]
	fn unregister_removes_found_types_and_reports_missing() {
		let registry = DocumentModelRegistry::new();
		registry
			.register_modules([TestModule::new("test/a"), TestModule::new("test/b")])
			.unwrap();

		assert!(!registry.unregister_modules(&["test/a", "test/missing"]));
		assert!(!registry.contains("test/a"));
		assert!(registry.contains("test/b"));

		assert!(registry.unregister_modules(&["test/b"]));
	}

	#[test]
	fn clear_resets_to_empty() {
		let registry = DocumentModelRegistry::new();
		registry.register_modules([TestModule::new("test/a")]).unwrap();
		registry.clear();
		assert!(registry.get_all_modules().is_empty());
	}
}
