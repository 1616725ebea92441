//! Registry errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
	/// A module for this document type is already registered
	#[error("document model module already registered for type '{0}'")]
	DuplicateModule(String),

	/// No module registered for the requested document type
	#[error("no document model module registered for type '{0}'")]
	ModuleNotFound(String),

	/// The module failed shape validation at registration time
	#[error("invalid document model module: {0}")]
	InvalidModule(String),

	/// A module rejected an action during apply
	#[error("failed to apply action '{action}': {message}")]
	ApplyFailed { action: String, message: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
