// Configuration store
//
// The engine reads authenticators, services and catalogs through
// [`ConfigStore`] by opaque string id. Persistence is left to implementors;
// [`MemoryStore`] backs tests and the standalone binary.

use async_trait::async_trait;

use crate::types::{AuthenticatorDefinition, ServiceDefinition, StoredCatalog};

mod memory;
mod seed;

pub use memory::MemoryStore;
pub use seed::Seed;

/// Error type for ConfigStore operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("serialization error: {0}")]
	Serialization(String),
	#[error("storage error: {0}")]
	Storage(String),
}

/// Async access to configuration records.
///
/// Lookups return `Ok(None)` for unknown ids; callers decide whether that is
/// a not-found error.
#[async_trait]
pub trait ConfigStore: Send + Sync {
	async fn authenticator(&self, id: &str) -> Result<Option<AuthenticatorDefinition>, StoreError>;

	async fn service(&self, id: &str) -> Result<Option<ServiceDefinition>, StoreError>;

	async fn catalog(&self, id: &str) -> Result<Option<StoredCatalog>, StoreError>;

	/// All catalogs, optionally restricted to one scope.
	async fn catalogs(&self, scope: Option<&str>) -> Result<Vec<StoredCatalog>, StoreError>;

	/// Insert or replace a catalog. Last write wins.
	async fn put_catalog(&self, catalog: StoredCatalog) -> Result<(), StoreError>;

	/// Returns whether a catalog was removed.
	async fn delete_catalog(&self, id: &str) -> Result<bool, StoreError>;

	async fn put_service(&self, service: ServiceDefinition) -> Result<(), StoreError>;

	async fn put_authenticator(&self, authenticator: AuthenticatorDefinition) -> Result<(), StoreError>;
}
