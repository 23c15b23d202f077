//! In-memory implementation of ConfigStore.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ConfigStore, StoreError};
use crate::types::{AuthenticatorDefinition, ServiceDefinition, StoredCatalog};

/// In-memory implementation of ConfigStore.
///
/// Suitable for tests and single-instance deployments seeded from a file.
#[derive(Default)]
pub struct MemoryStore {
	authenticators: RwLock<HashMap<String, AuthenticatorDefinition>>,
	services: RwLock<HashMap<String, ServiceDefinition>>,
	catalogs: RwLock<HashMap<String, StoredCatalog>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored catalogs.
	pub fn catalog_count(&self) -> usize {
		self.catalogs.read().len()
	}
}

#[async_trait]
impl ConfigStore for MemoryStore {
	async fn authenticator(&self, id: &str) -> Result<Option<AuthenticatorDefinition>, StoreError> {
		Ok(self.authenticators.read().get(id).cloned())
	}

	async fn service(&self, id: &str) -> Result<Option<ServiceDefinition>, StoreError> {
		Ok(self.services.read().get(id).cloned())
	}

	async fn catalog(&self, id: &str) -> Result<Option<StoredCatalog>, StoreError> {
		Ok(self.catalogs.read().get(id).cloned())
	}

	async fn catalogs(&self, scope: Option<&str>) -> Result<Vec<StoredCatalog>, StoreError> {
		let catalogs = self.catalogs.read();
		Ok(
			catalogs
				.values()
				.filter(|c| scope.is_none_or(|s| c.scope == s))
				.cloned()
				.collect(),
		)
	}

	async fn put_catalog(&self, catalog: StoredCatalog) -> Result<(), StoreError> {
		self.catalogs.write().insert(catalog.id.clone(), catalog);
		Ok(())
	}

	async fn delete_catalog(&self, id: &str) -> Result<bool, StoreError> {
		Ok(self.catalogs.write().remove(id).is_some())
	}

	async fn put_service(&self, service: ServiceDefinition) -> Result<(), StoreError> {
		self.services.write().insert(service.id.clone(), service);
		Ok(())
	}

	async fn put_authenticator(&self, authenticator: AuthenticatorDefinition) -> Result<(), StoreError> {
		self
			.authenticators
			.write()
			.insert(authenticator.id.clone(), authenticator);
		Ok(())
	}
}
