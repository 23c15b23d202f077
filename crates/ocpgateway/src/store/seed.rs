// Seed file loading for the config store

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ConfigStore;
use crate::error::{Error, Result};
use crate::types::{AuthenticatorDefinition, ServiceDefinition, StoredCatalog};

/// Configuration records loaded at startup. Accepts JSON or YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Seed {
	#[serde(default)]
	pub authenticators: Vec<AuthenticatorDefinition>,
	#[serde(default)]
	pub services: Vec<ServiceDefinition>,
	#[serde(default)]
	pub catalogs: Vec<StoredCatalog>,
}

impl Seed {
	pub fn parse(contents: &str) -> Result<Self> {
		// YAML is a superset of JSON
		serde_yaml::from_str(contents).map_err(|e| Error::BadRequest(format!("invalid seed file: {e}")))
	}

	pub async fn load(path: &Path) -> Result<Self> {
		info!(target: "catalog", "Loading seed from file: {}", path.display());
		let contents = fs_err::tokio::read_to_string(path)
			.await
			.map_err(|e| Error::BadRequest(format!("failed to read seed file: {e}")))?;
		Self::parse(&contents)
	}

	/// Write every record into the store, replacing existing ids.
	pub async fn apply(self, store: &dyn ConfigStore) -> Result<()> {
		let (auths, services, catalogs) = (
			self.authenticators.len(),
			self.services.len(),
			self.catalogs.len(),
		);
		for authenticator in self.authenticators {
			store.put_authenticator(authenticator).await?;
		}
		for service in self.services {
			store.put_service(service).await?;
		}
		for catalog in self.catalogs {
			store.put_catalog(catalog).await?;
		}
		info!(
			target: "catalog",
			authenticators = auths,
			services,
			catalogs,
			"seed applied"
		);
		Ok(())
	}
}
