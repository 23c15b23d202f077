// Component wiring

use std::sync::Arc;

use crate::catalog::{CatalogService, StructureFetcher};
use crate::client::UpstreamClient;
use crate::config::Config;
use crate::error::Result;
use crate::invoke::{AuthenticatorExecutor, ServiceInvoker};
use crate::registry::{DynamicRegistry, Links};
use crate::store::ConfigStore;

/// All engine components sharing one store and one HTTP client
pub struct Engine {
	pub catalogs: CatalogService,
	pub authenticators: Arc<AuthenticatorExecutor>,
	pub invoker: Arc<ServiceInvoker>,
	pub registry: DynamicRegistry,
}

impl Engine {
	pub fn new(store: Arc<dyn ConfigStore>, config: &Config) -> Result<Self> {
		let client = UpstreamClient::new(&config.client)?;
		let links = Links::new(config.base_path.as_str());

		let authenticators = Arc::new(AuthenticatorExecutor::new(store.clone(), client.clone()));
		let invoker = Arc::new(ServiceInvoker::new(
			store.clone(),
			client.clone(),
			authenticators.clone(),
		));
		let registry = DynamicRegistry::new(store.clone(), invoker.clone(), links.clone());
		let catalogs = CatalogService::new(store, StructureFetcher::new(client), links);

		Ok(Self {
			catalogs,
			authenticators,
			invoker,
			registry,
		})
	}
}
