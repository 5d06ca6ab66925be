use crate::clients::{PaymentClient, ScanClient};
use crate::context::{ContextFactory, ContextRegistry};
use crate::identity::IdentityProvider;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub provider: IdentityProvider,
    pub registry: ContextRegistry,
    pub scan_client: ScanClient,
    pub payments: PaymentClient,
}

impl AppState {
    pub fn new(factory: ContextFactory) -> Self {
        Self {
            provider: factory.provider.clone(),
            scan_client: factory.scan_client.clone(),
            payments: factory.payments.clone(),
            registry: ContextRegistry::new(factory),
        }
    }
}
