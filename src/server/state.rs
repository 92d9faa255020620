use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::Broadcaster;
use crate::config::Settings;
use crate::gateway::{HttpPushGateway, PushGateway};
use crate::registrar::ConnectionRegistrar;
use crate::registry::{create_registry, ConnectionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub registrar: Arc<ConnectionRegistrar>,
    pub broadcaster: Arc<Broadcaster>,
    pub started_at: Instant,
}

impl AppState {
    /// Build state with the configured backends (Redis registry and HTTP
    /// gateway in production).
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let registry = create_registry(&settings.registry).await?;
        let gateway: Arc<dyn PushGateway> = Arc::new(HttpPushGateway::new(&settings.gateway)?);
        Self::with_backends(settings, registry, gateway)
    }

    /// Build state around injected backends. This is the seam tests use to
    /// swap in an in-memory registry or a scripted gateway.
    pub fn with_backends(
        settings: Settings,
        registry: Arc<dyn ConnectionRegistry>,
        gateway: Arc<dyn PushGateway>,
    ) -> anyhow::Result<Self> {
        let registrar = Arc::new(ConnectionRegistrar::new(registry.clone()));
        let broadcaster = Arc::new(Broadcaster::new(
            registry.clone(),
            gateway,
            &settings.broadcast,
        )?);

        Ok(Self {
            settings: Arc::new(settings),
            registry,
            registrar,
            broadcaster,
            started_at: Instant::now(),
        })
    }
}
