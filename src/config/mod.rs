mod settings;

pub use settings::{
    BroadcastConfig, GatewayConfig, RegistryConfig, ServerConfig, Settings,
};
