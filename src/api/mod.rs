mod handlers;
mod health;
mod models;
mod routes;

pub use handlers::{broadcast, connect, disconnect, send};
pub use models::{BroadcastResponse, ConnectEvent, RequestContext, SendEvent, TriggerResponse};
pub use routes::api_routes;
