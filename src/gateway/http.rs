//! HTTP push gateway client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::config::GatewayConfig;

use super::{GatewayError, PushGateway};

/// Client for a gateway management endpoint speaking
/// `POST {endpoint}/@connections/{connection_id}`.
pub struct HttpPushGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint_url.trim_end_matches('/').to_string(),
        })
    }

    fn connection_url(&self, connection_id: &str) -> String {
        format!("{}/@connections/{}", self.endpoint, connection_id)
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: &[u8],
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.connection_url(connection_id))
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::GONE {
            Err(GatewayError::Gone(connection_id.to_string()))
        } else {
            Err(GatewayError::Status {
                connection_id: connection_id.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
