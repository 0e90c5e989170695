//! [`MessageSink`] that writes to a stream through its REST proxy.
//!
//! Speaks the Kafka REST Proxy v2 JSON-embedded format:
//!
//! ```text
//! POST {rest_url}/topics/{topic}
//! Content-Type: application/vnd.kafka.json.v2+json
//!
//! {"records":[{"key":"<event id>","value":<snapshot>}]}
//! ```
//!
//! The proxy answers once the broker has acknowledged the batch, with one
//! offset entry per record.

use super::publisher::{Delivery, MessageSink, PublishError};
use crate::config::StreamConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use url::Url;

const CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";
const ACCEPT: &str = "application/vnd.kafka.v2+json";

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: [ProduceRecord<'a>; 1],
}

#[derive(Serialize)]
struct ProduceRecord<'a> {
    key: &'a str,
    value: &'a RawValue,
}

#[derive(Debug, Deserialize)]
struct ProduceResponse {
    #[serde(default)]
    offsets: Vec<RecordOffset>,
}

#[derive(Debug, Deserialize)]
struct RecordOffset {
    partition: Option<i32>,
    offset: Option<i64>,
    error_code: Option<i32>,
    error: Option<String>,
}

pub struct RestProxySink {
    http_client: reqwest::Client,
    endpoint: Url,
}

impl RestProxySink {
    pub fn new(config: &StreamConfig) -> Result<Self, url::ParseError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.publish_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(http_client, config)
    }

    pub fn with_client(
        http_client: reqwest::Client,
        config: &StreamConfig,
    ) -> Result<Self, url::ParseError> {
        let mut endpoint = config.rest_url.clone();
        if !endpoint.path().ends_with('/') {
            endpoint.set_path(&format!("{}/", endpoint.path()));
        }
        let endpoint = endpoint.join(&format!("topics/{}", config.topic))?;
        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl MessageSink for RestProxySink {
    async fn send(&self, key: &str, payload: &str) -> Result<Delivery, PublishError> {
        let value = RawValue::from_string(payload.to_string())?;
        let body = serde_json::to_vec(&ProduceRequest {
            records: [ProduceRecord { key, value: &value }],
        })?;

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let ack: ProduceResponse = response.json().await?;
        let Some(record) = ack.offsets.into_iter().next() else {
            return Err(PublishError::RecordFailed {
                code: -1,
                message: "acknowledgment carried no offsets".to_string(),
            });
        };

        match (record.error_code, record.partition, record.offset) {
            (None, Some(partition), Some(offset)) => Ok(Delivery { partition, offset }),
            (code, _, _) => Err(PublishError::RecordFailed {
                code: code.unwrap_or(-1),
                message: record.error.unwrap_or_else(|| "record not acknowledged".to_string()),
            }),
        }
    }
}
