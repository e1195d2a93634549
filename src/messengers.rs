//! Messengers: deliver outbox messages to the remote collector.
//!
//! A messenger never returns an error from `send_message`; every outcome is
//! encoded in the response status so the attempt is persisted and a failed
//! message stays eligible for retry. Sends carry an explicit timeout so a
//! hung endpoint cannot stall the messaging task.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ALLOW, CONTENT_TYPE};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use url::Url;

use crate::constants::DEFAULT_SEND_TIMEOUT_SECS;
use crate::data::{Message, Response, ResponseStatus};
use crate::error::{Error, Result};
use crate::types::Messenger;

/// Sends messages as HTTP POST requests.
pub struct HttpMessenger {
    client: reqwest::Client,
    base_url: Url,
    params: Vec<(String, String)>,
    headers: HeaderMap,
}

impl HttpMessenger {
    pub fn new(
        base_url: &str,
        params: Vec<(String, String)>,
        headers: Vec<(String, String)>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| Error::Config(format!("invalid base url '{base_url}': {err}")))?;

        let mut header_map = HeaderMap::new();
        for (name, value) in &headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::Config(format!("invalid header name '{name}': {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| Error::Config(format!("invalid header value: {err}")))?;
            header_map.insert(name, value);
        }
        let json = HeaderValue::from_static("application/json");
        if !header_map.contains_key(CONTENT_TYPE) {
            header_map.insert(CONTENT_TYPE, json.clone());
        }
        if !header_map.contains_key(ACCEPT) {
            header_map.insert(ACCEPT, json);
        }

        let timeout = timeout.unwrap_or(Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Config(format!("failed to build http client: {err}")))?;

        Ok(HttpMessenger {
            client,
            base_url,
            params,
            headers: header_map,
        })
    }

    async fn post(&self, message: &Message) -> Result<String> {
        let response = self
            .client
            .post(self.base_url.clone())
            .query(&self.params)
            .headers(self.headers.clone())
            .body(message.content.clone())
            .send()
            .await
            .map_err(|err| {
                let status = if err.is_timeout() {
                    ResponseStatus::Timeout
                } else {
                    ResponseStatus::Failed
                };
                Error::Delivery {
                    status,
                    reason: err.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(body)
        } else {
            Err(Error::Delivery {
                status: ResponseStatus::Error,
                reason: body,
            })
        }
    }
}

#[async_trait]
impl Messenger for HttpMessenger {
    async fn send_message(&self, message: &Message) -> Response {
        match self.post(message).await {
            Ok(body) => Response::new(message.clone(), ResponseStatus::Success, Some(body)),
            Err(Error::Delivery { status, reason }) => {
                log::warn!("http delivery of message {} failed: {reason}", message.id);
                Response::new(message.clone(), status, Some(reason))
            }
            Err(err) => {
                log::warn!("http delivery of message {} failed: {err}", message.id);
                Response::new(message.clone(), ResponseStatus::Failed, Some(err.to_string()))
            }
        }
    }

    async fn check(&self) -> Result<()> {
        let response = self
            .client
            .request(reqwest::Method::OPTIONS, self.base_url.clone())
            .send()
            .await
            .map_err(|err| {
                Error::HealthCheck(format!("unable to connect to {}: {err}", self.base_url))
            })?;

        if !response.status().is_success() {
            return Err(Error::HealthCheck(format!(
                "{} answered {}",
                self.base_url,
                response.status()
            )));
        }

        if let Some(allow) = response.headers().get(ALLOW) {
            let allow = allow.to_str().unwrap_or_default();
            if !allow.contains("POST") {
                return Err(Error::HealthCheck(format!(
                    "{} does not allow POST (Allow: {allow})",
                    self.base_url
                )));
            }
        }
        Ok(())
    }
}

/// Sends messages by publishing to an MQTT topic at QoS 1, waiting for the
/// broker's acknowledgement.
pub struct MqttMessenger {
    host: String,
    port: u16,
    topic: String,
    client_id: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl MqttMessenger {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        topic: impl Into<String>,
        client_id: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
        timeout: Option<Duration>,
    ) -> Self {
        MqttMessenger {
            host: host.into(),
            port,
            topic: topic.into(),
            client_id: client_id.into(),
            username,
            password,
            timeout: timeout.unwrap_or(Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS)),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(5));
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.clone().unwrap_or_default());
        }
        options
    }

    async fn publish(&self, message: &Message) -> Result<String> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), 10);
        client
            .publish(
                self.topic.clone(),
                QoS::AtLeastOnce,
                false,
                message.content.clone(),
            )
            .await
            .map_err(|err| Error::Delivery {
                status: ResponseStatus::Failed,
                reason: err.to_string(),
            })?;

        // The publish above only queues the packet; drive the event loop
        // until the broker acknowledges it or the timeout elapses.
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            let event = match tokio::time::timeout_at(deadline, eventloop.poll()).await {
                Err(_) => {
                    return Err(Error::Delivery {
                        status: ResponseStatus::Timeout,
                        reason: "no publish acknowledgement before timeout".into(),
                    })
                }
                Ok(Err(err)) => {
                    return Err(Error::Delivery {
                        status: ResponseStatus::Error,
                        reason: err.to_string(),
                    })
                }
                Ok(Ok(event)) => event,
            };
            if let Event::Incoming(Packet::PubAck(_)) = event {
                let _ = client.try_disconnect();
                return Ok("puback".into());
            }
        }
    }
}

#[async_trait]
impl Messenger for MqttMessenger {
    async fn send_message(&self, message: &Message) -> Response {
        match self.publish(message).await {
            Ok(ack) => Response::new(message.clone(), ResponseStatus::Success, Some(ack)),
            Err(Error::Delivery { status, reason }) => {
                log::warn!("mqtt delivery of message {} failed: {reason}", message.id);
                Response::new(message.clone(), status, Some(reason))
            }
            Err(err) => {
                log::warn!("mqtt delivery of message {} failed: {err}", message.id);
                Response::new(message.clone(), ResponseStatus::Failed, Some(err.to_string()))
            }
        }
    }

    async fn check(&self) -> Result<()> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), 10);
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            match tokio::time::timeout_at(deadline, eventloop.poll()).await {
                Err(_) => {
                    return Err(Error::HealthCheck(format!(
                        "no ConnAck from {}:{} before timeout",
                        self.host, self.port
                    )))
                }
                Ok(Err(err)) => {
                    return Err(Error::HealthCheck(format!(
                        "mqtt connection to {}:{} failed: {err}",
                        self.host, self.port
                    )))
                }
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    if ack.code != rumqttc::ConnectReturnCode::Success {
                        return Err(Error::HealthCheck(format!(
                            "mqtt broker refused connection: {:?}",
                            ack.code
                        )));
                    }
                    let _ = client.try_disconnect();
                    return Ok(());
                }
                Ok(Ok(_)) => continue,
            }
        }
    }
}
