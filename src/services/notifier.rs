//! Best-effort SMS alerts for ledger transactions.

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::SmsConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("SMS gateway error: {status} - {message}")]
    GatewayError { status: StatusCode, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Contribution,
    ClaimApproved,
    ClaimDeclined,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Contribution => f.write_str("Contribution"),
            TransactionKind::ClaimApproved => f.write_str("Claim approval"),
            TransactionKind::ClaimDeclined => f.write_str("Claim decline"),
        }
    }
}

pub fn transaction_message(amount: Decimal, kind: TransactionKind) -> String {
    format!("Transaction Alert: {} of R{:.2} completed.", kind, amount)
}

/// Client for an Africa's Talking compatible messaging endpoint.
#[derive(Clone)]
pub struct SmsClient {
    client: Client,
    api_url: String,
    username: String,
    api_key: Secret<String>,
    sender_id: Option<String>,
}

impl SmsClient {
    pub fn new(config: &SmsConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            username: config.username.clone(),
            api_key: config.api_key.clone(),
            sender_id: config.sender_id.clone(),
        })
    }

    pub async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError> {
        let mut form = vec![
            ("username", self.username.as_str()),
            ("to", to),
            ("message", message),
        ];
        if let Some(sender_id) = &self.sender_id {
            form.push(("from", sender_id.as_str()));
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("apiKey", self.api_key.expose_secret())
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(NotifyError::GatewayError { status, message })
    }
}

/// Dispatches transaction alerts without blocking or failing the caller.
#[derive(Clone)]
pub enum Notifier {
    Sms(SmsClient),
    /// SMS not configured; alerts are only logged.
    Disabled,
}

impl Notifier {
    pub fn from_config(config: Option<&SmsConfig>) -> Self {
        let Some(config) = config else {
            tracing::info!("SMS notifications disabled");
            return Notifier::Disabled;
        };

        match SmsClient::new(config) {
            Ok(client) => Notifier::Sms(client),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build SMS client, notifications disabled");
                Notifier::Disabled
            }
        }
    }

    /// Sends an alert and waits for the outcome. Failures are logged, never
    /// returned.
    pub async fn deliver(&self, phone: &str, amount: Decimal, kind: TransactionKind) {
        let message = transaction_message(amount, kind);
        match self {
            Notifier::Sms(client) => match client.send(phone, &message).await {
                Ok(()) => tracing::debug!(%kind, "Transaction alert sent"),
                Err(e) => tracing::warn!(error = %e, %kind, "Transaction alert failed"),
            },
            Notifier::Disabled => tracing::debug!(%kind, %message, "Transaction alert skipped"),
        }
    }

    /// Fire-and-forget variant of [`Notifier::deliver`].
    pub fn notify(&self, phone: &str, amount: Decimal, kind: TransactionKind) {
        if phone.trim().is_empty() {
            return;
        }

        let notifier = self.clone();
        let phone = phone.to_string();
        tokio::spawn(async move {
            notifier.deliver(&phone, amount, kind).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sms_config(server: &MockServer) -> SmsConfig {
        SmsConfig {
            username: "sandbox".to_string(),
            api_key: Secret::new("test-key".to_string()),
            api_url: format!("{}/version1/messaging", server.uri()),
            sender_id: None,
        }
    }

    #[test]
    fn test_message_format() {
        assert_eq!(
            transaction_message(Decimal::new(5000, 2), TransactionKind::Contribution),
            "Transaction Alert: Contribution of R50.00 completed."
        );
        assert_eq!(
            transaction_message(Decimal::new(200, 0), TransactionKind::ClaimApproved),
            "Transaction Alert: Claim approval of R200.00 completed."
        );
    }

    #[tokio::test]
    async fn test_sms_client_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/version1/messaging"))
            .and(header("apiKey", "test-key"))
            .and(body_string_contains("username=sandbox"))
            .and(body_string_contains("to=0821234567"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = SmsClient::new(&sms_config(&server)).unwrap();
        client.send("0821234567", "hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_gateway_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = SmsClient::new(&sms_config(&server)).unwrap();
        let err = client.send("0821234567", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            NotifyError::GatewayError { status, .. } if status == StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn test_deliver_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::from_config(Some(&sms_config(&server)));
        notifier
            .deliver("0821234567", Decimal::new(100, 0), TransactionKind::ClaimDeclined)
            .await;
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_noop() {
        Notifier::Disabled
            .deliver("0821234567", Decimal::ONE, TransactionKind::Contribution)
            .await;
        Notifier::Disabled.notify("", Decimal::ONE, TransactionKind::Contribution);
    }
}
