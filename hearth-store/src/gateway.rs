use async_trait::async_trait;
use hearth_core::payment::{ChargeOutcome, ChargeRequest, GatewayError, PaymentGateway};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::PaymentConfig;

#[derive(Debug, thiserror::Error)]
pub enum GatewaySetupError {
    #[error("payment.{0} is required in live mode")]
    Missing(&'static str),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Live card processor reached over HTTPS.
pub struct HttpCardGateway {
    client: reqwest::Client,
    endpoint: String,
    login_id: String,
    transaction_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeBody<'a> {
    merchant: Merchant<'a>,
    amount: String,
    currency: &'a str,
    card: CardBody<'a>,
    description: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Merchant<'a> {
    login_id: &'a str,
    transaction_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CardBody<'a> {
    number: &'a str,
    expiration_date: &'a str,
    cvv: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderResponse {
    approved: bool,
    transaction_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpCardGateway {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, GatewaySetupError> {
        let endpoint = config.api_url.clone().ok_or(GatewaySetupError::Missing("api_url"))?;
        let login_id = config
            .api_login_id
            .clone()
            .ok_or(GatewaySetupError::Missing("api_login_id"))?;
        let transaction_key = config
            .transaction_key
            .clone()
            .ok_or(GatewaySetupError::Missing("transaction_key"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            login_id,
            transaction_key,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpCardGateway {
    async fn process_payment(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        let body = ChargeBody {
            merchant: Merchant {
                login_id: &self.login_id,
                transaction_key: &self.transaction_key,
            },
            amount: request.amount.round_dp(2).to_string(),
            currency: &request.currency,
            card: CardBody {
                number: request.card.card_number.expose(),
                expiration_date: &request.card.expiration_date,
                cvv: request.card.cvv.as_ref().map(|c| c.expose().as_str()),
            },
            description: &request.description,
        };

        tracing::info!(
            "Charging {} {} to card {} via provider",
            request.amount,
            request.currency,
            request.card.card_number.last_four()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Transport(format!("provider returned {}", status)));
        }

        let parsed: ProviderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;

        if parsed.approved {
            let transaction_id = parsed
                .transaction_id
                .ok_or_else(|| GatewayError::Protocol("approval without transaction id".to_string()))?;
            Ok(ChargeOutcome::approved(
                transaction_id,
                parsed.message.unwrap_or_else(|| "Payment approved".to_string()),
            ))
        } else {
            Ok(ChargeOutcome::declined(
                parsed.message.unwrap_or_else(|| "Payment declined".to_string()),
            ))
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
