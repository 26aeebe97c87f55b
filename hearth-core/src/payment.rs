use async_trait::async_trait;
use chrono::Utc;
use hearth_folio::PaymentMethod;
use hearth_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::{CoreError, CoreResult};

/// Which gateway implementation the service is wired with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    #[default]
    Simulated,
    Live,
}

/// What to do when the provider cannot be reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    FailClosed,
    /// Treat transport errors as a recovered success. Never use in production.
    FailOpen,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub card_number: Masked<String>,
    pub expiration_date: String,
    #[serde(default)]
    pub cvv: Option<Masked<String>>,
    #[serde(default)]
    pub cardholder_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount: Decimal,
    pub currency: String,
    pub card: CardDetails,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChargeOutcome {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub message: String,
}

impl ChargeOutcome {
    pub fn approved(transaction_id: String, message: impl Into<String>) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id),
            message: message.into(),
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment provider timed out")]
    Timeout,
    #[error("payment provider unreachable: {0}")]
    Transport(String),
    #[error("unexpected provider response: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a card. `Ok` carries the provider's verdict; `Err` means no verdict was obtained.
    async fn process_payment(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Approve,
    Decline(String),
    TransportError(String),
}

/// In-process gateway. Approves by default; a scripted queue of outcomes is
/// consumed first so declines and outages can be exercised.
#[derive(Default)]
pub struct SimulatedGateway {
    script: Mutex<VecDeque<ScriptedOutcome>>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(outcomes: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
        }
    }

    pub fn push(&self, outcome: ScriptedOutcome) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or(ScriptedOutcome::Approve)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn process_payment(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        tracing::info!(
            "Simulated charge of {} {} on card {}",
            request.amount,
            request.currency,
            request.card.card_number.last_four()
        );
        match self.next_outcome() {
            ScriptedOutcome::Approve => Ok(ChargeOutcome::approved(
                format!("sim_{}", Utc::now().timestamp_millis()),
                "Payment approved",
            )),
            ScriptedOutcome::Decline(message) => Ok(ChargeOutcome::declined(message)),
            ScriptedOutcome::TransportError(message) => Err(GatewayError::Transport(message)),
        }
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Result of settling a balance.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub method: PaymentMethod,
    pub amount_charged: Decimal,
    pub transaction_id: Option<String>,
    pub message: String,
}

pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    policy: FailurePolicy,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, policy: FailurePolicy, currency: impl Into<String>) -> Self {
        if policy == FailurePolicy::FailOpen {
            tracing::warn!("Payment failure policy is fail_open: provider outages will be recorded as paid");
        }
        Self {
            gateway,
            policy,
            currency: currency.into(),
        }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    /// Collects `amount` with `method`. Cash is accepted on the spot; cards go
    /// through the gateway.
    pub async fn settle(
        &self,
        method: PaymentMethod,
        amount: Decimal,
        card: Option<&CardDetails>,
        description: &str,
    ) -> CoreResult<Settlement> {
        if amount <= Decimal::ZERO {
            return Ok(Settlement {
                method,
                amount_charged: Decimal::ZERO,
                transaction_id: None,
                message: "Nothing to charge".to_string(),
            });
        }

        match method {
            PaymentMethod::Cash => Ok(Settlement {
                method,
                amount_charged: amount,
                transaction_id: Some(format!("cash_{}", Utc::now().timestamp_millis())),
                message: "Cash payment accepted".to_string(),
            }),
            PaymentMethod::CreditCard | PaymentMethod::DebitCard => {
                let card = card.ok_or_else(|| {
                    CoreError::Payment("Card details are required for card payments".to_string())
                })?;
                self.charge_card(method, amount, card, description).await
            }
            PaymentMethod::BankTransfer => Err(CoreError::Payment("Unsupported payment method".to_string())),
        }
    }

    async fn charge_card(
        &self,
        method: PaymentMethod,
        amount: Decimal,
        card: &CardDetails,
        description: &str,
    ) -> CoreResult<Settlement> {
        let request = ChargeRequest {
            amount,
            currency: self.currency.clone(),
            card: card.clone(),
            description: description.to_string(),
        };

        match self.gateway.process_payment(&request).await {
            Ok(outcome) if outcome.success => Ok(Settlement {
                method,
                amount_charged: amount,
                transaction_id: outcome.transaction_id,
                message: outcome.message,
            }),
            Ok(outcome) => {
                tracing::info!("Card payment declined via {}: {}", self.gateway.name(), outcome.message);
                Err(CoreError::Payment(format!("Payment declined: {}", outcome.message)))
            }
            Err(err) => match self.policy {
                FailurePolicy::FailOpen => {
                    tracing::warn!(
                        "Payment provider {} failed ({}); recording simulated recovery",
                        self.gateway.name(),
                        err
                    );
                    Ok(Settlement {
                        method,
                        amount_charged: amount,
                        transaction_id: Some(format!("sim_recovered_{}", Utc::now().timestamp_millis())),
                        message: "Payment recorded after provider failure".to_string(),
                    })
                }
                FailurePolicy::FailClosed => {
                    tracing::error!("Payment provider {} failed: {}", self.gateway.name(), err);
                    Err(CoreError::Payment(format!("Payment failed: {}", err)))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> CardDetails {
        CardDetails {
            card_number: Masked::from("4111 1111 1111 4242"),
            expiration_date: "12/30".to_string(),
            cvv: Some(Masked::from("123")),
            cardholder_name: Some("Ada Lovelace".to_string()),
        }
    }

    fn orchestrator(gateway: SimulatedGateway, policy: FailurePolicy) -> PaymentOrchestrator {
        PaymentOrchestrator::new(Arc::new(gateway), policy, "USD")
    }

    #[tokio::test]
    async fn test_cash_is_accepted_without_gateway() {
        let orch = orchestrator(
            SimulatedGateway::scripted([ScriptedOutcome::TransportError("down".into())]),
            FailurePolicy::FailClosed,
        );
        let settlement = orch
            .settle(PaymentMethod::Cash, Decimal::from(352), None, "checkout")
            .await
            .unwrap();
        assert_eq!(settlement.amount_charged, Decimal::from(352));
        assert!(settlement.transaction_id.unwrap().starts_with("cash_"));
    }

    #[tokio::test]
    async fn test_card_approved() {
        let orch = orchestrator(SimulatedGateway::new(), FailurePolicy::FailClosed);
        let settlement = orch
            .settle(PaymentMethod::CreditCard, Decimal::from(50), Some(&card()), "checkout")
            .await
            .unwrap();
        assert!(settlement.transaction_id.unwrap().starts_with("sim_"));
    }

    #[tokio::test]
    async fn test_decline_is_payment_error() {
        let orch = orchestrator(
            SimulatedGateway::scripted([ScriptedOutcome::Decline("Insufficient funds".into())]),
            FailurePolicy::FailOpen,
        );
        let result = orch
            .settle(PaymentMethod::CreditCard, Decimal::from(50), Some(&card()), "checkout")
            .await;
        assert!(matches!(result, Err(CoreError::Payment(msg)) if msg.contains("Insufficient funds")));
    }

    #[tokio::test]
    async fn test_transport_error_respects_policy() {
        let closed = orchestrator(
            SimulatedGateway::scripted([ScriptedOutcome::TransportError("connection reset".into())]),
            FailurePolicy::FailClosed,
        );
        assert!(closed
            .settle(PaymentMethod::DebitCard, Decimal::from(10), Some(&card()), "checkout")
            .await
            .is_err());

        let open = orchestrator(
            SimulatedGateway::scripted([ScriptedOutcome::TransportError("connection reset".into())]),
            FailurePolicy::FailOpen,
        );
        let settlement = open
            .settle(PaymentMethod::DebitCard, Decimal::from(10), Some(&card()), "checkout")
            .await
            .unwrap();
        assert!(settlement.transaction_id.unwrap().starts_with("sim_recovered_"));
    }

    #[tokio::test]
    async fn test_card_requires_details_and_bank_transfer_unsupported() {
        let orch = orchestrator(SimulatedGateway::new(), FailurePolicy::FailClosed);
        assert!(orch
            .settle(PaymentMethod::CreditCard, Decimal::from(10), None, "checkout")
            .await
            .is_err());
        let result = orch
            .settle(PaymentMethod::BankTransfer, Decimal::from(10), None, "checkout")
            .await;
        assert!(matches!(result, Err(CoreError::Payment(msg)) if msg == "Unsupported payment method"));
    }

    #[tokio::test]
    async fn test_zero_balance_skips_charge() {
        let orch = orchestrator(
            SimulatedGateway::scripted([ScriptedOutcome::Decline("should not be used".into())]),
            FailurePolicy::FailClosed,
        );
        let settlement = orch
            .settle(PaymentMethod::CreditCard, Decimal::ZERO, None, "checkout")
            .await
            .unwrap();
        assert_eq!(settlement.amount_charged, Decimal::ZERO);
        assert!(settlement.transaction_id.is_none());
    }
}
