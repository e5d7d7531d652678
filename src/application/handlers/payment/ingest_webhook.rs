//! IngestWebhookHandler - Command handler for inbound gateway notifications.

use std::sync::Arc;

use crate::domain::payment::PaymentMethod;
use crate::domain::webhook::WebhookError;
use crate::ports::CheckoutGateways;

use super::{FulfillmentOrchestrator, FulfillmentOutcome};

/// Command carrying a raw provider callback.
#[derive(Debug, Clone)]
pub struct IngestWebhookCommand {
    pub provider: PaymentMethod,

    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,

    /// Provider signature, from a header or query parameter.
    pub signature: Option<String>,
}

/// Result of webhook ingestion. Both variants are acknowledged to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestWebhookResult {
    Processed(FulfillmentOutcome),

    /// Verified but not actionable (foreign or malformed metadata).
    Ignored(String),
}

/// Handler for gateway callbacks.
///
/// Verification runs on the raw bytes before anything is decoded, and a
/// failure is returned before any port is touched.
pub struct IngestWebhookHandler {
    gateways: CheckoutGateways,
    fulfillment: Arc<FulfillmentOrchestrator>,
}

impl IngestWebhookHandler {
    pub fn new(gateways: CheckoutGateways, fulfillment: Arc<FulfillmentOrchestrator>) -> Self {
        Self {
            gateways,
            fulfillment,
        }
    }

    pub async fn handle(&self, cmd: IngestWebhookCommand) -> Result<IngestWebhookResult, WebhookError> {
        let signature = match cmd.signature.as_deref().map(str::trim) {
            Some(sig) if !sig.is_empty() => sig,
            _ => {
                tracing::warn!(provider = %cmd.provider, "Webhook rejected: missing signature");
                return Err(WebhookError::MissingSignature);
            }
        };

        let gateway = self.gateways.get(cmd.provider).ok_or_else(|| {
            WebhookError::Ignored(format!("{} is not configured", cmd.provider))
        })?;

        let event = match gateway.verify_webhook(&cmd.payload, signature) {
            Ok(event) => event,
            Err(e @ WebhookError::MissingMetadata(_)) => {
                tracing::warn!(provider = %cmd.provider, reason = %e, "Webhook without correlation metadata acknowledged");
                return Ok(IngestWebhookResult::Ignored(e.to_string()));
            }
            Err(e @ WebhookError::Ignored(_)) => {
                tracing::info!(provider = %cmd.provider, reason = %e, "Webhook acknowledged without action");
                return Ok(IngestWebhookResult::Ignored(e.to_string()));
            }
            Err(e) if e.is_authentication_failure() => {
                tracing::warn!(provider = %cmd.provider, error = %e, "Webhook failed authentication");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(provider = %cmd.provider, error = %e, "Webhook payload rejected");
                return Err(e);
            }
        };

        tracing::debug!(
            provider = %cmd.provider,
            event_id = %event.event_id,
            event_type = %event.event_type,
            "Webhook verified"
        );

        let outcome = self.fulfillment.apply(event).await?;
        Ok(IngestWebhookResult::Processed(outcome))
    }
}
