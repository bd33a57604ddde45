use crate::domain::booking::PaymentMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub mod khalti;
pub mod mock;

pub const STATUS_COMPLETED: &str = "Completed";

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("payment provider timed out")]
    Timeout,
    #[error("payment provider returned HTTP {status}")]
    Http { status: u16, body: String },
    #[error("payment provider unreachable: {0}")]
    Network(String),
    #[error("malformed payment provider response: {0}")]
    MalformedResponse(String),
    #[error("payment URL not received from provider")]
    MissingPaymentUrl,
}

impl ProviderError {
    pub fn details(&self) -> Option<String> {
        match self {
            ProviderError::Http { body, .. } if !body.is_empty() => Some(body.clone()),
            ProviderError::Network(msg) | ProviderError::MalformedResponse(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LineItem {
    pub ticket_type_id: String,
    pub ticket_name: String,
    pub quantity: i64,
    pub unit_price_minor: i64,
}

#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub purchase_order_id: String,
    pub purchase_order_name: String,
    pub amount_minor: i64,
    pub return_url: String,
    pub website_url: String,
    pub customer: CustomerInfo,
    pub line: LineItem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitiateResponse {
    pub pidx: String,
    pub payment_url: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupResponse {
    pub pidx: String,
    pub total_amount: i64,
    pub status: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub refunded: bool,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub transaction_id: String,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundReceipt {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Authoritative answer from the provider's lookup call.
#[derive(Debug, Clone)]
pub struct Verification {
    pub completed: bool,
    pub transaction_id: String,
    pub provider_status: String,
    pub total_amount: i64,
}

#[async_trait::async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn initiate(&self, request: &InitiateRequest) -> Result<InitiateResponse, ProviderError>;

    async fn lookup(&self, pidx: &str) -> Result<LookupResponse, ProviderError>;

    async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt, ProviderError>;
}

/// Re-confirms a payment through the authenticated lookup endpoint. The
/// payment index is what refunds are later issued against, so it doubles as
/// the booking's transaction id.
pub async fn verify(provider: &dyn PaymentProvider, pidx: &str) -> Result<Verification, ProviderError> {
    let lookup = provider.lookup(pidx).await?;
    if lookup.pidx != pidx {
        return Err(ProviderError::MalformedResponse(format!(
            "lookup returned pidx {} for {}",
            lookup.pidx, pidx
        )));
    }

    Ok(Verification {
        completed: lookup.status == STATUS_COMPLETED && !lookup.refunded,
        transaction_id: lookup.pidx,
        provider_status: lookup.status,
        total_amount: lookup.total_amount,
    })
}

/// Providers keyed by payment method; the keys are the supported methods.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<PaymentMethod, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: PaymentMethod, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers.insert(method, provider);
        self
    }

    pub fn get(&self, method: PaymentMethod) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.get(&method).cloned()
    }

    pub fn supports(&self, method: PaymentMethod) -> bool {
        self.providers.contains_key(&method)
    }

    pub fn methods(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = self.providers.keys().map(|m| m.as_str()).collect();
        out.sort_unstable();
        out
    }
}
