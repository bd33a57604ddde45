use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters the provider appends to the return URL. The redirect is
/// driven by the buyer's browser, so none of these are trusted on their own.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(alias = "purchaseOrderReference")]
    pub purchase_order_id: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "paymentIndex")]
    pub pidx: Option<String>,
    pub amount: Option<String>,
    #[serde(alias = "secondaryIndex")]
    pub tidx: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientVerifyRequest {
    pub booking_id: Uuid,
    #[serde(alias = "providerToken")]
    pub token: String,
    pub amount: Option<i64>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientVerifyResponse {
    pub confirmed: bool,
    pub booking_id: Uuid,
    pub already_paid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
