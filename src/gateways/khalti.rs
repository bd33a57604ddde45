use crate::gateways::{
    InitiateRequest, InitiateResponse, LookupResponse, PaymentProvider, ProviderError, RefundReceipt,
    RefundRequest,
};
use serde::de::DeserializeOwned;
use serde_json::json;

pub struct KhaltiGateway {
    pub initiate_url: String,
    pub lookup_url: String,
    pub refund_url: String,
    pub secret_key: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl KhaltiGateway {
    async fn post<T: DeserializeOwned>(&self, url: &str, body: serde_json::Value) -> Result<T, ProviderError> {
        let resp = self
            .client
            .post(url)
            .header("Authorization", format!("key {}", self.secret_key))
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(classify_transport_error)?;
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "khalti request rejected");
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        decode(&text)
    }
}

#[async_trait::async_trait]
impl PaymentProvider for KhaltiGateway {
    fn name(&self) -> &'static str {
        "khalti"
    }

    async fn initiate(&self, request: &InitiateRequest) -> Result<InitiateResponse, ProviderError> {
        let resp: InitiateResponse = self.post(&self.initiate_url, initiate_body(request)).await?;
        match resp.payment_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(resp),
            _ => Err(ProviderError::MissingPaymentUrl),
        }
    }

    async fn lookup(&self, pidx: &str) -> Result<LookupResponse, ProviderError> {
        self.post(&self.lookup_url, json!({ "pidx": pidx })).await
    }

    async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt, ProviderError> {
        self.post(
            &self.refund_url,
            json!({
                "pidx": request.transaction_id,
                "amount": request.amount_minor,
            }),
        )
        .await
    }
}

pub fn initiate_body(request: &InitiateRequest) -> serde_json::Value {
    json!({
        "return_url": request.return_url,
        "website_url": request.website_url,
        "amount": request.amount_minor,
        "purchase_order_id": request.purchase_order_id,
        "purchase_order_name": request.purchase_order_name,
        "customer_info": request.customer,
        "amount_breakdown": [{
            "label": format!("{} x {}", request.line.ticket_name, request.line.quantity),
            "amount": request.amount_minor,
        }],
        "product_details": [{
            "identity": request.line.ticket_type_id,
            "name": request.line.ticket_name,
            "total_price": request.amount_minor,
            "quantity": request.line.quantity,
            "unit_price": request.line.unit_price_minor,
        }],
    })
}

/// Empty refund bodies are accepted; everything else must match the schema.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ProviderError> {
    let text = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str(text).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

fn classify_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(e.to_string())
    }
}
