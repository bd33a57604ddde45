use crate::gateways::{
    InitiateRequest, InitiateResponse, LookupResponse, PaymentProvider, ProviderError, RefundReceipt,
    RefundRequest, STATUS_COMPLETED,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    AlwaysSuccess,
    NotCompleted,
    /// Initiation succeeds but hands back no payment URL.
    NoPaymentUrl,
    AlwaysFailure,
    AlwaysTimeout,
}

impl MockBehavior {
    pub fn parse(s: &str) -> Self {
        match s {
            "NOT_COMPLETED" => MockBehavior::NotCompleted,
            "NO_PAYMENT_URL" => MockBehavior::NoPaymentUrl,
            "ALWAYS_FAILURE" => MockBehavior::AlwaysFailure,
            "ALWAYS_TIMEOUT" => MockBehavior::AlwaysTimeout,
            _ => MockBehavior::AlwaysSuccess,
        }
    }
}

/// In-process provider. Remembers the amount of every initiated payment so
/// lookups answer like the real provider would.
pub struct MockGateway {
    pub initiate_behavior: MockBehavior,
    pub lookup_behavior: MockBehavior,
    pub refund_behavior: MockBehavior,
    pub fixed_pidx: Option<String>,
    payments: Mutex<HashMap<String, i64>>,
    refunded: Mutex<HashSet<String>>,
    lookups: AtomicUsize,
    refunds: AtomicUsize,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new(MockBehavior::AlwaysSuccess)
    }
}

impl MockGateway {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            initiate_behavior: behavior,
            lookup_behavior: behavior,
            refund_behavior: behavior,
            fixed_pidx: None,
            payments: Mutex::new(HashMap::new()),
            refunded: Mutex::new(HashSet::new()),
            lookups: AtomicUsize::new(0),
            refunds: AtomicUsize::new(0),
        }
    }

    pub fn with_pidx(mut self, pidx: &str) -> Self {
        self.fixed_pidx = Some(pidx.to_string());
        self
    }

    pub fn with_initiate(mut self, behavior: MockBehavior) -> Self {
        self.initiate_behavior = behavior;
        self
    }

    pub fn with_lookup(mut self, behavior: MockBehavior) -> Self {
        self.lookup_behavior = behavior;
        self
    }

    pub fn with_refund(mut self, behavior: MockBehavior) -> Self {
        self.refund_behavior = behavior;
        self
    }

    /// Registers a payment that was started outside this instance.
    pub fn seed_payment(&self, pidx: &str, amount_minor: i64) {
        if let Ok(mut payments) = self.payments.lock() {
            payments.insert(pidx.to_string(), amount_minor);
        }
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn refund_calls(&self) -> usize {
        self.refunds.load(Ordering::SeqCst)
    }

    fn fail(behavior: MockBehavior) -> Option<ProviderError> {
        match behavior {
            MockBehavior::AlwaysFailure => Some(ProviderError::Http {
                status: 400,
                body: "mock decline".to_string(),
            }),
            MockBehavior::AlwaysTimeout => Some(ProviderError::Timeout),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl PaymentProvider for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn initiate(&self, request: &InitiateRequest) -> Result<InitiateResponse, ProviderError> {
        if let Some(e) = Self::fail(self.initiate_behavior) {
            return Err(e);
        }

        let pidx = self
            .fixed_pidx
            .clone()
            .unwrap_or_else(|| format!("mock_pidx_{}", uuid::Uuid::new_v4().simple()));
        self.seed_payment(&pidx, request.amount_minor);

        let payment_url = match self.initiate_behavior {
            MockBehavior::NoPaymentUrl => None,
            _ => Some(format!("https://pay.mock.local/?pidx={}", pidx)),
        };
        Ok(InitiateResponse {
            payment_url,
            pidx,
            expires_at: None,
        })
    }

    async fn lookup(&self, pidx: &str) -> Result<LookupResponse, ProviderError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = Self::fail(self.lookup_behavior) {
            return Err(e);
        }

        let total_amount = self
            .payments
            .lock()
            .ok()
            .and_then(|p| p.get(pidx).copied())
            .unwrap_or(0);
        let refunded = self.refunded.lock().map(|r| r.contains(pidx)).unwrap_or(false);

        let status = if refunded {
            "Refunded"
        } else if self.lookup_behavior == MockBehavior::NotCompleted {
            "Pending"
        } else {
            STATUS_COMPLETED
        };
        Ok(LookupResponse {
            pidx: pidx.to_string(),
            total_amount,
            status: status.to_string(),
            transaction_id: Some(format!("mock_txn_{}", pidx)),
            refunded,
        })
    }

    async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt, ProviderError> {
        self.refunds.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = Self::fail(self.refund_behavior) {
            return Err(e);
        }
        if let Ok(mut refunded) = self.refunded.lock() {
            refunded.insert(request.transaction_id.clone());
        }
        Ok(RefundReceipt {
            detail: Some("mock refund accepted".to_string()),
        })
    }
}
