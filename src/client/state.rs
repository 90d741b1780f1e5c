//! Client-visible checkout state and the popup-callback reducer.

use serde::{Deserialize, Serialize};

/// One checkout attempt as seen by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Idle,
    Loading,
    Success,
    Pending,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaNumber {
    pub bank: String,
    pub va_number: String,
}

/// How the shopper completes a pending payment. At most one kind per transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentInstructions {
    VirtualAccounts { accounts: Vec<VaNumber> },
    BillPayment { biller_code: String, bill_key: String },
    PaymentCode { code: String },
}

/// Payload Snap hands to its `onSuccess` / `onPending` / `onError` callbacks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapResult {
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_type: Option<String>,
    pub gross_amount: Option<String>,
    pub transaction_time: Option<String>,
    pub transaction_status: Option<String>,
    pub status_code: Option<String>,
    pub status_message: Option<String>,
    pub fraud_status: Option<String>,
    pub va_numbers: Option<Vec<VaNumber>>,
    pub permata_va_number: Option<String>,
    pub biller_code: Option<String>,
    pub bill_key: Option<String>,
    pub payment_code: Option<String>,
}

impl SnapResult {
    pub fn instructions(&self) -> Option<PaymentInstructions> {
        let mut accounts = self.va_numbers.clone().unwrap_or_default();
        if let Some(number) = self.permata_va_number.as_ref().filter(|n| !n.is_empty()) {
            accounts.push(VaNumber {
                bank: "permata".to_string(),
                va_number: number.clone(),
            });
        }
        if !accounts.is_empty() {
            return Some(PaymentInstructions::VirtualAccounts { accounts });
        }

        if let (Some(biller_code), Some(bill_key)) = (&self.biller_code, &self.bill_key) {
            return Some(PaymentInstructions::BillPayment {
                biller_code: biller_code.clone(),
                bill_key: bill_key.clone(),
            });
        }

        self.payment_code
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|code| PaymentInstructions::PaymentCode { code: code.clone() })
    }
}

/// What the status modal shows for a finished or pending payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_type: Option<String>,
    pub gross_amount: Option<String>,
    pub transaction_time: Option<String>,
    pub instructions: Option<PaymentInstructions>,
}

impl PaymentResult {
    fn from_snap(result: &SnapResult, with_instructions: bool) -> Self {
        Self {
            order_id: result.order_id.clone(),
            transaction_id: result.transaction_id.clone(),
            payment_type: result.payment_type.clone(),
            gross_amount: result.gross_amount.clone(),
            transaction_time: result.transaction_time.clone(),
            instructions: if with_instructions {
                result.instructions()
            } else {
                None
            },
        }
    }

    pub fn payment_method_label(&self) -> Option<String> {
        self.payment_type.as_deref().map(payment_method_label)
    }
}

/// Callbacks from the hosted payment popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEvent {
    Success(SnapResult),
    Pending(SnapResult),
    Error(SnapResult),
    /// Shopper closed the popup
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSnapshot {
    /// Incremented by each `begin_checkout`; late popup events from an
    /// earlier attempt are ignored
    pub attempt: u64,
    pub status: PaymentStatus,
    pub result: Option<PaymentResult>,
    pub error: Option<String>,
}

impl Default for CheckoutSnapshot {
    fn default() -> Self {
        Self {
            attempt: 0,
            status: PaymentStatus::Idle,
            result: None,
            error: None,
        }
    }
}

impl CheckoutSnapshot {
    pub fn loading(attempt: u64) -> Self {
        Self {
            attempt,
            status: PaymentStatus::Loading,
            result: None,
            error: None,
        }
    }

    pub fn failed(attempt: u64, message: impl Into<String>) -> Self {
        Self {
            attempt,
            status: PaymentStatus::Error,
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn should_show_modal(&self) -> bool {
        matches!(
            self.status,
            PaymentStatus::Success | PaymentStatus::Pending | PaymentStatus::Error
        )
    }

    /// Next state after a popup event, or `None` when the event must be
    /// ignored. Only a `Loading` attempt reacts, so a close that arrives
    /// after a terminal outcome changes nothing.
    pub fn reduce(&self, event: &PopupEvent) -> Option<CheckoutSnapshot> {
        if self.status != PaymentStatus::Loading {
            return None;
        }
        let attempt = self.attempt;
        Some(match event {
            PopupEvent::Success(result) => CheckoutSnapshot {
                attempt,
                status: PaymentStatus::Success,
                result: Some(PaymentResult::from_snap(result, false)),
                error: None,
            },
            PopupEvent::Pending(result) => CheckoutSnapshot {
                attempt,
                status: PaymentStatus::Pending,
                result: Some(PaymentResult::from_snap(result, true)),
                error: None,
            },
            PopupEvent::Error(_) => {
                CheckoutSnapshot::failed(attempt, super::ClientError::PaymentFailed.to_string())
            }
            PopupEvent::Close => CheckoutSnapshot {
                attempt,
                status: PaymentStatus::Cancelled,
                result: None,
                error: None,
            },
        })
    }
}

/// Human label for a Midtrans `payment_type`
pub fn payment_method_label(payment_type: &str) -> String {
    match payment_type {
        "echannel" => "mandiri bill".to_string(),
        "cstore" => "convenience store".to_string(),
        other => other.replace('_', " "),
    }
}
