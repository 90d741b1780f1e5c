//! Drives one checkout: load Snap, obtain a token, open the popup and fold
//! its callbacks into observable state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, instrument, warn};

use super::api::TransactionApi;
use super::script::SnapLoader;
use super::state::{CheckoutSnapshot, PaymentStatus, PopupEvent};
use super::ClientError;
use crate::models::CheckoutRequest;

/// The hosted payment page. Events arrive on the returned channel; the
/// sender is dropped once the popup is gone.
pub trait PaymentPopup: Send + Sync {
    fn open(&self, token: &str) -> mpsc::UnboundedReceiver<PopupEvent>;
}

pub struct PaymentOrchestrator {
    loader: Arc<SnapLoader>,
    api: Arc<dyn TransactionApi>,
    popup: Arc<dyn PaymentPopup>,
    state: watch::Sender<CheckoutSnapshot>,
    attempts: AtomicU64,
}

impl PaymentOrchestrator {
    pub fn new(
        loader: Arc<SnapLoader>,
        api: Arc<dyn TransactionApi>,
        popup: Arc<dyn PaymentPopup>,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutSnapshot::default());
        Self {
            loader,
            api,
            popup,
            state,
            attempts: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckoutSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CheckoutSnapshot {
        self.state.borrow().clone()
    }

    pub fn should_show_modal(&self) -> bool {
        self.state.borrow().should_show_modal()
    }

    /// Back to `Idle`. A checkout still running is superseded: it will not
    /// open the popup, and its popup events are dropped.
    pub fn reset(&self) {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            *s = CheckoutSnapshot {
                attempt,
                ..CheckoutSnapshot::default()
            }
        });
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.state.borrow().attempt == attempt
    }

    /// Runs a checkout to its outcome. Returns the final status for
    /// success, pending and cancellation; popup errors and every failure
    /// before the popup opens are returned as errors after being recorded
    /// in the observable state. A checkout overtaken by `reset` returns
    /// `CheckoutSuperseded` and leaves the state alone.
    #[instrument(skip(self, request), fields(product = ?request.product_type))]
    pub async fn begin_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<PaymentStatus, ClientError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let started = self.state.send_if_modified(|s| {
            if s.status == PaymentStatus::Loading {
                return false;
            }
            *s = CheckoutSnapshot::loading(attempt);
            true
        });
        if !started {
            return Err(ClientError::CheckoutInProgress);
        }

        if let Err(e) = self.loader.ensure_loaded().await {
            self.fail(attempt, &e);
            return Err(e);
        }
        if !self.is_current(attempt) {
            return Err(ClientError::CheckoutSuperseded);
        }

        let created = match self.api.create_transaction(request).await {
            Ok(created) => created,
            Err(e) => {
                self.fail(attempt, &e);
                return Err(e);
            }
        };
        if !self.is_current(attempt) {
            warn!(order_id = %created.order_id, "Checkout reset before popup opened");
            return Err(ClientError::CheckoutSuperseded);
        }
        info!(order_id = %created.order_id, "Opening payment popup");

        let mut events = self.popup.open(&created.token);
        while let Some(event) = events.recv().await {
            self.dispatch(attempt, &event);
        }
        // Popup gone without a callback
        self.dispatch(attempt, &PopupEvent::Close);

        let snapshot = self.snapshot();
        if snapshot.attempt != attempt {
            return Err(ClientError::CheckoutSuperseded);
        }
        match snapshot.status {
            PaymentStatus::Error => Err(ClientError::PaymentFailed),
            status => Ok(status),
        }
    }

    fn dispatch(&self, attempt: u64, event: &PopupEvent) {
        self.state.send_if_modified(|s| {
            if s.attempt != attempt {
                return false;
            }
            match s.reduce(event) {
                Some(next) => {
                    *s = next;
                    true
                }
                None => false,
            }
        });
    }

    fn fail(&self, attempt: u64, error: &ClientError) {
        warn!(error = %error, "Checkout failed");
        self.state.send_if_modified(|s| {
            if s.attempt != attempt || s.status != PaymentStatus::Loading {
                return false;
            }
            *s = CheckoutSnapshot::failed(attempt, error.to_string());
            true
        });
    }
}
