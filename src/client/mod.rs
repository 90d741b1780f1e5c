//! Storefront side of checkout.
//!
//! [`PaymentOrchestrator`] loads the Snap script once, asks the backend for a
//! transaction token, opens the payment popup and exposes the resulting
//! [`CheckoutSnapshot`] through a watch channel.

pub mod api;
mod error;
pub mod orchestrator;
pub mod script;
pub mod state;

pub use api::{Catalog, HttpTransactionApi, ProductListing, TransactionApi, DEFAULT_API_BASE_URL};
pub use error::ClientError;
pub use orchestrator::{PaymentOrchestrator, PaymentPopup};
pub use script::{
    HttpScriptSource, ScriptSource, SnapLoader, SnapScript, PRODUCTION_SNAP_SCRIPT_URL,
    SANDBOX_SNAP_SCRIPT_URL,
};
pub use state::{
    payment_method_label, CheckoutSnapshot, PaymentInstructions, PaymentResult, PaymentStatus,
    PopupEvent, SnapResult, VaNumber,
};
