pub mod checkout;
pub mod order;

pub use checkout::{CheckoutRequest, Customer, ValidCheckout};
pub use order::{Order, OrderStatus, StatusMapping};
