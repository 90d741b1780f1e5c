use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::catalog::{self, Product};
use crate::errors::ServiceError;

const PHONE_MIN_DIGITS: usize = 10;
const PHONE_MAX_DIGITS: usize = 13;

/// Body of `POST /api/create-transaction`.
///
/// Every field is optional on the wire so that missing values surface as
/// `MissingField` instead of a deserialisation rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "product_type": "basic",
    "quantity": 1,
    "customer_name": "Ana",
    "customer_email": "ana@x.com",
    "customer_phone": "081234567890"
}))]
pub struct CheckoutRequest {
    pub product_type: Option<String>,
    pub quantity: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

/// Shopper contact details, as sent to the provider and stored on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Customer {
    pub name: String,
    #[validate(email, custom = "validate_email_domain")]
    pub email: String,
    #[validate(custom = "validate_phone_digits")]
    pub phone: String,
}

/// A checkout request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCheckout {
    pub product: &'static Product,
    pub quantity: u32,
    pub gross_amount: i64,
    pub customer: Customer,
}

fn required(value: &Option<String>, field: &str) -> Result<String, ServiceError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::MissingField(format!("{} is required", field)))
}

/// The storefront also requires a dotted domain (`ana@x` is refused).
fn validate_email_domain(email: &str) -> Result<(), ValidationError> {
    let dotted = email
        .rsplit_once('@')
        .map(|(_, domain)| {
            domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        })
        .unwrap_or(false);
    if dotted {
        Ok(())
    } else {
        Err(ValidationError::new("email_domain"))
    }
}

fn validate_phone_digits(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits) {
        return Ok(());
    }
    let mut err = ValidationError::new("phone_digits");
    err.message = Some(
        format!(
            "phone number must contain {}-{} digits",
            PHONE_MIN_DIGITS, PHONE_MAX_DIGITS
        )
        .into(),
    );
    Err(err)
}

pub fn is_valid_email(email: &str) -> bool {
    validator::validate_email(email) && validate_email_domain(email).is_ok()
}

pub fn is_valid_phone(phone: &str) -> bool {
    validate_phone_digits(phone).is_ok()
}

/// Email problems are reported before phone problems.
fn format_error(errors: &ValidationErrors, customer: &Customer) -> ServiceError {
    let fields = errors.field_errors();
    if fields.contains_key("email") {
        return ServiceError::InvalidFormat(format!(
            "'{}' is not a valid email address",
            customer.email
        ));
    }
    let message = fields
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "invalid customer details".to_string());
    ServiceError::InvalidFormat(message)
}

/// `unit_price * quantity`, refusing zero, negative or overflowing totals.
pub fn gross_amount(unit_price: i64, quantity: u32) -> Result<i64, ServiceError> {
    unit_price
        .checked_mul(i64::from(quantity))
        .filter(|amount| *amount > 0)
        .ok_or_else(|| {
            ServiceError::InvalidAmount(format!(
                "{} x {} is not a positive amount",
                unit_price, quantity
            ))
        })
}

impl CheckoutRequest {
    /// Validates in the order the storefront reports problems: product,
    /// then required fields, then formats, then the computed amount.
    pub fn validate(&self) -> Result<ValidCheckout, ServiceError> {
        let code = self.product_type.as_deref().unwrap_or_default();
        let product = catalog::find(code)
            .ok_or_else(|| ServiceError::InvalidProduct(code.to_string()))?;

        let customer = Customer {
            name: required(&self.customer_name, "customer_name")?,
            email: required(&self.customer_email, "customer_email")?,
            phone: required(&self.customer_phone, "customer_phone")?,
        };
        Validate::validate(&customer).map_err(|e| format_error(&e, &customer))?;

        let quantity = match self.quantity {
            None => 1,
            Some(q) if q >= 1 => u32::try_from(q).map_err(|_| {
                ServiceError::InvalidAmount(format!("quantity {} is too large", q))
            })?,
            Some(q) => {
                return Err(ServiceError::InvalidFormat(format!(
                    "quantity must be a positive integer, got {}",
                    q
                )))
            }
        };

        let gross_amount = gross_amount(product.unit_price, quantity)?;

        Ok(ValidCheckout {
            product,
            quantity,
            gross_amount,
            customer,
        })
    }
}
