//! Property-based tests for checkout validation, amounts, references and
//! notification signatures.

use std::collections::HashSet;

use dasai_mochi_api::{
    catalog::{self, format_rupiah, ProductCode},
    models::checkout::{gross_amount, is_valid_email, is_valid_phone},
    models::{CheckoutRequest, OrderStatus},
    order_id::OrderIdGenerator,
    provider::signature::{notification_signature, verify_signature},
};
use proptest::prelude::*;

fn product_strategy() -> impl Strategy<Value = ProductCode> {
    prop_oneof![
        Just(ProductCode::Basic),
        Just(ProductCode::Colorful),
        Just(ProductCode::Ultimate),
    ]
}

fn phone_strategy() -> impl Strategy<Value = String> {
    "08[0-9]{8,11}"
}

fn email_strategy() -> impl Strategy<Value = String> {
    (
        "[a-z]{3,10}",
        "[a-z]{3,8}",
        prop_oneof!["com", "co.id", "id", "net"],
    )
        .prop_map(|(local, domain, tld)| format!("{}@{}.{}", local, domain, tld))
}

fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Created),
        Just(OrderStatus::Pending),
        Just(OrderStatus::CaptureAccepted),
        Just(OrderStatus::Settled),
        Just(OrderStatus::Denied),
        Just(OrderStatus::Cancelled),
        Just(OrderStatus::Expired),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn gross_amount_is_unit_price_times_quantity(
        code in product_strategy(),
        quantity in 1i64..1_000,
        phone in phone_strategy(),
        email in email_strategy(),
    ) {
        let request = CheckoutRequest {
            product_type: Some(code.as_str().to_string()),
            quantity: Some(quantity),
            customer_name: Some("Ana".into()),
            customer_email: Some(email),
            customer_phone: Some(phone),
        };
        let checkout = request.validate().unwrap();
        prop_assert_eq!(checkout.gross_amount, catalog::product(code).unit_price * quantity);
        prop_assert!(checkout.gross_amount > 0);
    }

    #[test]
    fn gross_amount_never_overflows(price in 1i64..i64::MAX, quantity in 1u32..=u32::MAX) {
        match gross_amount(price, quantity) {
            Ok(amount) => prop_assert_eq!(amount, price * i64::from(quantity)),
            Err(_) => prop_assert!(price.checked_mul(i64::from(quantity)).is_none()),
        }
    }

    #[test]
    fn generated_emails_are_accepted(email in email_strategy()) {
        prop_assert!(is_valid_email(&email));
    }

    #[test]
    fn phone_validity_tracks_digit_count(digits in "[0-9]{1,20}", separators in "[ +\\-]{0,4}") {
        let phone = format!("{}{}", separators, digits);
        prop_assert_eq!(is_valid_phone(&phone), (10..=13).contains(&digits.len()));
    }

    #[test]
    fn rupiah_label_round_trips_digits(amount in 0i64..10_000_000_000) {
        let label = format_rupiah(amount);
        prop_assert!(label.starts_with("Rp "));
        let digits: String = label.chars().filter(char::is_ascii_digit).collect();
        prop_assert_eq!(digits, amount.to_string());
    }

    #[test]
    fn no_transition_returns_to_created_or_leaves_a_final_state(
        from in status_strategy(),
        to in status_strategy(),
    ) {
        if from.can_transition_to(to) {
            prop_assert_ne!(to, OrderStatus::Created);
            prop_assert_ne!(from, to);
            let settles_capture = from == OrderStatus::CaptureAccepted && to == OrderStatus::Settled;
            prop_assert!(!from.is_terminal() || settles_capture);
        }
    }

    #[test]
    fn signature_rejects_any_other_key(
        order_id in "MOCHI-[0-9]{13}-[0-9A-Z]{10}",
        amount in 1u32..10_000_000,
        key in "SB-Mid-server-[A-Za-z0-9]{8}",
        other in "SB-Mid-server-[A-Za-z0-9]{8}",
    ) {
        let gross = format!("{}.00", amount);
        let signature = notification_signature(&order_id, "200", &gross, &key);
        prop_assert!(verify_signature(&order_id, "200", &gross, &key, &signature));
        prop_assert!(verify_signature(&order_id, "200", &gross, &key, &signature.to_uppercase()));
        if other != key {
            prop_assert!(!verify_signature(&order_id, "200", &gross, &other, &signature));
        }
    }
}

#[test]
fn order_references_are_unique_across_a_burst() {
    let generator = OrderIdGenerator::default();
    let ids: HashSet<String> = (0..20_000).map(|_| generator.generate()).collect();
    assert_eq!(ids.len(), 20_000);
}
