//! Form validation, run before anything is sent to the API.
//!
//! [`CouponForm`] and [`validate_coupon_form`] are library API for admin tooling that
//! creates coupons. Neither binary calls them.

use crate::api::{AddressInput, DiscountType, LoginCredentials, ProfileUpdate, RegisterCredentials};
use crate::errors::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[6-9]\d{9}$").expect("valid phone regex"))
}

fn pincode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{6}$").expect("valid pincode regex"))
}

/// Validation failures, keyed by form field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    fn check(&mut self, field: &'static str, ok: bool, message: &str) {
        if !ok && self.get(field).is_none() {
            self.0.push((field, message.to_string()));
        }
    }

    /// First error reported for `field`
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, String)> {
        self.0.iter()
    }

    fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", joined)
    }
}

fn min_chars(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

pub fn validate_login(credentials: &LoginCredentials) -> Result<()> {
    let mut errors = FieldErrors::default();
    errors.check("email", email_re().is_match(&credentials.email), "Please enter a valid email");
    errors.check(
        "password",
        credentials.password.chars().count() >= 6,
        "Password must be at least 6 characters",
    );
    errors.into_result()
}

/// Registration form. `confirm_password` never leaves the client.
pub fn validate_register(credentials: &RegisterCredentials, confirm_password: &str) -> Result<()> {
    let mut errors = FieldErrors::default();
    errors.check("name", min_chars(&credentials.name, 2), "Name must be at least 2 characters");
    errors.check("email", email_re().is_match(&credentials.email), "Please enter a valid email");
    errors.check(
        "password",
        credentials.password.chars().count() >= 6,
        "Password must be at least 6 characters",
    );
    errors.check(
        "confirmPassword",
        credentials.password == confirm_password,
        "Passwords do not match",
    );
    errors.check(
        "phone",
        phone_re().is_match(&credentials.phone),
        "Please enter a valid 10-digit phone number",
    );
    errors.into_result()
}

pub fn validate_address(address: &AddressInput) -> Result<()> {
    let mut errors = FieldErrors::default();
    errors.check("label", min_chars(&address.label, 1), "Label is required");
    errors.check(
        "street",
        min_chars(&address.street, 5),
        "Street address must be at least 5 characters",
    );
    errors.check("city", min_chars(&address.city, 2), "City is required");
    errors.check("state", min_chars(&address.state, 2), "State is required");
    errors.check(
        "pincode",
        pincode_re().is_match(&address.pincode),
        "Please enter a valid 6-digit pincode",
    );
    errors.into_result()
}

/// Profile edits; only the fields being changed are checked
pub fn validate_profile(update: &ProfileUpdate) -> Result<()> {
    let mut errors = FieldErrors::default();
    if let Some(name) = &update.name {
        errors.check("name", min_chars(name, 2), "Name must be at least 2 characters");
    }
    if let Some(phone) = &update.phone {
        errors.check(
            "phone",
            phone_re().is_match(phone),
            "Please enter a valid 10-digit phone number",
        );
    }
    errors.into_result()
}

/// Admin coupon form, checked by [`validate_coupon_form`] before a coupon is created
#[derive(Debug, Clone, PartialEq)]
pub struct CouponForm {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_order_amount: f64,
    pub max_discount: f64,
}

/// Validate the coupon form, returning the normalized (upper-cased) code
pub fn validate_coupon_form(form: &CouponForm) -> Result<String> {
    let mut errors = FieldErrors::default();
    errors.check(
        "code",
        min_chars(&form.code, 3),
        "Coupon code must be at least 3 characters",
    );
    errors.check("description", min_chars(&form.description, 5), "Description is required");
    errors.check(
        "discountValue",
        form.discount_value > 0.0,
        "Discount value must be positive",
    );
    errors.check(
        "minOrderAmount",
        form.min_order_amount >= 0.0,
        "Minimum order amount cannot be negative",
    );
    errors.check("maxDiscount", form.max_discount > 0.0, "Maximum discount must be positive");
    errors.into_result()?;
    Ok(normalize_coupon_code(&form.code))
}

/// Coupon codes are matched case-insensitively by upper-casing them
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod test {
    use super::*;

    fn registration(phone: &str) -> RegisterCredentials {
        RegisterCredentials {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "secret1".to_string(),
            phone: phone.to_string(),
        }
    }

    fn field_errors(result: Result<()>) -> FieldErrors {
        match result {
            Err(Error::Validation(errors)) => errors,
            other => panic!("Expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_login() {
        let ok = LoginCredentials {
            email: "asha@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(validate_login(&ok).is_ok());

        let bad = LoginCredentials {
            email: "asha.example.com".to_string(),
            password: "123".to_string(),
        };
        let errors = field_errors(validate_login(&bad));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("email"), Some("Please enter a valid email"));
    }

    #[test]
    fn test_register_phone() {
        assert!(validate_register(&registration("9876543210"), "secret1").is_ok());

        for phone in ["5876543210", "987654321", "98765432100", "98765o4321"] {
            let errors = field_errors(validate_register(&registration(phone), "secret1"));
            assert_eq!(
                errors.get("phone"),
                Some("Please enter a valid 10-digit phone number"),
                "phone {}",
                phone
            );
        }
    }

    #[test]
    fn test_register_password_mismatch() {
        let errors = field_errors(validate_register(&registration("9876543210"), "secret2"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
    }

    #[test]
    fn test_address() {
        let mut address = AddressInput {
            label: "Home".to_string(),
            kind: "Home".to_string(),
            street: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            pincode: "411001".to_string(),
            landmark: None,
            is_default: true,
        };
        assert!(validate_address(&address).is_ok());

        address.pincode = "4110".to_string();
        address.street = "MG".to_string();
        let errors = field_errors(validate_address(&address));
        assert_eq!(errors.get("pincode"), Some("Please enter a valid 6-digit pincode"));
        assert!(errors.get("street").is_some());
    }

    #[test]
    fn test_profile_checks_only_changed_fields() {
        assert!(validate_profile(&ProfileUpdate::default()).is_ok());
        let update = ProfileUpdate {
            name: None,
            phone: Some("12345".to_string()),
        };
        assert!(field_errors(validate_profile(&update)).get("phone").is_some());
    }

    #[test]
    fn test_coupon_form() {
        let mut form = CouponForm {
            code: "pizza10".to_string(),
            description: "Ten percent off".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            min_order_amount: 0.0,
            max_discount: 100.0,
        };
        assert_eq!(validate_coupon_form(&form).unwrap(), "PIZZA10");

        form.discount_value = 0.0;
        form.min_order_amount = -1.0;
        match validate_coupon_form(&form) {
            Err(Error::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("Expected validation errors, got {:?}", other),
        }
    }
}
