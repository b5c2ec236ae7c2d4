//! Field validators shared by the request handlers.
//!
//! Each validator trims its input, pushes a [`FieldError`] on failure and
//! returns the cleaned value, so a handler can collect every problem with a
//! request before deciding to reject it.

use rust_decimal::Decimal;

use crate::error::FieldError;

pub const USERNAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 8;
pub const NAME_MAX: usize = 30;
pub const PHONE_MAX: usize = 20;
pub const CHAMA_NAME_MAX: usize = 100;
pub const FREQUENCY_MAX: usize = 50;
pub const TITLE_MAX: usize = 200;

/// Smallest contribution or transaction amount.
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Amounts are stored as NUMERIC(10, 2).
const AMOUNT_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Required text: non-empty after trimming and at most `max` characters.
pub fn required_text(errors: &mut Vec<FieldError>, field: &str, value: &str, max: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError::new(field, "This field is required"));
    } else if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("Ensure this value has at most {max} characters"),
        ));
    }
    value.to_string()
}

/// Optional text; missing becomes the empty string.
pub fn optional_text(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    max: Option<usize>,
) -> String {
    let value = value.map(str::trim).unwrap_or_default();
    if let Some(max) = max {
        if value.chars().count() > max {
            errors.push(FieldError::new(
                field,
                format!("Ensure this value has at most {max} characters"),
            ));
        }
    }
    value.to_string()
}

pub fn username(errors: &mut Vec<FieldError>, value: &str) -> String {
    let value = required_text(errors, "username", value, USERNAME_MAX);
    if !value.is_empty()
        && !value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.push(FieldError::new(
            "username",
            "Username may only contain letters, digits and @/./+/-/_ characters",
        ));
    }
    value
}

pub fn email(errors: &mut Vec<FieldError>, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError::new(field, "This field is required"));
    } else if value.len() > EMAIL_MAX || !is_valid_email(value) {
        errors.push(FieldError::new(field, "Enter a valid email address"));
    }
    value.to_string()
}

/// Structural email check: one `@`, a local part, and a dotted domain with
/// no empty labels.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }
    domain
        .split('.')
        .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}

pub fn password(errors: &mut Vec<FieldError>, password: &str, confirm: &str) {
    if password.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {PASSWORD_MIN} characters"),
        ));
    } else if password.chars().all(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new("password", "Password cannot be entirely numeric"));
    }
    if password != confirm {
        errors.push(FieldError::new(
            "password_confirm",
            "The two password fields didn't match",
        ));
    }
}

/// Currency amount: at least `min`, at most two decimal places, and small
/// enough for NUMERIC(10, 2).
pub fn amount(errors: &mut Vec<FieldError>, field: &str, value: Decimal, min: Decimal) {
    if value < min {
        errors.push(FieldError::new(
            field,
            format!("Ensure this value is greater than or equal to {min}"),
        ));
    } else if value.normalize().scale() > 2 {
        errors.push(FieldError::new(
            field,
            "Ensure that there are no more than 2 decimal places",
        ));
    } else if value >= AMOUNT_LIMIT {
        errors.push(FieldError::new(
            field,
            "Ensure that there are no more than 8 digits before the decimal point",
        ));
    }
}

/// Optional http(s) URL; empty clears the value.
pub fn http_url(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if !value.starts_with("http://") && !value.starts_with("https://") {
        errors.push(FieldError::new(
            field,
            "URL must start with http:// or https://",
        ));
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn required_text_trims_and_rejects_blank() {
        let mut errors = Vec::new();
        assert_eq!(required_text(&mut errors, "name", "  Umoja  ", 100), "Umoja");
        assert!(errors.is_empty());

        required_text(&mut errors, "name", "   ", 100);
        assert_eq!(fields(&errors), ["name"]);
    }

    #[test]
    fn required_text_counts_characters_not_bytes() {
        let mut errors = Vec::new();
        required_text(&mut errors, "title", &"é".repeat(200), TITLE_MAX);
        assert!(errors.is_empty());
        required_text(&mut errors, "title", &"é".repeat(201), TITLE_MAX);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn username_charset() {
        let mut errors = Vec::new();
        username(&mut errors, "jane.doe+chama@home_1");
        assert!(errors.is_empty());
        username(&mut errors, "jane doe");
        assert_eq!(fields(&errors), ["username"]);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("wanjiku@example.co.ke"));
        assert!(!is_valid_email("wanjiku"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("wanjiku@localhost"));
        assert!(!is_valid_email("wanjiku@@example.com"));
        assert!(!is_valid_email("wan jiku@example.com"));
        assert!(!is_valid_email("wanjiku@example..com"));
    }

    #[test]
    fn password_rules() {
        let mut errors = Vec::new();
        password(&mut errors, "harambee2024", "harambee2024");
        assert!(errors.is_empty());

        password(&mut errors, "short", "short");
        password(&mut errors, "1234567890", "1234567890");
        password(&mut errors, "harambee2024", "harambee2025");
        assert_eq!(fields(&errors), ["password", "password", "password_confirm"]);
    }

    #[test]
    fn amount_bounds() {
        let mut errors = Vec::new();
        amount(&mut errors, "amount", dec!(0.01), MIN_AMOUNT);
        amount(&mut errors, "amount", dec!(500.00), MIN_AMOUNT);
        amount(&mut errors, "amount", dec!(99999999.99), MIN_AMOUNT);
        // Trailing zeros beyond two places are fine.
        amount(&mut errors, "amount", dec!(12.500), MIN_AMOUNT);
        assert!(errors.is_empty());

        amount(&mut errors, "amount", dec!(0), MIN_AMOUNT);
        amount(&mut errors, "amount", dec!(-5), MIN_AMOUNT);
        amount(&mut errors, "amount", dec!(1.005), MIN_AMOUNT);
        amount(&mut errors, "amount", dec!(100000000), MIN_AMOUNT);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn zero_allowed_when_minimum_is_zero() {
        let mut errors = Vec::new();
        amount(&mut errors, "contribution_amount", Decimal::ZERO, Decimal::ZERO);
        assert!(errors.is_empty());
        amount(&mut errors, "contribution_amount", dec!(-0.01), Decimal::ZERO);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn http_url_optional() {
        let mut errors = Vec::new();
        assert_eq!(http_url(&mut errors, "profile_picture", None), None);
        assert_eq!(http_url(&mut errors, "profile_picture", Some("  ")), None);
        assert_eq!(
            http_url(&mut errors, "profile_picture", Some("https://cdn.example.com/a.png")),
            Some("https://cdn.example.com/a.png".to_string())
        );
        assert!(errors.is_empty());
        http_url(&mut errors, "profile_picture", Some("ftp://x"));
        assert_eq!(errors.len(), 1);
    }
}
