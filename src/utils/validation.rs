use crate::domain::model::{DraftFields, ShipmentFields};
use crate::utils::error::{AppError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value.trim())
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AppError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AppError::InvalidConfigValue {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(AppError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AppError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AppError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(AppError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_config_email(field_name: &str, value: &str) -> Result<()> {
    if !is_valid_email(value) {
        return Err(AppError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Not an email address".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field_name, "Required"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AppError::validation(
            field_name,
            format!("Must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn required_text(field_name: &str, value: &Option<String>) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.clone()),
        _ => Err(AppError::validation(field_name, "Required")),
    }
}

fn required_email(field_name: &str, value: &Option<String>) -> Result<String> {
    let email = required_text(field_name, value)?;
    if !is_valid_email(&email) {
        return Err(AppError::validation(field_name, "Invalid email address"));
    }
    Ok(email)
}

fn required_coordinate(field_name: &str, value: Option<f64>, bound: f64) -> Result<f64> {
    let value = value.ok_or_else(|| AppError::validation(field_name, "Required"))?;
    if !value.is_finite() {
        return Err(AppError::validation(field_name, "Must be a number"));
    }
    validate_range(field_name, value, -bound, bound)?;
    Ok(value)
}

fn optional_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Check loose shipment attributes against the full shipment schema.
///
/// Fields are checked in declaration order and the first failure is
/// returned, so callers can point the admin at a single field.
pub fn validate_shipment(fields: &DraftFields) -> Result<ShipmentFields> {
    let sender_name = required_text("senderName", &fields.sender_name)?;
    let sender_email = required_email("senderEmail", &fields.sender_email)?;
    let sender_address = required_text("senderAddress", &fields.sender_address)?;
    let sender_country = required_text("senderCountry", &fields.sender_country)?;
    let recipient_name = required_text("recipientName", &fields.recipient_name)?;
    let recipient_email = required_email("recipientEmail", &fields.recipient_email)?;
    let recipient_address = required_text("recipientAddress", &fields.recipient_address)?;
    let recipient_country = required_text("recipientCountry", &fields.recipient_country)?;
    let package_type = required_text("packageType", &fields.package_type)?;
    let value = required_text("value", &fields.value)?;
    let service_type = required_text("serviceType", &fields.service_type)?;
    let priority = required_text("priority", &fields.priority)?;
    let shipping_date = required_text("shippingDate", &fields.shipping_date)?;
    let estimated_delivery_date =
        required_text("estimatedDeliveryDate", &fields.estimated_delivery_date)?;
    let shipping_cost = required_text("shippingCost", &fields.shipping_cost)?;
    let latitude = required_coordinate("latitude", fields.latitude, 90.0)?;
    let longitude = required_coordinate("longitude", fields.longitude, 180.0)?;

    let (recipient_latitude, recipient_longitude) =
        match (fields.recipient_latitude, fields.recipient_longitude) {
            (None, None) => (None, None),
            (Some(lat), Some(lng)) => (
                Some(required_coordinate("recipientLatitude", Some(lat), 90.0)?),
                Some(required_coordinate("recipientLongitude", Some(lng), 180.0)?),
            ),
            (None, Some(_)) => {
                return Err(AppError::validation(
                    "recipientLatitude",
                    "Required when recipientLongitude is set",
                ))
            }
            (Some(_), None) => {
                return Err(AppError::validation(
                    "recipientLongitude",
                    "Required when recipientLatitude is set",
                ))
            }
        };

    Ok(ShipmentFields {
        sender_name,
        sender_email,
        sender_phone: optional_text(&fields.sender_phone),
        sender_address,
        sender_city: optional_text(&fields.sender_city),
        sender_state: optional_text(&fields.sender_state),
        sender_zip: optional_text(&fields.sender_zip),
        sender_country,
        recipient_name,
        recipient_email,
        recipient_phone: optional_text(&fields.recipient_phone),
        recipient_address,
        recipient_city: optional_text(&fields.recipient_city),
        recipient_state: optional_text(&fields.recipient_state),
        recipient_zip: optional_text(&fields.recipient_zip),
        recipient_country,
        package_type,
        weight: optional_text(&fields.weight),
        dimensions: fields.dimensions.clone().unwrap_or_default(),
        value,
        description: optional_text(&fields.description),
        special_instructions: optional_text(&fields.special_instructions),
        service_type,
        priority,
        insurance: fields.insurance.unwrap_or(false),
        signature_required: fields.signature_required.unwrap_or(false),
        shipping_date,
        estimated_delivery_date,
        shipping_cost,
        latitude,
        longitude,
        recipient_latitude,
        recipient_longitude,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::model::Dimensions;

    pub(crate) fn complete_fields() -> DraftFields {
        DraftFields {
            sender_name: Some("Marcus Reed".into()),
            sender_email: Some("marcus@example.com".into()),
            sender_phone: Some("+1 555 0100".into()),
            sender_address: Some("12 Harbor Rd".into()),
            sender_city: Some("Miami".into()),
            sender_state: Some("FL".into()),
            sender_zip: Some("33101".into()),
            sender_country: Some("USA".into()),
            recipient_name: Some("Lena Vogel".into()),
            recipient_email: Some("lena@example.de".into()),
            recipient_phone: None,
            recipient_address: Some("Hauptstrasse 5".into()),
            recipient_city: Some("Berlin".into()),
            recipient_state: None,
            recipient_zip: Some("10115".into()),
            recipient_country: Some("Germany".into()),
            package_type: Some("box".into()),
            weight: Some("2.5".into()),
            dimensions: Some(Dimensions {
                length: "40".into(),
                width: "30".into(),
                height: "20".into(),
            }),
            value: Some("450".into()),
            description: Some("Ball python, captive bred".into()),
            special_instructions: Some("Keep above 22C".into()),
            service_type: Some("express".into()),
            priority: Some("high".into()),
            insurance: Some(true),
            signature_required: Some(true),
            shipping_date: Some("2026-10-20".into()),
            estimated_delivery_date: Some("2026-10-23".into()),
            shipping_cost: Some("120".into()),
            latitude: Some(25.7617),
            longitude: Some(-80.1918),
            recipient_latitude: Some(52.52),
            recipient_longitude: Some(13.405),
        }
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("server.public_base_url", "https://example.com").is_ok());
        assert!(validate_url("server.public_base_url", "http://example.com").is_ok());
        assert!(validate_url("server.public_base_url", "").is_err());
        assert!(validate_url("server.public_base_url", "invalid-url").is_err());
        assert!(validate_url("server.public_base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("auth.session_ttl_hours", 5, 1).is_ok());
        assert!(validate_positive_number("auth.session_ttl_hours", 0, 1).is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn test_complete_fields_pass() {
        let fields = validate_shipment(&complete_fields()).unwrap();
        assert_eq!(fields.sender_name, "Marcus Reed");
        assert_eq!(fields.recipient_state, "");
        assert_eq!(fields.recipient_latitude, Some(52.52));
    }

    #[test]
    fn test_first_failing_field_is_reported() {
        let mut fields = complete_fields();
        fields.recipient_email = Some("not-an-email".into());
        fields.shipping_cost = None;

        match validate_shipment(&fields) {
            Err(AppError::Validation { field, message }) => {
                assert_eq!(field, "recipientEmail");
                assert_eq!(message, "Invalid email address");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_blank_is_missing() {
        let mut fields = complete_fields();
        fields.sender_name = Some("   ".into());
        let err = validate_shipment(&fields).unwrap_err();
        assert_eq!(err.to_string(), "senderName: Required");
    }

    #[test]
    fn test_values_are_kept_as_entered() {
        let mut fields = complete_fields();
        fields.sender_name = Some(" Marcus Reed ".into());
        fields.weight = Some("2.5 ".into());
        let checked = validate_shipment(&fields).unwrap();
        assert_eq!(checked.sender_name, " Marcus Reed ");
        assert_eq!(checked.weight, "2.5 ");
    }

    #[test]
    fn test_coordinates_in_range_and_paired() {
        let mut fields = complete_fields();
        fields.latitude = Some(91.0);
        assert_eq!(
            validate_shipment(&fields).unwrap_err().to_string(),
            "latitude: Must be between -90 and 90"
        );

        let mut fields = complete_fields();
        fields.recipient_latitude = None;
        assert!(matches!(
            validate_shipment(&fields),
            Err(AppError::Validation { ref field, .. }) if field == "recipientLatitude"
        ));
    }
}
