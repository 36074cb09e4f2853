use serde::{Deserialize, Serialize};

/// A case link resolved by the verification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLink {
    /// Identifier every later call carries.
    pub request_id: String,
    /// Mobile number as supplied by the service (already partially masked).
    pub mobile_number: String,
}

impl CustomerLink {
    pub fn masked_mobile(&self) -> String {
        mask_mobile_number(&self.mobile_number)
    }
}

/// Keep only the last four digits visible: `+91 ****2345`.
pub fn mask_mobile_number(mobile: &str) -> String {
    let trimmed = mobile.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let visible: String = {
        let chars: Vec<char> = trimmed.chars().collect();
        let start = chars.len().saturating_sub(4);
        chars[start..].iter().collect()
    };
    format!("+91 ****{}", visible)
}

/// Successful OTP verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerification {
    pub token: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Consent form body for `POST /consent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequest {
    pub consent_checkbox: bool,
    pub whatsapp_toggle: bool,
    pub sms_toggle: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_last_four() {
        assert_eq!(mask_mobile_number("*****12345"), "+91 ****2345");
        assert_eq!(mask_mobile_number("9876543210"), "+91 ****3210");
        assert_eq!(mask_mobile_number("123"), "+91 ****123");
        assert_eq!(mask_mobile_number("  "), "");
    }

    #[test]
    fn consent_request_serializes_camel_case() {
        let body = serde_json::to_value(ConsentRequest {
            consent_checkbox: true,
            whatsapp_toggle: false,
            sms_toggle: true,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"consentCheckbox": true, "whatsappToggle": false, "smsToggle": true})
        );
    }
}
