//! Payment method catalogue offered on the checkout page

use serde::{Deserialize, Serialize};

const ICON_BASE: &str = "https://mdn.alipayobjects.com/portal_pdqp4x/afts/file/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    /// Gateway `paymentMethodType`
    pub value: String,
    pub label: String,
    /// Market the option is grouped under on the page
    pub region: String,
    pub currency: String,
    pub icon: Option<String>,
}

impl PaymentMethod {
    fn new(value: &str, label: &str, region: &str, currency: &str, icon: Option<&str>) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            region: region.to_string(),
            currency: currency.to_string(),
            icon: icon.map(|file| format!("{}{}", ICON_BASE, file)),
        }
    }
}

/// Methods enabled for the merchant account.
pub fn default_catalogue() -> Vec<PaymentMethod> {
    vec![
        PaymentMethod::new(
            "PAYPAY",
            "PayPay",
            "JP",
            "JPY",
            Some("A*mfRjRoV-rL4AAAAAAAAAAAAAAQAAAQ"),
        ),
        PaymentMethod::new(
            "KONBINI",
            "Konbini",
            "JP",
            "JPY",
            Some("A*MfnBTYHOr5cAAAAAAAAAAAAAAQAAAQ"),
        ),
        PaymentMethod::new(
            "BANKTRANSFER_PAYEASY",
            "Pay-easy",
            "JP",
            "JPY",
            Some("A*VhfgTLFuYOgAAAAAAAAAAAAAAQAAAQ"),
        ),
        PaymentMethod::new("GCASH", "GCash", "PH", "PHP", None),
        PaymentMethod::new("MAYA", "Maya", "PH", "PHP", None),
        PaymentMethod::new("SHOPEEPAY", "ShopeePay", "PH", "PHP", None),
        PaymentMethod::new("GRABPAY", "GrabPay", "PH", "PHP", None),
        PaymentMethod::new("CARD", "Card", "GLOBAL", "USD", None),
    ]
}

/// Look up a method by its gateway type.
pub fn find<'a>(catalogue: &'a [PaymentMethod], value: &str) -> Option<&'a PaymentMethod> {
    catalogue.iter().find(|method| method.value == value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_values_are_unique() {
        let catalogue = default_catalogue();
        let mut values: Vec<_> = catalogue.iter().map(|m| m.value.as_str()).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), catalogue.len());
    }

    #[test]
    fn test_find() {
        let catalogue = default_catalogue();
        let paypay = find(&catalogue, "PAYPAY").unwrap();
        assert_eq!(paypay.currency, "JPY");
        assert!(paypay.icon.as_deref().unwrap().starts_with(ICON_BASE));
        assert!(find(&catalogue, "BITCOIN").is_none());
    }
}
