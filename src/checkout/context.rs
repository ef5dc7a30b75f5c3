use crate::payments::types::PayRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutAmount {
    pub currency: String,
    /// Major units as shown to the buyer
    pub value: String,
}

/// Selection made on the checkout page, passed explicitly through the flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutContext {
    pub payment_method_type: Option<String>,
    pub amount: CheckoutAmount,
    pub terminal_type: String,
    pub os_type: Option<String>,
}

impl Default for CheckoutContext {
    fn default() -> Self {
        Self::new("PAYPAY", "6000", "JPY")
    }
}

impl CheckoutContext {
    pub fn new(
        payment_method_type: impl Into<String>,
        value: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            payment_method_type: Some(payment_method_type.into()),
            amount: CheckoutAmount {
                currency: currency.into(),
                value: value.into(),
            },
            terminal_type: "WEB".to_string(),
            os_type: None,
        }
    }

    pub fn select_method(&mut self, payment_method_type: impl Into<String>) {
        self.payment_method_type = Some(payment_method_type.into());
    }

    pub fn clear_method(&mut self) {
        self.payment_method_type = None;
    }

    pub fn has_method(&self) -> bool {
        self.payment_method_type
            .as_deref()
            .is_some_and(|method| !method.trim().is_empty())
    }

    /// Body for `POST /payment/pay`, `None` while no method is selected
    pub fn pay_request(&self) -> Option<PayRequest> {
        if !self.has_method() {
            return None;
        }

        Some(PayRequest {
            amount_value: self.amount.value.clone(),
            currency: self.amount.currency.clone(),
            payment_method_type: self.payment_method_type.clone()?,
            terminal_type: self.terminal_type.clone(),
            os_type: self.os_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context() {
        let context = CheckoutContext::default();
        assert_eq!(context.payment_method_type.as_deref(), Some("PAYPAY"));
        assert_eq!(context.amount.value, "6000");
        assert_eq!(context.amount.currency, "JPY");
    }

    #[test]
    fn test_pay_request_requires_method() {
        let mut context = CheckoutContext::default();
        context.clear_method();
        assert!(context.pay_request().is_none());

        context.select_method("  ");
        assert!(context.pay_request().is_none());

        context.select_method("KONBINI");
        let request = context.pay_request().unwrap();
        assert_eq!(request.payment_method_type, "KONBINI");
        assert_eq!(request.amount_value, "6000");
        assert_eq!(request.terminal_type, "WEB");
    }
}
