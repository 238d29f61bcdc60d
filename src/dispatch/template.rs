//! Fee alert message template.

use serde::{Deserialize, Serialize};

/// Fields rendered into a fee alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAlert {
    pub recipient_name: String,
    pub amount: String,
    pub due_date: String,
}

impl FeeAlert {
    pub fn new(
        recipient_name: impl Into<String>,
        amount: impl Into<String>,
        due_date: impl Into<String>,
    ) -> Self {
        Self {
            recipient_name: recipient_name.into(),
            amount: amount.into(),
            due_date: due_date.into(),
        }
    }
}

/// Branding applied to every alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTemplate {
    pub brand: String,
    pub currency: String,
}

impl AlertTemplate {
    pub fn new(brand: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            currency: currency.into(),
        }
    }

    pub fn render(&self, alert: &FeeAlert) -> String {
        format!(
            "*FEE ALERT: {name}*\n\n\
             Dear Parent, this is a reminder regarding the school fee for the current month.\n\n\
             *Amount:* {currency} {amount}\n\
             *Due Date:* {due}\n\n\
             Fee Voucher is available on the parent portal.\n\n\
             Please ignore if already paid. Thank you.\n\
             _Sent via {brand}_",
            name = alert.recipient_name,
            currency = self.currency,
            amount = alert.amount,
            due = alert.due_date,
            brand = self.brand,
        )
    }
}

impl Default for AlertTemplate {
    fn default() -> Self {
        Self::new("Zafeen Lyceum", "PKR")
    }
}
