//! Order entry and submission.
//!
//! Orders go to the Square adapter through the generic send operation; the
//! backend owns routing, so this module only builds the payload and keeps
//! the form state honest.

use tracing::info;

use crate::error::{FlowError, ValidationError};
use crate::models::{Order, OrderConfirmation, OrderItem, PaymentMethod};
use crate::session::SessionContext;

/// System and endpoint the order payload is routed through.
pub const ORDER_SYSTEM: &str = "square";
pub const ORDER_ENDPOINT: &str = "orders/create";

/// Order form with at least one item row at all times.
pub struct OrderDraft {
    ctx: SessionContext,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    delivery_address: String,
    notes: String,
    payment_method: PaymentMethod,
    items: Vec<OrderItem>,
    submitting: bool,
    form_error: Option<String>,
    confirmation: Option<OrderConfirmation>,
}

fn blank_item() -> OrderItem {
    OrderItem {
        name: String::new(),
        quantity: 1,
        price: 0.0,
    }
}

impl OrderDraft {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            customer_name: String::new(),
            customer_email: String::new(),
            customer_phone: String::new(),
            delivery_address: String::new(),
            notes: String::new(),
            payment_method: PaymentMethod::default(),
            items: vec![blank_item()],
            submitting: false,
            form_error: None,
            confirmation: None,
        }
    }

    pub fn set_customer_name(&mut self, value: impl Into<String>) {
        if self.submitting {
            return;
        }
        self.customer_name = value.into();
    }

    pub fn set_customer_email(&mut self, value: impl Into<String>) {
        if self.submitting {
            return;
        }
        self.customer_email = value.into();
    }

    pub fn set_customer_phone(&mut self, value: impl Into<String>) {
        if self.submitting {
            return;
        }
        self.customer_phone = value.into();
    }

    pub fn set_delivery_address(&mut self, value: impl Into<String>) {
        if self.submitting {
            return;
        }
        self.delivery_address = value.into();
    }

    pub fn set_notes(&mut self, value: impl Into<String>) {
        if self.submitting {
            return;
        }
        self.notes = value.into();
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        if self.submitting {
            return;
        }
        self.payment_method = method;
    }

    pub fn add_item(&mut self) {
        if self.submitting {
            return;
        }
        self.items.push(blank_item());
    }

    /// Remove an item row. Removing the last remaining row is a no-op so the
    /// form never ends up empty.
    pub fn remove_item(&mut self, index: usize) {
        if self.submitting || self.items.len() <= 1 || index >= self.items.len() {
            return;
        }
        self.items.remove(index);
    }

    pub fn set_item_name(&mut self, index: usize, name: impl Into<String>) {
        if self.submitting {
            return;
        }
        if let Some(item) = self.items.get_mut(index) {
            item.name = name.into();
        }
    }

    pub fn set_item_quantity(&mut self, index: usize, quantity: u32) {
        if self.submitting {
            return;
        }
        if let Some(item) = self.items.get_mut(index) {
            item.quantity = quantity;
        }
    }

    pub fn set_item_price(&mut self, index: usize, price: f64) {
        if self.submitting {
            return;
        }
        if let Some(item) = self.items.get_mut(index) {
            item.price = price;
        }
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn confirmation(&self) -> Option<&OrderConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Running total across all item rows.
    pub fn total(&self) -> f64 {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// The total as the two-decimal string shown to the user.
    pub fn total_display(&self) -> String {
        format!("{:.2}", self.total())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        if self.customer_name.trim().is_empty() {
            issues.push("customer name is required".to_string());
        }
        for (index, item) in self.items.iter().enumerate() {
            let row = index + 1;
            if item.name.trim().is_empty() {
                issues.push(format!("item {} needs a name", row));
            }
            if item.quantity < 1 {
                issues.push(format!("item {} needs a quantity of at least 1", row));
            }
            // NaN and infinity sail past a plain `> 0.0` check
            if !item.price.is_finite() || item.price <= 0.0 {
                issues.push(format!("item {} needs a price above zero", row));
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::from_issues(issues))
        }
    }

    fn build_order(&self) -> Order {
        let optional = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Order {
            customer_name: self.customer_name.trim().to_string(),
            customer_email: optional(&self.customer_email),
            customer_phone: optional(&self.customer_phone),
            delivery_address: optional(&self.delivery_address),
            notes: optional(&self.notes),
            items: self.items.clone(),
            payment_method: self.payment_method,
        }
    }

    /// Validate and submit the order.
    ///
    /// Validation failures surface as one combined message and never reach
    /// the network. A submission failure keeps every entered value so the
    /// user can correct and resend; success resets the form and keeps the
    /// confirmation for display.
    pub async fn submit(&mut self) -> Result<OrderConfirmation, FlowError> {
        if self.submitting {
            return Err(ValidationError::new("A request is already in flight").into());
        }
        if let Err(invalid) = self.validate() {
            self.form_error = Some(invalid.message().to_string());
            return Err(invalid.into());
        }

        let order = self.build_order();
        self.submitting = true;
        self.form_error = None;
        let result = self
            .ctx
            .client
            .send(ORDER_SYSTEM, ORDER_ENDPOINT, &order)
            .await;
        self.submitting = false;

        match result {
            Ok(body) => {
                // Confirmation fields are best-effort; an unrecognized body
                // still counts as an accepted order.
                let confirmation: OrderConfirmation =
                    serde_json::from_value(body).unwrap_or_default();
                info!(order_id = %confirmation.order_id, "order submitted");
                let notice = if confirmation.order_id.is_empty() {
                    "Order submitted".to_string()
                } else {
                    format!("Order {} submitted", confirmation.order_id)
                };
                self.ctx.notices.post_success(notice);
                self.reset();
                self.confirmation = Some(confirmation.clone());
                Ok(confirmation)
            }
            Err(submit_error) => {
                let message = submit_error.user_message("Order submission failed");
                self.form_error = Some(message.clone());
                self.ctx.notices.post_error(message);
                Err(submit_error.into())
            }
        }
    }

    fn reset(&mut self) {
        self.customer_name.clear();
        self.customer_email.clear();
        self.customer_phone.clear();
        self.delivery_address.clear();
        self.notes.clear();
        self.payment_method = PaymentMethod::default();
        self.items = vec![blank_item()];
        self.form_error = None;
    }
}
