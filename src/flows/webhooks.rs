//! Webhook registration form.

use tracing::info;

use crate::error::{FlowError, ValidationError};
use crate::models::{RegistrationReceipt, WebhookEventKind, WebhookRegistration};
use crate::session::SessionContext;

/// Form state for registering a webhook endpoint.
///
/// Registration does not refresh the event list; new deliveries show up
/// through the monitor's next poll.
pub struct WebhookForm {
    ctx: SessionContext,
    path: String,
    description: String,
    events: Vec<WebhookEventKind>,
    submitting: bool,
    form_error: Option<String>,
}

impl WebhookForm {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            path: String::new(),
            description: String::new(),
            events: Vec::new(),
            submitting: false,
            form_error: None,
        }
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        if self.submitting {
            return;
        }
        self.path = path.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        if self.submitting {
            return;
        }
        self.description = description.into();
    }

    pub fn set_events(&mut self, events: Vec<WebhookEventKind>) {
        if self.submitting {
            return;
        }
        self.events = events;
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn events(&self) -> &[WebhookEventKind] {
        &self.events
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Submit the registration. A blank path fails locally without issuing a
    /// request; on success the form resets for the next registration.
    pub async fn submit(&mut self) -> Result<RegistrationReceipt, FlowError> {
        if self.submitting {
            return Err(ValidationError::new("A request is already in flight").into());
        }
        let path = self.path.trim().to_string();
        if path.is_empty() {
            let invalid = ValidationError::new("Webhook path is required");
            self.form_error = Some(invalid.message().to_string());
            return Err(invalid.into());
        }

        let description = self.description.trim();
        let registration = WebhookRegistration {
            path: path.clone(),
            description: (!description.is_empty()).then(|| description.to_string()),
            events: self.events.clone(),
        };

        self.submitting = true;
        self.form_error = None;
        let result = self.ctx.client.register_webhook(&registration).await;
        self.submitting = false;

        match result {
            Ok(receipt) => {
                info!(webhook_id = %receipt.id, path = %path, "webhook registered");
                self.ctx
                    .notices
                    .post_success(format!("Registered webhook {}", path));
                self.path.clear();
                self.description.clear();
                self.events.clear();
                Ok(receipt)
            }
            Err(register_error) => {
                let message = register_error.user_message("Webhook registration failed");
                self.form_error = Some(message.clone());
                self.ctx.notices.post_error(message);
                Err(register_error.into())
            }
        }
    }
}
