//! Interactive prompts for the terminal frontend.

use anyhow::{bail, Result};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};

use crate::flows::orders::OrderDraft;
use crate::models::{Adapter, CredentialField, CredentialFieldKind, PaymentMethod};

/// Pick an adapter from the catalog.
pub fn pick_adapter(adapters: &[Adapter]) -> Result<String> {
    if adapters.is_empty() {
        bail!("no adapters available");
    }
    let labels: Vec<String> = adapters
        .iter()
        .map(|adapter| format!("{} ({})", adapter.name, adapter.id))
        .collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Adapter")
        .default(0)
        .items(&labels)
        .interact()?;
    Ok(adapters[index].id.clone())
}

/// Prompt for one credential value, masking password fields. Empty values
/// are allowed; the backend decides what it actually requires.
pub fn credential_value(field: &CredentialField) -> Result<String> {
    let theme = ColorfulTheme::default();
    if let Some(description) = &field.description {
        println!("{}", style(description).dim());
    }
    let prompt = match &field.placeholder {
        Some(placeholder) => format!("{} (e.g. {})", field.label, placeholder),
        None => field.label.clone(),
    };
    let value = match field.kind {
        CredentialFieldKind::Password => Password::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?,
        CredentialFieldKind::Text => Input::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?,
    };
    Ok(value)
}

/// Walk through the order form field by field.
pub fn fill_order(draft: &mut OrderDraft) -> Result<()> {
    let theme = ColorfulTheme::default();

    let name: String = Input::with_theme(&theme)
        .with_prompt("Customer name")
        .interact_text()?;
    draft.set_customer_name(name);

    let phone: String = Input::with_theme(&theme)
        .with_prompt("Phone")
        .allow_empty(true)
        .interact_text()?;
    draft.set_customer_phone(phone);

    let email: String = Input::with_theme(&theme)
        .with_prompt("Email")
        .allow_empty(true)
        .interact_text()?;
    draft.set_customer_email(email);

    let address: String = Input::with_theme(&theme)
        .with_prompt("Delivery address")
        .allow_empty(true)
        .interact_text()?;
    draft.set_delivery_address(address);

    let mut index = 0;
    loop {
        println!("{}", style(format!("Item {}", index + 1)).bold());
        let item_name: String = Input::with_theme(&theme)
            .with_prompt("  Name")
            .interact_text()?;
        draft.set_item_name(index, item_name);

        let quantity: u32 = Input::with_theme(&theme)
            .with_prompt("  Quantity")
            .default(1)
            .interact_text()?;
        draft.set_item_quantity(index, quantity);

        let price: f64 = Input::with_theme(&theme)
            .with_prompt("  Price")
            .interact_text()?;
        draft.set_item_price(index, price);

        if !Confirm::with_theme(&theme)
            .with_prompt("Add another item?")
            .default(false)
            .interact()?
        {
            break;
        }
        draft.add_item();
        index += 1;
    }

    let labels: Vec<&str> = PaymentMethod::ALL
        .iter()
        .map(|method| method.label())
        .collect();
    let selection = Select::with_theme(&theme)
        .with_prompt("Payment method")
        .default(0)
        .items(&labels)
        .interact()?;
    draft.set_payment_method(PaymentMethod::ALL[selection]);

    let notes: String = Input::with_theme(&theme)
        .with_prompt("Notes")
        .allow_empty(true)
        .interact_text()?;
    draft.set_notes(notes);

    println!("Total: {}", style(draft.total_display()).bold());
    Ok(())
}
