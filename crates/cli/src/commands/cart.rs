//! Cart commands.

use std::io::{self, Write};

use shopfront_core::{
    CanonicalId, CartState, OrderSummary, PaymentMethod, ProductReference, ShippingDetails,
};

use super::{Cart, CliError};

/// Print the cart followed by its order summary.
///
/// # Errors
///
/// Returns `CliError` if stdout cannot be written.
pub fn show(cart: &Cart, json: bool) -> Result<(), CliError> {
    let state = cart.state();
    let summary = cart.order_summary();
    let mut out = io::stdout().lock();

    if json {
        let body = serde_json::json!({
            "items": state.items,
            "coupon": state.coupon,
            "summary": summary,
            "authenticated": cart.is_authenticated(),
        });
        serde_json::to_writer_pretty(&mut out, &body)?;
        writeln!(out)?;
        return Ok(());
    }

    render(&mut out, &state, &summary, cart.is_authenticated())?;
    Ok(())
}

fn render(
    out: &mut impl Write,
    state: &CartState,
    summary: &OrderSummary,
    authenticated: bool,
) -> io::Result<()> {
    let owner = if authenticated { "account" } else { "guest" };

    if state.is_empty() {
        writeln!(out, "Your {owner} cart is empty.")?;
        return Ok(());
    }

    writeln!(out, "{owner} cart:")?;
    for item in &state.items {
        let id = item.id();
        let label = item
            .product_ref
            .snapshot()
            .and_then(|product| product.name.as_deref())
            .unwrap_or(id.as_str());
        writeln!(out, "  {label:<32} x{:<4} [{id}]", item.quantity)?;
    }
    if let Some(coupon) = &state.coupon {
        writeln!(out, "  coupon: {coupon}")?;
    }

    writeln!(out, "Items:        {}", summary.item_count)?;
    writeln!(out, "Subtotal:     {}", summary.subtotal)?;
    writeln!(out, "Tax:          {}", summary.tax)?;
    writeln!(out, "Platform fee: {}", summary.platform_fee)?;
    writeln!(out, "Total:        {}", summary.total)?;
    Ok(())
}

/// Fail unless the cart has a line for `product`.
///
/// # Errors
///
/// Returns `CliError::Usage` naming the missing product.
pub fn require_line(cart: &Cart, product: &str) -> Result<(), CliError> {
    let id = ProductReference::from(product).id();
    if cart.state().find(&id).is_some() {
        Ok(())
    } else {
        Err(not_in_cart(&id))
    }
}

/// Set a line's quantity. Zero is refused in favor of `remove`.
///
/// # Errors
///
/// Returns `CliError::Usage` for a zero quantity or a product not in the cart.
pub fn update(cart: &Cart, product: &str, quantity: u32) -> Result<(), CliError> {
    if quantity == 0 {
        return Err(CliError::Usage(format!(
            "quantity must be at least 1; use `cart remove {product}` to drop the line"
        )));
    }
    require_line(cart, product)?;
    cart.update_quantity(product, quantity);
    show(cart, false)
}

/// Re-read the account cart.
///
/// # Errors
///
/// Returns `CliError::Sync` if the fetch fails.
pub async fn refresh(cart: &Cart) -> Result<(), CliError> {
    if !cart.is_authenticated() {
        return Err(CliError::Usage(
            "not logged in; the guest cart is only stored locally".to_string(),
        ));
    }
    if !cart.refresh().await? {
        tracing::info!("Local changes pending, kept the local cart");
    }
    show(cart, false)
}

/// Place an order for the whole cart.
///
/// # Errors
///
/// Returns `CliError::Sync` if the cart is empty or a field is blank.
pub async fn checkout(
    cart: &Cart,
    name: String,
    email: String,
    address: String,
    payment: PaymentMethod,
) -> Result<(), CliError> {
    let shipping = ShippingDetails {
        name,
        email,
        address,
    };
    tracing::info!("Processing payment...");
    let confirmation = cart.complete_checkout(&shipping, payment).await?;

    let mut out = io::stdout().lock();
    writeln!(out, "Order {} placed.", confirmation.order_id)?;
    writeln!(out, "Paid {} by {payment:?}.", confirmation.summary.total)?;
    writeln!(out, "Shipping to {}, {}.", shipping.name, shipping.address)?;
    Ok(())
}

fn not_in_cart(id: &CanonicalId) -> CliError {
    CliError::Usage(format!("product {id} is not in the cart"))
}
