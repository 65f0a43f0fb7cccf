//! Ready-made scenario for the simulated shop: a cart-badge test that is
//! flaky for a configurable number of attempts.

use crate::artifacts::TestId;
use crate::config::Credentials;
use crate::driver::simulated::SiteModel;
use crate::lifecycle::{ensure_eq, BodyContext, BodyResult, TestItem, NEED_LOGIN};
use crate::page_object::locators;

/// Products on the inventory page
pub const PRODUCTS: [&str; 3] = [
    "[data-test='add-to-cart-sauce-labs-backpack']",
    "[data-test='add-to-cart-sauce-labs-bike-light']",
    "[data-test='add-to-cart-sauce-labs-bolt-t-shirt']",
];

/// Console error the cart page logs
pub const CART_CONSOLE_ERROR: &str = "Failed to load resource: the server responded with a status of 500";

/// Shop whose cart page logs a console error
#[must_use]
pub fn shop_site(base_url: &str, credentials: Credentials) -> SiteModel {
    SiteModel::saucedemo(base_url, credentials).with_console_error("/cart.html", CART_CONSOLE_ERROR)
}

/// The cart-badge test item
#[must_use]
pub fn cart_badge_item() -> TestItem {
    TestItem::new(TestId::new("test_cart", "test_cart_badge_counts_items").with_class("TestCart"))
        .with_marker(NEED_LOGIN)
}

/// Body adding every product and checking the badge.
///
/// Attempts `1..=fail_attempts` skip one product, so the check fails on
/// `/cart.html` with `AssertionError: 2 != 3`.
pub fn flaky_cart_body(fail_attempts: u32) -> impl FnMut(&mut BodyContext<'_>) -> BodyResult {
    move |ctx| {
        ctx.goto("/inventory.html")?;
        let added = if ctx.attempt() <= fail_attempts {
            PRODUCTS.len() - 1
        } else {
            PRODUCTS.len()
        };
        for product in &PRODUCTS[..added] {
            ctx.page().click(product)?;
        }
        let badge = ctx
            .page()
            .text_content(locators::CART_BADGE)?
            .and_then(|text| text.parse::<usize>().ok())
            .unwrap_or(0);
        ctx.page().click(locators::CART_LINK)?;
        ensure_eq(badge, PRODUCTS.len())
    }
}
