//! Page objects for the shop under test.
//!
//! ## Toyota Way Application:
//! - **Poka-Yoke**: locators live in one place instead of in every test body
//! - **Muda**: login steps shared by the bootstrapper and login tests

use crate::driver::Page;
use crate::result::{SwagError, SwagResult};
use regex::Regex;
use std::time::Duration;

/// A page or component of the application under test
pub trait PageObject {
    /// URL pattern (regex) that matches this page
    fn url_pattern(&self) -> &str;

    /// Wait budget for the page to load (milliseconds)
    fn load_timeout_ms(&self) -> u64 {
        30_000
    }

    /// Page name for logs
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Login form locators
pub mod locators {
    /// Username input
    pub const USERNAME: &str = "[data-test='username']";
    /// Password input
    pub const PASSWORD: &str = "[data-test='password']";
    /// Submit button
    pub const LOGIN_BUTTON: &str = "[data-test='login-button']";
    /// Error banner
    pub const ERROR: &str = "[data-test='error']";
    /// Cart link in the header
    pub const CART_LINK: &str = "[data-test='shopping-cart-link']";
    /// Cart item count badge
    pub const CART_BADGE: &str = "[data-test='shopping-cart-badge']";
}

/// The login page
#[derive(Debug, Clone)]
pub struct LoginPage {
    login_url: String,
    success_pattern: Regex,
    timeout: Duration,
}

impl LoginPage {
    /// Login page at `login_url`, considered successful once the URL matches `success_pattern`
    pub fn new(login_url: impl Into<String>, success_pattern: &str) -> SwagResult<Self> {
        let success_pattern = Regex::new(success_pattern).map_err(|e| SwagError::Config {
            message: format!("invalid success URL pattern: {e}"),
        })?;
        Ok(Self {
            login_url: login_url.into(),
            success_pattern,
            timeout: Duration::from_secs(30),
        })
    }

    /// Set the wait budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Navigate to the login form
    pub fn open(&self, page: &mut dyn Page) -> SwagResult<()> {
        page.goto(&self.login_url)
    }

    /// Fill both fields and submit
    pub fn login(&self, page: &mut dyn Page, username: &str, password: &str) -> SwagResult<()> {
        page.fill(locators::USERNAME, username)?;
        page.fill(locators::PASSWORD, password)?;
        page.click(locators::LOGIN_BUTTON)
    }

    /// Wait until the post-login page is reached
    pub fn verify_login_success(&self, page: &mut dyn Page) -> SwagResult<()> {
        page.wait_for_url(&self.success_pattern, self.timeout)
    }

    /// Error banner text, if shown
    pub fn error_message(&self, page: &dyn Page) -> SwagResult<Option<String>> {
        page.text_content(locators::ERROR)
    }
}

impl PageObject for LoginPage {
    fn url_pattern(&self) -> &str {
        self.success_pattern.as_str()
    }

    fn load_timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn page_name(&self) -> &str {
        "LoginPage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::driver::simulated::SimulatedEngine;
    use crate::driver::{BrowserEngine, ContextOptions, LaunchOptions};

    fn login_page() -> LoginPage {
        LoginPage::new("https://shop.test/", "/inventory\\.html").unwrap()
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(LoginPage::new("https://shop.test/", "(").is_err());
    }

    #[test]
    fn test_page_object_metadata() {
        let page = login_page().with_timeout(Duration::from_millis(1500));
        assert_eq!(page.page_name(), "LoginPage");
        assert_eq!(page.load_timeout_ms(), 1500);
        assert_eq!(page.url_pattern(), "/inventory\\.html");
    }

    mod flow_tests {
        use super::*;

        #[test]
        fn test_successful_login() {
            let engine = SimulatedEngine::saucedemo("https://shop.test", Credentials::default());
            let mut browser = engine.launch(&LaunchOptions::default()).unwrap();
            let mut context = browser.new_context(&ContextOptions::new()).unwrap();
            let mut page = context.new_page().unwrap();
            let login = login_page();
            login.open(page.as_mut()).unwrap();
            login.login(page.as_mut(), "standard_user", "secret_sauce").unwrap();
            login.verify_login_success(page.as_mut()).unwrap();
        }

        #[test]
        fn test_locked_out_credentials() {
            let engine = SimulatedEngine::saucedemo("https://shop.test", Credentials::default());
            let mut browser = engine.launch(&LaunchOptions::default()).unwrap();
            let mut context = browser.new_context(&ContextOptions::new()).unwrap();
            let mut page = context.new_page().unwrap();
            let login = login_page();
            login.open(page.as_mut()).unwrap();
            login.login(page.as_mut(), "locked_out_user", "secret_sauce").unwrap();
            assert!(matches!(
                login.verify_login_success(page.as_mut()),
                Err(SwagError::Timeout { .. })
            ));
            assert!(login.error_message(page.as_ref()).unwrap().is_some());
        }
    }
}
