//! Page objects for the site under test.
//!
//! Page objects hold locators, never element handles; every interaction goes
//! through [`act`] and re-resolves against the live page.

mod pricing_page;
mod pricing_section;
mod registration;

pub use pricing_page::{HomePage, PricingPage};
pub use pricing_section::{ItemMatch, PlanStage, PricingSection};
pub use registration::{RegistrationForm, RegistrationPage};

use crate::driver::Driver;
use crate::locator::{act, Operation, Target};
use crate::wait::WaitPolicy;
use crate::Result;

/// Shared plumbing: a driver and the auto-wait budget for interactions.
pub struct BasePage<'a, D> {
    driver: &'a D,
    policy: WaitPolicy,
}

impl<'a, D: Driver> BasePage<'a, D> {
    pub fn new(driver: &'a D, policy: WaitPolicy) -> Self {
        Self { driver, policy }
    }

    pub fn driver(&self) -> &'a D {
        self.driver
    }

    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await
    }

    /// Fill a raw selector or a scoped locator.
    pub async fn fill(&self, target: impl Into<Target>, text: &str) -> Result<()> {
        act(self.driver, &target.into(), Operation::Fill(text), &self.policy).await
    }

    /// Click a raw selector or a scoped locator.
    pub async fn click(&self, target: impl Into<Target>) -> Result<()> {
        act(self.driver, &target.into(), Operation::Click, &self.policy).await
    }
}
