use super::pricing_section::{self, PricingSection};
use crate::driver::Driver;
use crate::locator::Locator;
use crate::wait::WaitPolicy;
use crate::Result;

/// The landing page; carries the pricing block below the fold.
pub struct HomePage<'a, D> {
    pricing: PricingSection<'a, D>,
}

impl<'a, D: Driver> HomePage<'a, D> {
    pub fn new(driver: &'a D, policy: WaitPolicy) -> Self {
        Self {
            pricing: PricingSection::new(driver, Locator::css(pricing_section::ROOT), policy),
        }
    }

    pub fn pricing(&mut self) -> &mut PricingSection<'a, D> {
        &mut self.pricing
    }

    pub async fn open_plan(&mut self, tab: &str, item: &str, button: &str) -> Result<()> {
        self.pricing.open_plan(tab, item, button).await
    }
}

/// `/products-services/`.
pub struct PricingPage<'a, D> {
    pricing: PricingSection<'a, D>,
}

impl<'a, D: Driver> PricingPage<'a, D> {
    pub fn new(driver: &'a D, policy: WaitPolicy) -> Self {
        Self {
            pricing: PricingSection::new(driver, Locator::css(pricing_section::ROOT), policy),
        }
    }

    pub fn pricing(&mut self) -> &mut PricingSection<'a, D> {
        &mut self.pricing
    }

    pub async fn open_plan(&mut self, tab: &str, item: &str, button: &str) -> Result<()> {
        self.pricing.open_plan(tab, item, button).await
    }
}
