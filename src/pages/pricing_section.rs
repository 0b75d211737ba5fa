//! The tabbed pricing block shared by the home and pricing pages.

use std::fmt;

use tracing::{debug, info};

use super::BasePage;
use crate::driver::Driver;
use crate::locator::Locator;
use crate::wait::{self, Probe, WaitCondition, WaitPolicy};
use crate::{Error, Result, Step, StepExt};

pub const ROOT: &str = "div.pricing";
const TABS: &str = "div.tabs .tab";
const TAB_LABEL: &str = "h3";
const PANELS: &str = "div.item-tab";
const CARDS: &str = "div.redbox-container";
const CARD_TITLE: &str = ".redbox-container-head .main-h2";
const CARD_CTA: &str = "div.pricing-btn button";
const MORE_LINK: &str = "More About Plan";

/// Progress of one `open_plan` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlanStage {
    Idle,
    TabSelected,
    PanelVisible,
    ItemResolved,
    ActionTriggered,
}

impl fmt::Display for PlanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStage::Idle => "idle",
            PlanStage::TabSelected => "tab selected",
            PlanStage::PanelVisible => "panel visible",
            PlanStage::ItemResolved => "item resolved",
            PlanStage::ActionTriggered => "action triggered",
        };
        f.write_str(s)
    }
}

/// Result of filtering the visible panel's cards by title.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemMatch {
    Found(Locator),
    NotFound,
    Ambiguous(usize),
}

/// Tabs, mutually exclusive panels, and the cards inside the visible one.
pub struct PricingSection<'a, D> {
    base: BasePage<'a, D>,
    root: Locator,
    stage: PlanStage,
}

impl<'a, D: Driver> PricingSection<'a, D> {
    pub fn new(driver: &'a D, root: Locator, policy: WaitPolicy) -> Self {
        Self {
            base: BasePage::new(driver, policy),
            root,
            stage: PlanStage::Idle,
        }
    }

    pub fn stage(&self) -> PlanStage {
        self.stage
    }

    pub fn tabs(&self) -> Locator {
        self.root.locator(TABS)
    }

    pub fn panels(&self) -> Locator {
        self.root.locator(PANELS)
    }

    pub fn active_panel(&self) -> Locator {
        self.panels().visible()
    }

    pub fn cards(&self) -> Locator {
        self.active_panel().locator(CARDS)
    }

    fn tab(&self, label: &str) -> Locator {
        self.tabs()
            .filter_has(&Locator::css(TAB_LABEL).has_text(label))
    }

    fn card(&self, label: &str) -> Locator {
        self.cards()
            .filter_has(&Locator::css(CARD_TITLE).has_text(label))
    }

    /// Click the tab labelled `label` and wait for its panel to be the only
    /// visible one, with its first card rendered.
    pub async fn select_tab(&mut self, label: &str) -> Result<()> {
        let label = label.trim();
        self.stage = PlanStage::Idle;
        debug!("select tab '{}'", label);

        self.base.click(self.tab(label)).await?;
        self.stage = PlanStage::TabSelected;

        let driver = self.base.driver();
        let policy = *self.base.policy();
        wait::for_visible(driver, &self.active_panel(), &policy).await?;
        wait::for_visible(driver, &self.cards().first(), &policy).await?;
        self.stage = PlanStage::PanelVisible;
        Ok(())
    }

    /// Cards of the visible panel whose title contains `label`.
    pub async fn find_item(&mut self, label: &str) -> Result<ItemMatch> {
        self.require_panel("find_item", label)?;
        let card = self.card(label);
        let found = self.base.driver().query(&card).await?;
        Ok(match found.len() {
            0 => ItemMatch::NotFound,
            1 => {
                self.stage = PlanStage::ItemResolved;
                ItemMatch::Found(card)
            }
            n => ItemMatch::Ambiguous(n),
        })
    }

    fn require_panel(&self, op: &str, label: &str) -> Result<()> {
        if self.stage < PlanStage::PanelVisible {
            return Err(Error::InvalidState(format!(
                "{}('{}') before a tab panel is visible (stage: {})",
                op, label, self.stage
            )));
        }
        Ok(())
    }

    /// Wait for the unique card titled `label` to be visible. A card that never
    /// shows up is `NotFound` at the deadline; duplicates fail at once.
    pub async fn wait_for_item(&mut self, label: &str) -> Result<Locator> {
        self.require_panel("wait_for_item", label)?;
        let driver = self.base.driver();
        let policy = *self.base.policy();
        let card = self.card(label);
        let target = || format!("card '{}'", label);

        let card_ref = &card;
        wait::poll_until(WaitCondition::Visible(card.to_string()), &policy, || async move {
            let found = driver.query(card_ref).await?;
            match found.len() {
                0 => Ok(Probe::Failing(Error::NotFound(target()))),
                1 if found[0].visible => Ok(Probe::Ready(())),
                1 => Ok(Probe::Pending),
                count => Err(Error::Ambiguous {
                    target: target(),
                    count,
                }),
            }
        })
        .await?;
        self.stage = PlanStage::ItemResolved;
        Ok(card)
    }

    /// The unique card titled `label`.
    pub async fn require_item(&mut self, label: &str) -> Result<Locator> {
        match self.find_item(label).await? {
            ItemMatch::Found(card) => Ok(card),
            ItemMatch::NotFound => Err(Error::NotFound(format!("card '{}'", label))),
            ItemMatch::Ambiguous(count) => Err(Error::Ambiguous {
                target: format!("card '{}'", label),
                count,
            }),
        }
    }

    /// The button named `button_label` inside the unique card `label`.
    pub async fn action_button(&mut self, label: &str, button_label: &str) -> Result<Locator> {
        let card = self.require_item(label).await?;
        Ok(card.get_by_role("button", Some(button_label)))
    }

    /// The CTA slot of the unique card, whatever its label.
    pub async fn cta_button(&mut self, label: &str) -> Result<Locator> {
        Ok(self.require_item(label).await?.locator(CARD_CTA))
    }

    pub async fn more_link(&mut self, label: &str) -> Result<Locator> {
        Ok(self.require_item(label).await?.locator("a").has_text(MORE_LINK))
    }

    /// Select the tab, wait for the card, click its button.
    pub async fn open_plan(&mut self, tab: &str, item: &str, button: &str) -> Result<()> {
        info!("open plan: {} / {} / {}", tab.trim(), item, button);

        self.select_tab(tab).await.at_step(Step::TabActivation)?;

        // the previous panel can still be showing while the new one renders
        let card = self.wait_for_item(item).await.at_step(Step::ItemResolution)?;

        let button = card.get_by_role("button", Some(button));
        self.base
            .click(&button)
            .await
            .at_step(Step::ButtonClick)?;
        self.stage = PlanStage::ActionTriggered;
        Ok(())
    }
}
