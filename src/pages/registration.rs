//! `/auth/register`: the sign-up form gated by a reCAPTCHA checkbox.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::BasePage;
use crate::config::{TestUser, Timeouts};
use crate::driver::Driver;
use crate::locator::{act, Locator, Operation, Target};
use crate::wait::{self, WaitPolicy};
use crate::{Error, Result, Step, StepExt};

const FIRST_NAME: &str = r#"input[placeholder="First Name"]"#;
const LAST_NAME: &str = r#"input[placeholder="Last Name"]"#;
const EMAIL: &str = r#"input[placeholder="Email Address"]"#;
const PASSWORD: &str = r#"input[placeholder="Password"]"#;
const CONFIRM_PASSWORD: &str = r#"input[placeholder="Confirm Password"]"#;
const ACCEPT_TERMS: &str = "label.checkbox";
const CHALLENGE_FRAME: &str = r#"iframe[title="reCAPTCHA"]"#;
const CHALLENGE_ANCHOR: &str = "#recaptcha-anchor";
const SUBMIT: &str = "Get Started";

/// Values typed into the form.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    /// A fresh sign-up for `user`, with a per-run email.
    pub fn for_user(user: &TestUser, now: DateTime<Utc>) -> Result<Self> {
        if user.password.is_empty() {
            return Err(Error::ConfigMissing("TEST_USER_PASSWORD".into()));
        }
        Ok(Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.unique_email(now)?,
            password: user.password.clone(),
        })
    }
}

pub struct RegistrationPage<'a, D> {
    base: BasePage<'a, D>,
    challenge: WaitPolicy,
}

impl<'a, D: Driver> RegistrationPage<'a, D> {
    pub fn new(driver: &'a D, timeouts: &Timeouts) -> Self {
        Self {
            base: BasePage::new(driver, timeouts.expect()),
            challenge: timeouts.challenge(),
        }
    }

    pub fn accept_terms(&self) -> Locator {
        Locator::css(ACCEPT_TERMS).first()
    }

    pub fn challenge_anchor(&self) -> Locator {
        Locator::frame(CHALLENGE_FRAME).locator(CHALLENGE_ANCHOR)
    }

    pub fn submit(&self) -> Locator {
        Locator::role("button", Some(SUBMIT))
    }

    /// Fill the form, pass the challenge and submit.
    pub async fn register(&self, form: &RegistrationForm) -> Result<()> {
        info!("register {}", form.email);
        self.fill_form(form).await.at_step(Step::FormFill)?;
        self.base
            .click(self.accept_terms())
            .await
            .at_step(Step::AcceptTerms)?;

        let driver = self.base.driver();
        let anchor = self.challenge_anchor();
        wait::for_visible(driver, &anchor, &self.challenge)
            .await
            .at_step(Step::ChallengeVisible)?;
        act(driver, &Target::from(&anchor), Operation::Click, &self.challenge)
            .await
            .at_step(Step::ChallengeVisible)?;

        wait::for_attribute(driver, &anchor, "aria-checked", "true", &self.challenge)
            .await
            .at_step(Step::ChallengeChecked)?;
        debug!("challenge checked");

        let submit = self.submit();
        wait::for_enabled(driver, &submit, self.base.policy())
            .await
            .at_step(Step::SubmitEnabled)?;
        self.base.click(&submit).await.at_step(Step::Submit)
    }

    async fn fill_form(&self, form: &RegistrationForm) -> Result<()> {
        self.base.fill(FIRST_NAME, &form.first_name).await?;
        self.base.fill(LAST_NAME, &form.last_name).await?;
        self.base.fill(EMAIL, &form.email).await?;
        self.base.fill(PASSWORD, &form.password).await?;
        self.base.fill(CONFIRM_PASSWORD, &form.password).await
    }
}
