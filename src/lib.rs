//! # pricing-e2e
//!
//! End-to-end browser tests for the pricing and registration flows. Page objects
//! compose lazy [`Locator`]s, drive them through a [`Driver`] (implemented for
//! `eoka::Page`), and every wait is a bounded poll.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pricing_e2e::{Config, Params, Runner, SessionContext};
//!
//! # #[tokio::main]
//! # async fn main() -> pricing_e2e::Result<()> {
//! let config = Config::default_suite(&Params::from_env())?;
//! let session = SessionContext::launch(config).await?;
//! let report = Runner::new(&session).run_pricing(None).await;
//! println!("{}/{} passed", report.passed, report.total);
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
mod browser;
mod config;
pub mod driver;
pub mod locator;
pub mod pages;
mod runner;
pub mod scenario;
pub mod seo;
mod session;
pub mod wait;

#[cfg(test)]
mod testing;

use std::fmt;

pub use config::{
    ApiConfig, BrowserConfig, Config, HttpAuth, ParamDef, Params, TestUser, Timeouts, Viewport,
};
pub use driver::{Driver, ElementState};
pub use locator::{act, Locator, Operation, Target};
pub use runner::{CaseReport, Runner, SuiteReport};
pub use scenario::{EntryPoint, NavigationOutcome, ScenarioCase, ScenarioRow, PRICING_CASES};
pub use session::{OutputDirs, PageHandle, SessionContext};
pub use wait::{WaitCondition, WaitPolicy};

/// Result type for pricing-e2e operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running the suite.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("missing required config value: {0}")]
    ConfigMissing(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("seo store error: {0}")]
    Seo(#[from] seo_baseline::Error),

    #[error("{0} matched no elements")]
    NotFound(String),

    #[error("{target} matched {count} elements, expected exactly one")]
    Ambiguous { target: String, count: usize },

    #[error("{target} is not interactable: {reason}")]
    NotInteractable { target: String, reason: String },

    #[error("timed out after {after_ms}ms waiting for {condition}")]
    Timeout {
        condition: WaitCondition,
        after_ms: u64,
    },

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{step}: {source}")]
    Step { step: Step, source: Box<Error> },
}

impl Error {
    /// The underlying error with any step labels stripped.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Outermost flow step this error was raised in, if labelled.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// A step of a user flow. Errors are labelled with the step they occurred in so a
/// failing case reports where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Navigate,
    TabActivation,
    ItemResolution,
    ButtonClick,
    UrlWait,
    UrlAssertion,
    FormFill,
    AcceptTerms,
    ChallengeVisible,
    ChallengeChecked,
    SubmitEnabled,
    Submit,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Navigate => "navigate",
            Step::TabActivation => "tab activation",
            Step::ItemResolution => "item resolution",
            Step::ButtonClick => "button click",
            Step::UrlWait => "url wait",
            Step::UrlAssertion => "url assertion",
            Step::FormFill => "form fill",
            Step::AcceptTerms => "accept terms",
            Step::ChallengeVisible => "challenge visible",
            Step::ChallengeChecked => "challenge checked",
            Step::SubmitEnabled => "submit enabled",
            Step::Submit => "submit",
        };
        f.write_str(name)
    }
}

/// Attach a [`Step`] label to a failing result.
pub trait StepExt<T> {
    fn at_step(self, step: Step) -> Result<T>;
}

impl<T> StepExt<T> for Result<T> {
    fn at_step(self, step: Step) -> Result<T> {
        self.map_err(|e| match e {
            // innermost label wins; it is the most specific
            labelled @ Error::Step { .. } => labelled,
            other => Error::Step {
                step,
                source: Box::new(other),
            },
        })
    }
}
