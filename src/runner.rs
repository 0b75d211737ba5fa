//! Sequential execution of the suite with a JSON report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::scenario::{self, matrix, ScenarioCase, PRICING_CASES, REGISTRATION_CASE};
use crate::session::SessionContext;
use crate::{Result, Step};

/// Outcome of one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub id: String,
    pub success: bool,
    /// Flow step the case stopped in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    pub duration_ms: u64,
}

impl CaseReport {
    pub fn new(
        id: &str,
        outcome: Result<()>,
        screenshot: Option<PathBuf>,
        duration_ms: u64,
    ) -> Self {
        match outcome {
            Ok(()) => Self {
                id: id.to_string(),
                success: true,
                step: None,
                error: None,
                screenshot: None,
                duration_ms,
            },
            Err(e) => Self {
                id: id.to_string(),
                success: false,
                step: e.step(),
                error: Some(e.root().to_string()),
                screenshot,
                duration_ms,
            },
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn push(&mut self, case: CaseReport) {
        self.total += 1;
        if case.success {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.cases.push(case);
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| !c.success)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Runs cases one at a time, each in its own tab.
pub struct Runner<'s> {
    session: &'s SessionContext,
}

impl<'s> Runner<'s> {
    pub fn new(session: &'s SessionContext) -> Self {
        Self { session }
    }

    /// Pricing matrix cases whose id contains `filter` (all when `None`).
    pub fn pricing_cases(filter: Option<&str>) -> Vec<ScenarioCase<'static>> {
        matrix(PRICING_CASES)
            .into_iter()
            .filter(|c| filter.map_or(true, |f| c.id().contains(f)))
            .collect()
    }

    pub async fn run_pricing(&self, filter: Option<&str>) -> SuiteReport {
        let start = Instant::now();
        let mut report = SuiteReport::default();
        for case in Self::pricing_cases(filter) {
            report.push(self.run_case(&case).await);
        }
        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    pub async fn run_case(&self, case: &ScenarioCase<'_>) -> CaseReport {
        let id = case.id();
        info!("case {}", id);
        let handle = match self.session.open_page().await {
            Ok(h) => h,
            Err(e) => return CaseReport::new(&id, Err(e), None, 0),
        };
        let outcome = scenario::run_pricing_case(handle.page(), self.session.config(), case)
            .await
            .map(|_| ());
        log_outcome(&id, &outcome);
        self.session.finish_case(handle, &id, outcome).await
    }

    pub async fn run_registration(&self) -> CaseReport {
        info!("case {}", REGISTRATION_CASE);
        let handle = match self.session.open_page().await {
            Ok(h) => h,
            Err(e) => return CaseReport::new(REGISTRATION_CASE, Err(e), None, 0),
        };
        let outcome =
            scenario::run_registration(handle.page(), self.session.config(), Utc::now()).await;
        log_outcome(REGISTRATION_CASE, &outcome);
        self.session
            .finish_case(handle, REGISTRATION_CASE, outcome)
            .await
    }
}

fn log_outcome(id: &str, outcome: &Result<()>) {
    match outcome {
        Ok(()) => info!("PASS {}", id),
        Err(e) => warn!("FAIL {}: {}", id, e),
    }
}
