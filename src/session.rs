//! Browser session shared by every case of a run.

use std::path::{Path, PathBuf};
use std::time::Instant;

use eoka::{Browser, Page, StealthConfig};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::driver::Driver;
use crate::runner::CaseReport;
use crate::Result;

/// Artifact directories under `output_dir`.
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub screenshots: PathBuf,
    pub videos: PathBuf,
}

impl OutputDirs {
    /// Create the tree and clear leftovers of a previous run.
    pub fn prepare(root: &Path) -> Result<Self> {
        let dirs = Self {
            root: root.to_path_buf(),
            screenshots: root.join("screenshots"),
            videos: root.join("videos"),
        };
        std::fs::create_dir_all(&dirs.screenshots)?;
        std::fs::create_dir_all(&dirs.videos)?;

        let email_code = root.join("email_code.txt");
        if email_code.exists() {
            debug!("removing {}", email_code.display());
            std::fs::remove_file(&email_code)?;
        }
        Ok(dirs)
    }

    pub fn screenshot_path(&self, case_id: &str) -> PathBuf {
        self.screenshots.join(format!("{}.png", file_stem(case_id)))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join("report.json")
    }
}

/// Case ids carry spaces, slashes and `&`; keep them readable as file names.
fn file_stem(case_id: &str) -> String {
    case_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '[' | ']') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Save a screenshot of `driver` for a failed case. Failures to capture are
/// logged, never raised.
pub async fn capture_failure<D: Driver>(driver: &D, path: &Path) -> Option<PathBuf> {
    let data = match driver.screenshot().await {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to take screenshot: {}", e);
            return None;
        }
    };
    match std::fs::write(path, data) {
        Ok(()) => {
            info!("Saved failure screenshot to: {}", path.display());
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!("Failed to save screenshot: {}", e);
            None
        }
    }
}

/// A tab opened for one case.
pub struct PageHandle {
    page: Page,
    opened: Instant,
}

impl PageHandle {
    pub fn page(&self) -> &Page {
        &self.page
    }
}

/// Browser, config and artifact dirs for a whole run. Config is read-only
/// once launched.
pub struct SessionContext {
    browser: Browser,
    config: Config,
    dirs: OutputDirs,
}

impl SessionContext {
    pub async fn launch(config: Config) -> Result<Self> {
        let dirs = OutputDirs::prepare(&config.output_dir)?;

        let b = &config.browser;
        let stealth = StealthConfig {
            headless: b.headless,
            proxy: b.proxy.clone(),
            user_agent: b.user_agent.clone(),
            viewport_width: b.viewport.width,
            viewport_height: b.viewport.height,
            ..Default::default()
        };
        debug!(
            "Launching browser (headless: {}, viewport: {}x{})",
            b.headless, b.viewport.width, b.viewport.height
        );
        let browser = Browser::launch_with_config(stealth).await?;

        Ok(Self {
            browser,
            config,
            dirs,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dirs(&self) -> &OutputDirs {
        &self.dirs
    }

    /// A fresh tab for one case.
    pub async fn open_page(&self) -> Result<PageHandle> {
        let page = self.browser.new_blank_page().await?;
        Ok(PageHandle {
            page,
            opened: Instant::now(),
        })
    }

    /// Screenshot on failure, close the tab, build the report entry.
    pub async fn finish_case(
        &self,
        handle: PageHandle,
        case_id: &str,
        outcome: Result<()>,
    ) -> CaseReport {
        let screenshot = match &outcome {
            Err(_) => capture_failure(&handle.page, &self.dirs.screenshot_path(case_id)).await,
            Ok(()) => None,
        };
        let target_id = handle.page.target_id().to_string();
        if let Err(e) = self.browser.close_tab(&target_id).await {
            warn!("Failed to close tab {}: {}", target_id, e);
        }
        CaseReport::new(
            case_id,
            outcome,
            screenshot,
            handle.opened.elapsed().as_millis() as u64,
        )
    }

    /// Close the browser.
    pub async fn shutdown(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
