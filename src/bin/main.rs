use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pricing_e2e::api::ApiContext;
use pricing_e2e::{seo, Config, Params, Runner, SessionContext, SuiteReport};
use seo_baseline::SeoStore;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pricing-e2e")]
#[command(about = "End-to-end checks for the pricing and registration flows")]
#[command(version)]
struct Cli {
    /// Suite file (defaults to the built-in suite)
    #[arg(long, global = true)]
    suite: Option<PathBuf>,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE", global = true)]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pricing matrix and the registration case
    Run {
        /// Only run cases whose id contains this text
        #[arg(short = 'k', value_name = "FILTER")]
        filter: Option<String>,

        /// Run in headless mode (overrides config)
        #[arg(long)]
        headless: bool,

        /// Leave out the registration case
        #[arg(long)]
        skip_registration: bool,
    },
    /// Validate config and list case ids
    Check,
    /// SEO baseline of the pages listed in the sitemap
    Seo {
        #[command(subcommand)]
        action: SeoAction,
    },
    /// Auxiliary API
    Api {
        #[command(subcommand)]
        action: ApiAction,
    },
}

#[derive(Subcommand)]
enum SeoAction {
    /// Capture every page and store it as the new baseline
    Refresh {
        #[arg(long, default_value = "seo.db")]
        db: PathBuf,
    },
    /// Capture every page and report drift from the baseline
    Compare {
        #[arg(long, default_value = "seo.db")]
        db: PathBuf,
    },
}

#[derive(Subcommand)]
enum ApiAction {
    /// Authenticated GET, printing the JSON response
    Get { path: String },
}

fn load_config(cli: &Cli) -> pricing_e2e::Result<Config> {
    let params = Params::from_env().merge(Params::from_args(&cli.params)?);
    match &cli.suite {
        Some(path) => Config::load_with_params(path, &params),
        None => Config::default_suite(&params),
    }
}

fn print_report(report: &SuiteReport) {
    println!();
    for case in &report.cases {
        if case.success {
            println!("✓ {}", case.id);
        } else {
            println!("✗ {}", case.id);
            if let Some(step) = case.step {
                println!("  Step: {}", step);
            }
            if let Some(ref error) = case.error {
                println!("  Error: {}", error);
            }
            if let Some(ref shot) = case.screenshot {
                println!("  Screenshot: {}", shot.display());
            }
        }
    }
    println!();
    println!(
        "{} passed, {} failed ({}ms)",
        report.passed, report.failed, report.duration_ms
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Check => {
            println!("Config valid: {}", config.name);
            println!("  Base URL: {}", config.base_url);
            if !config.params.is_empty() {
                println!("  Parameters: {}", config.params.len());
                let mut names: Vec<_> = config.params.iter().collect();
                names.sort_by_key(|(name, _)| name.as_str());
                for (name, def) in names {
                    let req = if def.required { " (required)" } else { "" };
                    let desc = def.description.as_deref().unwrap_or("");
                    println!("    - {}{}: {}", name, req, desc);
                }
            }
            let cases = Runner::pricing_cases(None);
            println!("  Cases: {}", cases.len() + 1);
            for case in cases {
                println!("    {}", case.id());
            }
            println!("    {}", pricing_e2e::scenario::REGISTRATION_CASE);
        }

        Command::Run {
            filter,
            headless,
            skip_registration,
        } => {
            if headless {
                config.browser.headless = true;
            }
            println!("Running: {}", config.name);

            let session = SessionContext::launch(config).await?;
            let runner = Runner::new(&session);
            let mut report = runner.run_pricing(filter.as_deref()).await;
            let wanted = filter
                .as_deref()
                .map_or(true, |f| pricing_e2e::scenario::REGISTRATION_CASE.contains(f));
            if !skip_registration && wanted {
                let case = runner.run_registration().await;
                report.duration_ms += case.duration_ms;
                report.push(case);
            }

            let path = session.dirs().report_path();
            report.write_json(&path)?;
            session.shutdown().await?;

            print_report(&report);
            println!("Report: {}", path.display());
            if !report.success() {
                std::process::exit(1);
            }
        }

        Command::Seo { action } => {
            let urls = seo::sitemap_urls(&config).await?;
            let session = SessionContext::launch(config).await?;
            let handle = session.open_page().await?;

            let outcome = match action {
                SeoAction::Refresh { db } => {
                    let store = SeoStore::open(&db)?;
                    seo::refresh_baseline(handle.page(), session.config(), &store, &urls)
                        .await
                        .map(|n| {
                            println!("Stored {} of {} page(s) in {}", n, urls.len(), db.display());
                            true
                        })
                }
                SeoAction::Compare { db } => {
                    let store = SeoStore::open(&db)?;
                    seo::compare_baseline(handle.page(), session.config(), &store, &urls)
                        .await
                        .map(|report| {
                            for drift in &report.drifts {
                                println!("✗ {}", drift);
                            }
                            for url in &report.missing_baseline {
                                println!("? {} has no baseline", url);
                            }
                            for url in &report.missing_pages {
                                println!("? {} was not captured", url);
                            }
                            if report.is_clean() {
                                println!("✓ {} page(s) match the baseline", urls.len());
                            }
                            report.is_clean()
                        })
                }
            };
            session.shutdown().await?;
            if !outcome? {
                std::process::exit(1);
            }
        }

        Command::Api {
            action: ApiAction::Get { path },
        } => {
            let api = ApiContext::new(&config.api)?;
            let body: serde_json::Value = api.get_json(&path).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
