mod config;
mod error;
mod fixture;
mod loader;
mod models;
mod password;
mod store;
mod verify;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config::Config;
use error::SeedError;
use fixture::Fixture;
use loader::Loader;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Load demonstration users, companies, jobs and applications into the job board database")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace all four collections with the demo data (the default)
    Run {
        /// Store connection string (overrides MONGO_URI)
        #[arg(long)]
        uri: Option<String>,

        /// Validate the fixture and print the plan without touching the store
        #[arg(long)]
        dry_run: bool,
    },

    /// Check a seeded store: counts, references and the shared password
    Verify {
        /// Store connection string (overrides MONGO_URI)
        #[arg(long)]
        uri: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run {
        uri: None,
        dry_run: false,
    });

    match command {
        Commands::Run { uri, dry_run } => match seed(uri, dry_run).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Seeding failed: {:#}", e);
                if let Some(step) = e.downcast_ref::<SeedError>().and_then(SeedError::step) {
                    eprintln!("Anything written before {} was kept. Rerun to start clean.", step);
                }
                ExitCode::FAILURE
            }
        },
        Commands::Verify { uri } => match check(uri).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Verification failed: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn seed(uri: Option<String>, dry_run: bool) -> Result<()> {
    let fixture = Fixture::demo();

    if dry_run {
        fixture.validate()?;
        print_plan(&fixture);
        println!("\n(Dry run - the store was not touched)");
        return Ok(());
    }

    let config = Config::from_env(uri)?;
    let loader = Loader::new(fixture, config.bcrypt_cost)?;

    let target = store::redact(&config.store_uri);
    let store = store::connect(&config.store_uri, config.database.as_deref())
        .await
        .map_err(|e| SeedError::connection(target, e))?;
    println!("Connected to {} for seeding", store.describe());

    let report = loader.run(store.as_ref()).await?;
    for (collection, deleted) in &report.cleared {
        log::info!("Cleared {} old document(s) from {}", deleted, collection);
    }

    println!("Seed data inserted successfully!");
    Ok(())
}

async fn check(uri: Option<String>) -> Result<()> {
    let config = Config::from_env(uri)?;
    let fixture = Fixture::demo();

    let target = store::redact(&config.store_uri);
    let store = store::connect(&config.store_uri, config.database.as_deref())
        .await
        .map_err(|e| SeedError::connection(target, e))?;
    println!("Verifying {}", store.describe());

    let report = verify::verify(store.as_ref(), &fixture).await?;

    println!("{:<14} {:>6}", "COLLECTION", "COUNT");
    println!("{}", "-".repeat(21));
    for (collection, count) in &report.counts {
        println!("{:<14} {:>6}", collection.name(), count);
    }

    if report.is_clean() {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        println!("\nProblems:");
        for problem in &report.problems {
            println!("  - {}", problem);
        }
        Err(anyhow!("{} problem(s) found", report.problems.len()))
    }
}

fn print_plan(fixture: &Fixture) {
    println!("Users ({}):", fixture.users.len());
    for user in &fixture.users {
        println!("  {:<18} {:<22} {}", user.fullname, user.email, user.role);
    }

    println!("\nCompanies ({}):", fixture.companies.len());
    for company in &fixture.companies {
        println!("  {:<18} owner {}", company.name, company.owner);
    }

    println!("\nJobs ({}):", fixture.jobs.len());
    for job in &fixture.jobs {
        println!(
            "  {:<22} {:<12} {:<11} ${:>7} x{}",
            truncate(job.title, 22),
            truncate(job.company, 12),
            job.job_type,
            job.salary,
            job.position
        );
    }

    println!("\nApplications ({}):", fixture.applications.len());
    for application in &fixture.applications {
        println!(
            "  {:<22} -> {:<22} {}",
            application.applicant, application.job, application.status
        );
    }
}

// Counts characters, not bytes, so accented titles never split mid-character.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
