//! # bilirename
//!
//! Renames the numbered directories a Bilibili downloader leaves behind
//! (one per video identifier) to names built from each video's title and
//! publish date. Nothing is renamed unless every identifier resolved.

mod cli;
mod error;
mod prompt;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use crate::prompt::{Answer, confirm};
use bilirename_api::ViewClient;
use bilirename_config::Config;
use bilirename_library::resolve::Resolution;
use bilirename_library::{
    Abort, ApplyEvent, Context, NameGenerator, Plan, ResolveEvent, apply_all, build_plan, enumerate, run_batches,
};
use bilirename_storage::backend::LocalBackend;
use clap::Parser;
use exn::ResultExt;
use std::io;
use std::process::ExitCode;
use time::UtcOffset;
use tokio::runtime::Builder;

enum Outcome {
    Done,
    Cancelled,
    Aborted,
    RenameFailed,
}
impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done | Outcome::Cancelled => ExitCode::SUCCESS,
            Outcome::Aborted => ExitCode::from(2),
            Outcome::RenameFailed => ExitCode::from(3),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    // Only reliable while the process is single-threaded, so read it before
    // the runtime exists.
    let local_offset = UtcOffset::current_local_offset().unwrap_or_else(|_| {
        tracing::warn!("Could not determine the local UTC offset, using UTC");
        UtcOffset::UTC
    });

    match run(&cli, local_offset) {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: &Cli, local_offset: UtcOffset) -> Result<Outcome> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides()).or_raise(|| ErrorKind::Config)?;
    let offset = config.utc_offset().or_raise(|| ErrorKind::Config)?.unwrap_or(local_offset);
    let generator = NameGenerator::new(&config.template, offset).or_raise(|| ErrorKind::Config)?;
    let ctx = Context::new(generator).with_skip_unresolved(config.skip_unresolved);
    let backend = LocalBackend::new("root", &config.root).or_raise(|| ErrorKind::Storage)?;
    let client = ViewClient::new(config.api.client_options()).or_raise(|| ErrorKind::Client)?;
    let runtime = Builder::new_multi_thread().enable_all().build().or_raise(|| ErrorKind::Runtime)?;

    let ids = runtime.block_on(enumerate(&backend, config.numeric_only)).or_raise(|| ErrorKind::Enumerate)?;
    let ids = config.limit.apply(ids);
    if ids.is_empty() {
        println!("No identifier directories found in {}", config.root.display());
        return Ok(Outcome::Done);
    }
    println!("Resolving {} identifiers (limit: {})", ids.len(), config.limit);

    let result = runtime.block_on(run_batches(&client, &ids, config.window_size, config.max_attempts, print_progress));
    let pairs = match build_plan(&result, &ctx).or_raise(|| ErrorKind::Plan)? {
        Plan::Ready(pairs) => pairs,
        Plan::Aborted(abort) => {
            print_abort(&abort, config.max_attempts);
            return Ok(Outcome::Aborted);
        },
    };
    if pairs.is_empty() {
        println!("\nNothing to rename");
        return Ok(Outcome::Done);
    }

    println!("\nRename preview:");
    for pair in &pairs {
        println!("{pair}");
    }
    if cli.dry_run {
        return Ok(Outcome::Done);
    }
    if !cli.yes {
        let answer = confirm(&mut io::stdin().lock(), &mut io::stdout(), "\nProceed with renaming? [y/n]")
            .or_raise(|| ErrorKind::Prompt)?;
        if answer == Answer::Cancel {
            println!("Cancelled, nothing was renamed");
            return Ok(Outcome::Cancelled);
        }
    }

    let summary = runtime.block_on(apply_all(&backend, pairs, print_apply));
    println!(
        "\n{} renamed, {} already correct, {} failed",
        summary.renamed.len(),
        summary.unchanged.len(),
        summary.failed.len()
    );
    Ok(if summary.is_success() { Outcome::Done } else { Outcome::RenameFailed })
}

fn print_progress(event: &ResolveEvent) {
    match event {
        ResolveEvent::Resolved { progress, resolution } => {
            println!("Progress: {progress}");
            if let Resolution::Resolved(info) = resolution {
                println!("AID: {}, title: {}, published: {}", info.aid, info.title, info.pubdate);
            }
        },
        ResolveEvent::WindowComplete { window, size } => println!("Window {window} complete, {size} identifiers"),
        _ => {},
    }
}

fn print_abort(abort: &Abort, max_attempts: u32) {
    if !abort.errors.is_empty() {
        println!("\nThe following identifiers still returned an error after {max_attempts} attempts:");
        for error in &abort.errors {
            println!("AID: {}, code: {}", error.id, error.code);
        }
    }
    if !abort.unresolved.is_empty() {
        println!("\nThe following identifiers could not be looked up:");
        for unresolved in &abort.unresolved {
            println!("AID: {}, after {} attempts: {}", unresolved.id, unresolved.attempts, unresolved.last_failure);
        }
    }
    println!("Some lookups failed, nothing was renamed");
}

fn print_apply(event: &ApplyEvent) {
    match event {
        ApplyEvent::Renamed(pair) => println!("Renamed: {pair}"),
        ApplyEvent::AlreadyCorrect(pair) => println!("Already correct: {}", pair.source),
        ApplyEvent::Failed(pair, e) => {
            println!("Rename failed: {pair}");
            eprintln!("{e:?}");
        },
    }
}
