//! BodyMetrics CLI: `train` writes the artifacts, `analyze` and
//! `interactive` serve requests against them.

use anyhow::Result;
use bodymetrics::cli::{parse_query_line, Command, OutputArgs};
use bodymetrics::{
    train_and_save, viz, Args, ArtifactStore, Presenter, PresenterState, QueryPoint, Slot,
};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let store = ArtifactStore::new(&args.artifacts);
    match &args.command {
        Command::Train => {
            run_training(&store, args.verbose)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze(analyze) => {
            let query = analyze.query()?;
            let mut presenter = Presenter::open(&store, analyze.output.cluster_id);
            if !ensure_available(&presenter) {
                return Ok(ExitCode::FAILURE);
            }
            handle_request(&mut presenter, query, &analyze.output, analyze.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Interactive(output) => run_interactive(&store, output),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Run the offline fit and persist both artifacts
fn run_training(store: &ArtifactStore, verbose: bool) -> Result<()> {
    let start_time = Instant::now();
    let (scaler, model) = train_and_save(store)?;

    println!("Model and Scaler saved successfully!");
    println!("  Scaler: {}", store.path(Slot::Scaler).display());
    println!("  Model:  {}", store.path(Slot::Model).display());

    if verbose {
        viz::print_training_summary(&scaler, &model);
        println!("\nTraining time: {:.3}s", start_time.elapsed().as_secs_f64());
    }
    Ok(())
}

/// Print the asset error when the presenter could not load; returns whether
/// it is usable
fn ensure_available(presenter: &Presenter) -> bool {
    if let PresenterState::Unavailable(err) = presenter.state() {
        eprintln!("Model assets not found: {}", err);
        eprintln!("Run `bodymetrics train` first.");
        return false;
    }
    true
}

fn handle_request(
    presenter: &mut Presenter,
    query: QueryPoint,
    output: &OutputArgs,
    json: bool,
) -> Result<()> {
    let state = presenter.analyze(query)?;
    let PresenterState::Analyzed(report) = state else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        viz::print_metrics(report);
    }

    if !output.no_charts {
        let paths = viz::render_report(report, &output.out)?;
        if !json {
            println!("\nScatter chart saved to: {}", paths.scatter.display());
            println!("Dendrogram saved to: {}", paths.dendrogram.display());
        }
    }
    Ok(())
}

fn run_interactive(store: &ArtifactStore, output: &OutputArgs) -> Result<ExitCode> {
    let mut presenter = Presenter::open(store, output.cluster_id);
    if !ensure_available(&presenter) {
        return Ok(ExitCode::FAILURE);
    }

    println!("Ready for analysis. Enter biometric data as 'weight height' (empty line to quit).");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }

        // Bad input is reported and the presenter keeps its current state
        match parse_query_line(&line) {
            Ok(query) => handle_request(&mut presenter, query, output, false)?,
            Err(e) => eprintln!("Error: {}", e),
        }

        print!("> ");
        stdout.flush()?;
    }

    log::debug!(
        "Interactive session ended in state {} after {} analyses",
        presenter.state().name(),
        presenter.analyses()
    );
    Ok(ExitCode::SUCCESS)
}
