//! Command line surface of polyreach
//!
//! polyreach uses the `clap` crate to parse command line arguments. This
//! module defines the available flags, the logger setup, the progress bar
//! rendering and the top-level analysis driver glueing parser, engine and
//! output formatting together.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Error};
use clap::Parser;
use log::{info, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use polyreach_engine::{
    estimate_synthesis_steps, Analyzer, EngineError, Flowpipe, Model, ProblemType,
    ProgressAccounter,
};
use polyreach_geometry::PolytopesUnion;
use polyreach_parser::model_format::ModelFormatParser;
use polyreach_parser::ParseModel;

mod output_formats;

/// Number of columns of the progress bar
const BAR_LENGTH: usize = 50;

/// Reachability computation and STL parameter synthesis for polynomial
/// dynamical systems
///
/// polyreach reads a model description and either computes a flowpipe of
/// reachable-set over-approximations or refines the model's parameter
/// region against its STL specification.
#[derive(Parser, Debug)]
#[command(version, name = "polyreach", about)]
pub struct Cli {
    /// Write the results as JSON instead of plain text
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Display a progress bar on standard error
    #[arg(short = 'b', long = "progress")]
    pub progress: bool,

    /// Number of worker threads (default: one per core)
    #[arg(short = 't', long = "threads", value_name = "N")]
    pub threads: Option<usize>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Input file; "-" or no argument reads standard input
    pub input: Option<PathBuf>,
}

/// Initialize the stderr logger at the requested verbosity
pub fn initialize_logger(verbose: u8) -> Result<(), Error> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l})} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Read the model text from a file, or from standard input for `-`
pub fn read_input(path: Option<&Path>) -> Result<String, Error> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Could not read input file '{}'", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Could not read standard input")?;
            Ok(buffer)
        }
    }
}

/// A progress bar polling an accounter from a helper thread
struct ProgressBar {
    stop: Arc<AtomicBool>,
    handle: std::thread::JoinHandle<()>,
}

impl ProgressBar {
    fn spawn(progress: Arc<ProgressAccounter>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                render(progress.fraction());
                std::thread::sleep(Duration::from_millis(100));
            }
            render(1.0);
            eprintln!();
        });
        ProgressBar { stop, handle }
    }

    fn finish(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

fn render(fraction: f64) {
    let filled = (fraction * BAR_LENGTH as f64).round() as usize;
    let bar: String = (0..BAR_LENGTH)
        .map(|i| if i < filled { '#' } else { ' ' })
        .collect();
    eprint!("\r[{bar}] {:3.0}%", fraction * 100.0);
    let _ = std::io::stderr().flush();
}

/// Parse the model and run the requested analysis
pub fn run_analysis(cli: &Cli, input: &str) -> Result<(), Error> {
    let model = ModelFormatParser.parse_model(input)?;
    let threads = cli.threads.unwrap_or(0);
    let analyzer = Analyzer::new(&model, threads)?;

    match model.problem {
        ProblemType::Reach => {
            let progress = cli
                .progress
                .then(|| Arc::new(ProgressAccounter::new(u64::from(model.options.horizon))));
            let bar = progress.as_ref().map(|p| ProgressBar::spawn(Arc::clone(p)));

            let flowpipe = analyzer.reach(progress.as_deref())?;

            if let Some(bar) = bar {
                bar.finish();
            }
            info!("computed a flowpipe of {} steps", flowpipe.len());
            write_reach_output(cli, &model, &flowpipe)?;
        }
        ProblemType::Synth => {
            let progress = cli.progress.then(|| {
                Arc::new(ProgressAccounter::new(synthesis_steps_estimate(&model)))
            });
            let bar = progress.as_ref().map(|p| ProgressBar::spawn(Arc::clone(p)));

            let refined = analyzer.synthesize(progress.as_deref())?;
            let results = refinement_flowpipes(&analyzer, &model, refined, progress.as_deref())?;

            if let Some(bar) = bar {
                bar.finish();
            }
            info!("synthesis produced {} refinements", results.len());
            write_synthesis_output(cli, &model, &results)?;
        }
    }
    Ok(())
}

fn synthesis_steps_estimate(model: &Model) -> u64 {
    let formula_end = model
        .specification
        .as_ref()
        .map(|spec| spec.time_bounds().end())
        .unwrap_or(0);
    estimate_synthesis_steps(
        model.options.max_param_splits,
        model.system.parameters().len(),
        formula_end,
        model.options.horizon,
    )
}

/// Compute one flowpipe per refined parameter region
///
/// The refinements are independent, so the flowpipes are computed as one
/// batch on the analyzer's worker pool.
fn refinement_flowpipes(
    analyzer: &Analyzer,
    model: &Model,
    refined: Vec<PolytopesUnion>,
    progress: Option<&ProgressAccounter>,
) -> Result<Vec<(PolytopesUnion, Flowpipe)>, Error> {
    let flowpipes: Mutex<Vec<Option<Result<Flowpipe, EngineError>>>> =
        Mutex::new((0..refined.len()).map(|_| None).collect());

    let mut batch = analyzer.worker_pool().create_batch();
    for (index, union) in refined.iter().enumerate() {
        let flowpipes = &flowpipes;
        batch.submit(move || {
            let flowpipe = analyzer.reach_from(
                &model.initial_set,
                union,
                model.options.horizon,
                progress,
            );
            flowpipes.lock().unwrap()[index] = Some(flowpipe);
        });
    }
    batch.join();

    let flowpipes = flowpipes.into_inner().unwrap_or_else(|e| e.into_inner());
    let mut results = Vec::with_capacity(refined.len());
    for (union, flowpipe) in refined.into_iter().zip(flowpipes) {
        let flowpipe = flowpipe.expect("every batch task stores its result")?;
        results.push((union, flowpipe));
    }
    Ok(results)
}

fn write_reach_output(cli: &Cli, model: &Model, flowpipe: &Flowpipe) -> Result<(), Error> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        let output = output_formats::reach_output(model, flowpipe);
        writeln!(out, "{}", serde_json::to_string(&output)?)?;
    } else {
        writeln!(out, "{}", output_formats::plain_reach(flowpipe))?;
    }
    Ok(())
}

fn write_synthesis_output(
    cli: &Cli,
    model: &Model,
    results: &[(PolytopesUnion, Flowpipe)],
) -> Result<(), Error> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        let output = output_formats::synthesis_output(model, results);
        writeln!(out, "{}", serde_json::to_string(&output)?)?;
    } else {
        writeln!(out, "{}", output_formats::plain_synthesis(results))?;
    }
    Ok(())
}
