//! Stand-alone economic analysis CLI
//!
//! Loads a JSON case file (settings, components, cases), optionally merges a
//! CSV variable list into every case, runs all cases and prints a summary
//! table or a JSON report.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;

use econ_analysis::component::loader;
use econ_analysis::{AnalysisCase, AnalysisRunner, CaseReport};

#[derive(Parser)]
#[command(
    name = "econ_analysis",
    about = "Compute NPV, IRR and PI over component cash-flow models, or solve for a target metric"
)]
struct Args {
    /// JSON case file with settings, components and cases
    case_file: PathBuf,

    /// Optional CSV variable list (name,value) merged into every case
    #[arg(long)]
    variables: Option<PathBuf>,

    /// Emit a JSON report instead of the summary table
    #[arg(long)]
    json: bool,
}

fn format_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:>12.6}"),
        None => format!("{:>12}", "undefined"),
    }
}

fn print_reports(reports: &[CaseReport]) {
    println!(
        "{:<20} {:>14} {:>12} {:>12} {:>14}",
        "Case", "NPV", "IRR", "PI", "Multiplier"
    );
    println!("{}", "-".repeat(76));
    for report in reports {
        println!(
            "{:<20} {:>14.4} {} {} {}",
            report.case,
            report.metrics.npv,
            format_opt(report.metrics.irr),
            format_opt(report.metrics.pi),
            format_opt(report.multiplier),
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let case_file = loader::load_case_file(&args.case_file)
        .with_context(|| format!("loading case file {}", args.case_file.display()))?;

    let extra_variables = match &args.variables {
        Some(path) => loader::load_variables_csv(path)
            .with_context(|| format!("loading variable list {}", path.display()))?,
        None => Default::default(),
    };

    let runner = AnalysisRunner::new(case_file.settings, case_file.components)
        .context("validating configuration")?;

    // no explicit cases: run a single direct evaluation from the variable list
    let mut cases = case_file.cases;
    if cases.is_empty() {
        cases.push(AnalysisCase::evaluation("default"));
    }
    for case in &mut cases {
        for (name, value) in &extra_variables {
            case.variables.entry(name.clone()).or_insert(*value);
        }
    }

    let reports: Vec<CaseReport> = cases
        .par_iter()
        .map(|case| {
            runner
                .run_case(case)
                .with_context(|| format!("running case \"{}\"", case.name))
        })
        .collect::<anyhow::Result<_>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports);
    }

    Ok(())
}
