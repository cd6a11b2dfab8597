use std::error::Error;
use std::path::{self, PathBuf};

use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use crate::config::{ActivityBand, DatasetConfig, ProcessingProfile};
use crate::pipeline::{DatasetRun, process_datasets};
use crate::source::HttpFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    Expanded,
    PointToPoint,
    Directional,
}

impl From<ProfileArg> for ProcessingProfile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Expanded => ProcessingProfile::expanded(),
            ProfileArg::PointToPoint => ProcessingProfile::point_to_point(),
            ProfileArg::Directional => ProcessingProfile::directional(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "metaclean",
    version,
    disable_help_subcommand = true,
    about = "Clean and index email metadata datasets",
    long_about = "Download, clean, factorize, and index the Enron and Seattle email metadata datasets. Each stage is skipped when its artifact already exists under PATH/<dataset>/.",
    after_help = "Delete an artifact to force its stage (and every stage after it) to rerun."
)]
/// CLI for `metaclean`.
///
/// Common usage:
/// - Expanded multi-recipient run: `metaclean data --seattle`
/// - Point-to-point run for both datasets: `metaclean data --enron --seattle -s`
/// - Inbound and outbound indexes: `metaclean data --enron --profile directional`
struct MetacleanCli {
    #[arg(value_name = "PATH", help = "Data directory (created if missing)")]
    path: PathBuf,
    #[arg(long, help = "Process the Enron dataset")]
    enron: bool,
    #[arg(long, help = "Process the Seattle dataset")]
    seattle: bool,
    #[arg(
        short = 's',
        long,
        conflicts_with = "profile",
        help = "Single-recipient mode; shorthand for --profile point-to-point"
    )]
    single: bool,
    #[arg(long, value_enum, help = "Named processing profile (default: expanded)")]
    profile: Option<ProfileArg>,
    #[arg(
        long = "min-percentile",
        value_parser = parse_percentile,
        requires = "max_percentile",
        help = "Lower activity percentile; users below it are dropped from indexes"
    )]
    min_percentile: Option<f64>,
    #[arg(
        long = "max-percentile",
        value_parser = parse_percentile,
        requires = "min_percentile",
        help = "Upper activity percentile; users above it are dropped from indexes"
    )]
    max_percentile: Option<f64>,
}

impl MetacleanCli {
    fn datasets(&self) -> Vec<DatasetConfig> {
        let mut datasets = Vec::new();
        if self.enron {
            datasets.push(DatasetConfig::enron());
        }
        if self.seattle {
            datasets.push(DatasetConfig::seattle());
        }
        datasets
    }

    fn profile(&self) -> Result<ProcessingProfile, Box<dyn Error>> {
        let profile = match (self.single, self.profile) {
            (true, _) => ProcessingProfile::point_to_point(),
            (false, Some(arg)) => arg.into(),
            (false, None) => ProcessingProfile::default(),
        };
        let activity = match (self.min_percentile, self.max_percentile) {
            (Some(min), Some(max)) => Some(ActivityBand::new(min, max)?),
            _ => profile.activity,
        };
        Ok(profile.with_activity(activity))
    }
}

/// Parse `args_iter` (without the program name) and run the pipeline.
pub fn run<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let Some(cli) =
        parse_cli::<MetacleanCli, _>(std::iter::once("metaclean".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let data_dir = path::absolute(&cli.path)?;
    let profile = cli.profile()?;
    let runs = process_datasets(&data_dir, &cli.datasets(), &profile, &HttpFetcher)?;
    print_summary(&profile, &runs);
    Ok(())
}

fn print_summary(profile: &ProcessingProfile, runs: &[DatasetRun]) {
    println!("=== metaclean ({}) ===", profile.name);
    for run in runs {
        println!("[{}]", run.dataset);
        match &run.clean_report {
            Some(report) => println!(
                "  clean: {} -> {} events ({})",
                report.initial_rows,
                report.final_rows,
                run.paths.clean.display()
            ),
            None => println!("  clean: cached ({})", run.paths.clean.display()),
        }
        for index in &run.indexes {
            let origin = if index.cached { "cached" } else { "built" };
            println!(
                "  {} index: {} users, {origin} ({})",
                index.direction.label(),
                index.users,
                index.path.display()
            );
            if let Some(stats) = index.tie_break
                && stats.adjusted > 0
            {
                println!(
                    "    tie-break: {} timestamps moved, max drift {}s",
                    stats.adjusted, stats.max_drift
                );
            }
        }
    }
}

fn parse_percentile(raw: &str) -> Result<f64, String> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("could not parse percentile '{raw}' as a number"))?;
    if !(0.0..=100.0).contains(&parsed) {
        return Err(format!("percentile {parsed} must lie in [0, 100]"));
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdentityLayout, TieBreak};

    fn parse(args: &[&str]) -> Result<Option<MetacleanCli>, Box<dyn Error>> {
        parse_cli::<MetacleanCli, _>(std::iter::once("metaclean").chain(args.iter().copied()))
    }

    #[test]
    fn selects_datasets_in_fixed_order() {
        let cli = parse(&["data", "--seattle", "--enron"]).unwrap().unwrap();
        let names: Vec<String> = cli.datasets().iter().map(|d| d.name.to_string()).collect();
        assert_eq!(names, vec!["enron", "seattle"]);
        assert!(parse(&["data"]).unwrap().unwrap().datasets().is_empty());
    }

    #[test]
    fn single_flag_selects_point_to_point() {
        let cli = parse(&["data", "--enron", "-s"]).unwrap().unwrap();
        let profile = cli.profile().unwrap();
        assert!(profile.single_recipient);
        assert_eq!(profile.tie_break, TieBreak::Increment);
        assert!(parse(&["data", "-s", "--profile", "directional"]).is_err());
    }

    #[test]
    fn profile_flag_resolves_presets() {
        let cli = parse(&["data", "--profile", "directional"]).unwrap().unwrap();
        let profile = cli.profile().unwrap();
        assert_eq!(profile.identity_layout, IdentityLayout::Split);
        assert_eq!(profile.directions.len(), 2);
        let default = parse(&["data"]).unwrap().unwrap().profile().unwrap();
        assert_eq!(default.name, ProcessingProfile::expanded().name);
    }

    #[test]
    fn percentiles_are_paired_and_validated() {
        let cli = parse(&["data", "--min-percentile", "5", "--max-percentile", "95"])
            .unwrap()
            .unwrap();
        let band = cli.profile().unwrap().activity.unwrap();
        assert_eq!((band.min_percentile, band.max_percentile), (5.0, 95.0));

        assert!(parse(&["data", "--min-percentile", "5"]).is_err());
        assert!(parse(&["data", "--min-percentile", "-1", "--max-percentile", "5"]).is_err());
        let inverted = parse(&["data", "--min-percentile", "90", "--max-percentile", "10"])
            .unwrap()
            .unwrap();
        assert!(inverted.profile().is_err());
    }

    #[test]
    fn help_is_not_an_error() {
        assert!(parse(&["--help"]).unwrap().is_none());
    }
}
