//! Command-line interface definitions and argument parsing

use crate::data::{QueryPoint, DEFAULT_HEIGHT_CM, DEFAULT_WEIGHT_KG, HEIGHT_RANGE, WEIGHT_RANGE};
use crate::presenter::ClusterIdSource;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Body-measurement clustering: train once, analyze many times
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding scaler.json and model.json
    #[arg(long, global = true, env = "BODYMETRICS_ARTIFACTS", default_value = ".")]
    pub artifacts: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fit the scaler and clustering model and write both artifacts
    Train,
    /// Analyze a single subject
    Analyze(AnalyzeArgs),
    /// Read "weight height" lines from stdin and analyze each one
    Interactive(OutputArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Subject weight in kilograms (30-150)
    #[arg(short, long, default_value_t = DEFAULT_WEIGHT_KG, value_parser = parse_weight)]
    pub weight: f64,

    /// Subject height in centimeters (100-220)
    #[arg(short = 'H', long, default_value_t = DEFAULT_HEIGHT_CM, value_parser = parse_height)]
    pub height: f64,

    /// Print the report as JSON instead of the metric panel
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl AnalyzeArgs {
    pub fn query(&self) -> crate::Result<QueryPoint> {
        QueryPoint::new(self.weight, self.height)
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct OutputArgs {
    /// Directory for scatter.png and dendrogram.png
    #[arg(short, long, default_value = "charts")]
    pub out: PathBuf,

    /// Which label to report as the Cluster ID
    #[arg(long, value_enum, default_value_t = ClusterIdSource::Subject)]
    pub cluster_id: ClusterIdSource,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,
}

fn parse_bounded(value: &str, (lo, hi): (f64, f64)) -> Result<f64, String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if !(lo..=hi).contains(&parsed) {
        return Err(format!("must be between {} and {}", lo, hi));
    }
    Ok(parsed)
}

fn parse_weight(value: &str) -> Result<f64, String> {
    parse_bounded(value, WEIGHT_RANGE)
}

fn parse_height(value: &str) -> Result<f64, String> {
    parse_bounded(value, HEIGHT_RANGE)
}

/// Parse one interactive request line.
/// Expected format: "weight height" or "weight,height"
pub fn parse_query_line(line: &str) -> crate::Result<QueryPoint> {
    let parts: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 2 {
        anyhow::bail!("Input must be in format 'weight height'");
    }

    let weight: f64 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid weight value: {}", parts[0]))?;
    let height: f64 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid height value: {}", parts[1]))?;

    QueryPoint::new(weight, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_line() {
        let query = parse_query_line("70 170").unwrap();
        assert_eq!(query, QueryPoint::new(70.0, 170.0).unwrap());

        let query = parse_query_line(" 90.5,180 ").unwrap();
        assert_eq!(query.weight_kg(), 90.5);
        assert_eq!(query.height_cm(), 180.0);

        assert!(parse_query_line("70").is_err());
        assert!(parse_query_line("heavy tall").is_err());
        assert!(parse_query_line("500 170").is_err());
    }

    #[test]
    fn test_analyze_defaults() {
        let args = Args::try_parse_from(["bodymetrics", "analyze"]).unwrap();
        match args.command {
            Command::Analyze(analyze) => {
                assert_eq!(analyze.weight, 70.0);
                assert_eq!(analyze.height, 170.0);
                assert_eq!(analyze.output.cluster_id, ClusterIdSource::Subject);
                assert_eq!(analyze.query().unwrap().bmi(), 24.2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_input_is_rejected() {
        assert!(Args::try_parse_from(["bodymetrics", "analyze", "--weight", "20"]).is_err());
        assert!(Args::try_parse_from(["bodymetrics", "analyze", "-H", "250"]).is_err());
        assert!(Args::try_parse_from(["bodymetrics", "analyze", "--weight", "abc"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let args = Args::try_parse_from([
            "bodymetrics",
            "interactive",
            "--artifacts",
            "assets",
            "--cluster-id",
            "reference",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.artifacts, PathBuf::from("assets"));
        assert!(args.verbose);
        match args.command {
            Command::Interactive(output) => {
                assert_eq!(output.cluster_id, ClusterIdSource::Reference)
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
