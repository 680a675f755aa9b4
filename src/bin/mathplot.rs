//! Plot an equation from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Write the circle to an SVG file
//! mathplot "x^2 + y^2 = 4" --output circle.svg
//!
//! # Print the sampled figure as JSON
//! mathplot "y = sin(x)" --low -3.14 --high 3.14 --format json
//!
//! # Summarize one equation per line of stdin
//! printf 'y = x\nx + 1\n' | mathplot
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mathplot::{
    ops::Builtins, sample::Sampling, Figure, PlotConfig, PlotError, Session,
};
use std::{
    io::{BufRead, BufReader, Write},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

/// Solve an equation and plot every solution.
#[derive(Parser)]
#[command(name = "mathplot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The expression or equation to plot (read from stdin when omitted)
    #[arg(allow_hyphen_values = true)]
    expression: Option<String>,

    /// Start of the x range
    #[arg(long, default_value_t = -10.0, allow_negative_numbers = true)]
    low: f64,

    /// End of the x range
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    high: f64,

    /// Number of sample points
    #[arg(long, default_value_t = 1000)]
    samples: usize,

    #[arg(short, long, value_enum, default_value_t = Format::Svg)]
    format: Format,

    /// Where to write the output (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, default_value_t = 1000)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,
}

impl Cli {
    fn config(&self) -> PlotConfig {
        PlotConfig::default()
            .with_x_range(self.low, self.high)
            .with_samples(self.samples)
            .with_size(self.width, self.height)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Svg,
    Json,
    Summary,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match &cli.expression {
        Some(expression) => plot_one(expression, &cli, &config),
        None => plot_stdin(&config),
    }
}

fn plot_one(expression: &str, cli: &Cli, config: &PlotConfig) -> Result<()> {
    let figure = mathplot::plot_function_with(expression, config, &Builtins)
        .map_err(|e| anyhow::anyhow!("{}", e.report()))?;

    let rendered = match cli.format {
        Format::Svg => figure.render_svg(config.width, config.height)?,
        Format::Json => serde_json::to_string_pretty(&figure)?,
        Format::Summary => summarize(&figure),
    };

    match &cli.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Unable to write to {}", path.display()))?,
        None => println!("{}", rendered),
    }

    Ok(())
}

fn plot_stdin(config: &PlotConfig) -> Result<()> {
    let mut session = Session::new();
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    for line in BufReader::new(stdin.lock()).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome: Result<Figure, PlotError> =
            mathplot::plot_function_with(line, config, &Builtins);

        match outcome {
            Ok(figure) => {
                writeln!(stdout, "{}", summarize(&figure))?;
                session.record(format!(
                    "{} => {} solution(s)",
                    line,
                    figure.curves.len()
                ));
            },
            Err(e) => {
                let report = e.report();
                writeln!(stdout, "{}", report)?;
                session.record(format!("{} => {}", line, report.kind));
            },
        }
    }

    tracing::info!(
        entries = session.history().len(),
        "finished reading stdin"
    );

    Ok(())
}

fn summarize(figure: &Figure) -> String {
    let mut summary = format!(
        "{}: {} solution(s) for {} ({:?})",
        figure.title,
        figure.curves.len(),
        figure.target,
        figure.strategy,
    );

    for curve in &figure.curves {
        let detail = match &curve.sampling {
            Sampling::Varying => {
                let finite =
                    curve.points.iter().filter(|p| p.y.is_finite()).count();
                format!("{}/{} real points", finite, curve.points.len())
            },
            Sampling::Constant { value } => format!("constant {}", value),
            Sampling::Unevaluable { reason } => {
                format!("not plotted, {}", reason)
            },
        };

        summary.push_str(&format!("\n  {} [{}]", curve.label, detail));
    }

    summary
}
