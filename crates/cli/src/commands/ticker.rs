//! `trendsite ticker` - offline ticker tools

use std::str::FromStr;

use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::warn;

use trendsite_ticker::sim::{simulate, RecordingHost, SimulationPlan, TraceSample};
use trendsite_ticker::{FixtureSource, LoopStrategy, Phase, Ticker, TickerEvent};

use crate::config::TrendsiteConfig;
use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum TickerCommands {
    /// Load a fixture and print the ticker's HTML fragment
    Render(RenderArgs),

    /// Simulate the animation frame by frame
    Simulate(SimulateArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    /// Fixture location: http(s) URL, file:// URL or path
    #[arg(long)]
    pub fixture: String,

    /// Loop strategy (bounce, wraparound)
    #[arg(long)]
    pub strategy: Option<LoopStrategy>,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Width of the scrolling content in px
    #[arg(long)]
    pub content_width: f64,

    /// Width of the visible container in px
    #[arg(long)]
    pub container_width: f64,

    /// Simulated time span
    #[arg(long, default_value = "30000")]
    pub duration_ms: f64,

    /// Frame interval
    #[arg(long, default_value = "16.667")]
    pub frame_ms: f64,

    /// Window in which the ticker is scrolled out of view, e.g. 4000..9000
    #[arg(long)]
    pub hidden: Vec<HiddenWindow>,

    /// Print one sample per this many ms
    #[arg(long, default_value = "500")]
    pub every_ms: f64,

    /// Loop strategy (bounce, wraparound)
    #[arg(long)]
    pub strategy: Option<LoopStrategy>,
}

/// `FROM..TO` in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiddenWindow {
    pub from_ms: f64,
    pub to_ms: f64,
}

impl FromStr for HiddenWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once("..")
            .ok_or_else(|| format!("expected FROM..TO, got '{}'", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("bad bound '{}': {}", v, e))
        };
        let window = HiddenWindow {
            from_ms: parse(from)?,
            to_ms: parse(to)?,
        };
        if window.to_ms < window.from_ms {
            return Err(format!("window ends before it starts: '{}'", s));
        }
        Ok(window)
    }
}

#[derive(Serialize)]
struct Rendered {
    phase: String,
    html: String,
}

struct SampleRow<'a>(&'a TraceSample);

impl Serialize for SampleRow<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl TableDisplay for SampleRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Time (ms)", "Position (px)", "Direction", "Dwell", "Visible"]
    }

    fn row(&self) -> Vec<String> {
        let s = self.0;
        vec![
            format!("{:.0}", s.at_ms),
            format!("{:.1}", s.position),
            s.direction.to_string(),
            if s.paused { "yes" } else { "" }.to_string(),
            if s.visible { "yes" } else { "no" }.to_string(),
        ]
    }
}

pub async fn execute(
    cmd: TickerCommands,
    config: &TrendsiteConfig,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    match cmd {
        TickerCommands::Render(args) => render(args, config, format).await,
        TickerCommands::Simulate(args) => simulate_cmd(args, config, format),
    }
}

async fn render(args: RenderArgs, config: &TrendsiteConfig, format: OutputFormat) -> anyhow::Result<i32> {
    let mut ticker_config = config.ticker.clone();
    if let Some(strategy) = args.strategy {
        ticker_config.strategy = strategy;
    }

    let mut ticker = Ticker::new(ticker_config, RecordingHost::new());
    match FixtureSource::parse(&args.fixture) {
        Ok(source) => ticker.load(&source).await,
        Err(e) => ticker.dispatch(TickerEvent::DataLoaded(Err(e))),
    }

    let phase = ticker.machine().phase();
    if phase == Phase::Unavailable {
        warn!("Fixture {} could not be loaded; rendering the fallback", args.fixture);
    }
    let html = ticker.host().mounted.last().cloned().unwrap_or_default();
    ticker.teardown();

    match format {
        OutputFormat::Json | OutputFormat::Yaml => output::print_structured(
            &Rendered {
                phase: phase.to_string(),
                html,
            },
            format,
        ),
        _ => println!("{}", html),
    }
    Ok(0)
}

fn simulate_cmd(args: SimulateArgs, config: &TrendsiteConfig, format: OutputFormat) -> anyhow::Result<i32> {
    let mut ticker_config = config.ticker.clone();
    if let Some(strategy) = args.strategy {
        ticker_config.strategy = strategy;
    }

    let plan = SimulationPlan {
        content_width: args.content_width,
        container_width: args.container_width,
        duration_ms: args.duration_ms,
        frame_ms: args.frame_ms,
        hidden: args.hidden.iter().map(|w| (w.from_ms, w.to_ms)).collect(),
    };
    let trace = simulate(ticker_config, Vec::new(), &plan);

    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        output::print_structured(&trace, format);
        return Ok(0);
    }

    let rows: Vec<SampleRow> = thin_out(&trace.samples, args.every_ms)
        .into_iter()
        .map(SampleRow)
        .collect();
    output::print_list(&rows, format);
    println!(
        "bounds [{:.1}, 0] px, {} frame(s) requested, {} cancelled, at most {} pending",
        trace.min_position, trace.frames_requested, trace.frames_cancelled, trace.max_pending_frames
    );
    Ok(0)
}

/// First sample at or after each multiple of `every_ms`
fn thin_out(samples: &[TraceSample], every_ms: f64) -> Vec<&TraceSample> {
    if !(every_ms.is_finite() && every_ms > 0.0) {
        return samples.iter().collect();
    }
    let mut next = 0.0;
    let mut picked = Vec::new();
    for sample in samples {
        if sample.at_ms >= next {
            picked.push(sample);
            while next <= sample.at_ms {
                next += every_ms;
            }
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendsite_ticker::Direction;

    #[test]
    fn test_hidden_window_parse() {
        assert_eq!(
            "4000..9000".parse::<HiddenWindow>().unwrap(),
            HiddenWindow {
                from_ms: 4000.0,
                to_ms: 9000.0
            }
        );
        assert!("4000-9000".parse::<HiddenWindow>().is_err());
        assert!("9000..4000".parse::<HiddenWindow>().is_err());
    }

    #[test]
    fn test_thin_out() {
        let samples: Vec<TraceSample> = (0..100)
            .map(|i| TraceSample {
                at_ms: i as f64 * 16.0,
                position: 0.0,
                direction: Direction::Reverse,
                paused: false,
                visible: true,
            })
            .collect();
        let picked = thin_out(&samples, 500.0);
        let times: Vec<f64> = picked.iter().map(|s| s.at_ms).collect();
        assert_eq!(times, vec![0.0, 512.0, 1008.0, 1504.0]);
    }
}
