//! Headless runs: drive one simulation and stream its log to stdout

use agentic_sim_core::analytics::SharedSink;
use agentic_sim_core::engine::{scale_duration, Phase, Snapshot};
use agentic_sim_core::sims::signal::CYCLE_MS;
use agentic_sim_core::sims::{
    AgentFlow, Decision, GovernanceFlow, LatencyRace, Pipeline, SignalMonitor, TieredRouter,
};
use agentic_sim_core::view::{self, SceneView, Tone};
use agentic_sim_core::{info_log, Config, SimKind, SimOptions};
use anyhow::{bail, Context, Result};
use console::Style;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Longest signal monitor session a headless run will wait for
const MAX_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Arguments of `agentic-sim run`
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub sim: SimKind,
    pub scenario: Option<String>,
    pub seed: Option<u64>,
    pub decision: Option<Decision>,
    pub cycles: u32,
}

/// Prints log lines not yet shown
struct LogPrinter {
    printed: u64,
    prompt: Style,
}

impl LogPrinter {
    fn new() -> Self {
        Self {
            printed: 0,
            prompt: Style::new().green().bold(),
        }
    }

    /// Lines of `snapshot` appended since the previous call
    fn fresh_lines<'a, P>(&mut self, snapshot: &'a Snapshot<P>) -> &'a [String] {
        if snapshot.log_total < self.printed {
            // Log was cleared by a new run
            self.printed = 0;
        }
        let fresh = usize::try_from(snapshot.log_total - self.printed).unwrap_or(usize::MAX);
        let start = snapshot.logs.len().saturating_sub(fresh);
        self.printed = snapshot.log_total;
        &snapshot.logs[start..]
    }

    fn print<P>(&mut self, snapshot: &Snapshot<P>) {
        for line in self.fresh_lines(snapshot) {
            println!("{} {}", self.prompt.apply_to(">"), line);
        }
    }
}

pub async fn handle_run(request: RunRequest, config: &Config, analytics: SharedSink) -> Result<()> {
    let mut options = SimOptions::from_config(config, analytics);
    if request.seed.is_some() {
        options.seed = request.seed;
    }
    info_log!("headless run: {} ({:?})", request.sim, options);

    let title = Style::new().blue().bold();
    println!("{}", title.apply_to(request.sim.title()));

    let mut printer = LogPrinter::new();
    match request.sim {
        SimKind::Agent => {
            let flow = AgentFlow::new(&options);
            flow.start()?;
            let snapshot = follow(&mut flow.subscribe(), &mut printer, None).await?;
            print_scene(&view::describe_agent_flow(&snapshot));
        }
        SimKind::Tiered => {
            let table = config.scenario_table().context("Failed to load scenario table")?;
            let router = TieredRouter::new(table, Pipeline::standard(), &options);
            match &request.scenario {
                Some(id) => router.start_with(id)?,
                None => router.start()?,
            };
            let snapshot = follow(&mut router.subscribe(), &mut printer, None).await?;
            print_scene(&view::describe_tiered(&snapshot, router.scenario().as_ref()));
        }
        SimKind::Latency => {
            let race = LatencyRace::new(&options);
            race.start()?;
            let snapshot = follow(&mut race.subscribe(), &mut printer, None).await?;
            print_scene(&view::describe_latency(&snapshot, &race.report()));
        }
        SimKind::Governance => {
            let flow = GovernanceFlow::new(&options);
            flow.start()?;
            let snapshot = follow(&mut flow.subscribe(), &mut printer, None).await?;
            print_scene(&view::describe_governance(&snapshot));

            match request.decision {
                Some(decision) => {
                    flow.decide(decision)?;
                    let snapshot = follow(&mut flow.subscribe(), &mut printer, None).await?;
                    print_scene(&view::describe_governance(&snapshot));
                }
                None => {
                    let dim = Style::new().dim();
                    println!("{}", dim.apply_to("Pass --approve or --reject to resolve the request."));
                }
            }
        }
        SimKind::Signal => {
            let monitor = SignalMonitor::new(&options);
            monitor.start()?;
            let deadline = Instant::now() + signal_window(options.speed, request.cycles)?;
            let snapshot = follow(&mut monitor.subscribe(), &mut printer, Some(deadline)).await?;
            monitor.reset();
            print_scene(&view::describe_signal(&snapshot));
        }
    }
    Ok(())
}

/// How long to watch the signal monitor for `cycles` loops at `speed`
fn signal_window(speed: f64, cycles: u32) -> Result<Duration> {
    let cycle = scale_duration(Duration::from_millis(CYCLE_MS), speed)?;
    cycle
        .checked_mul(cycles.max(1))
        .filter(|window| *window <= MAX_WINDOW)
        .with_context(|| format!("{} cycles at speed {} is too long to watch", cycles, speed))
}

/// Print log lines as they arrive until the run ends or `deadline` passes
async fn follow<P: Phase>(
    rx: &mut watch::Receiver<Snapshot<P>>,
    printer: &mut LogPrinter,
    deadline: Option<Instant>,
) -> Result<Snapshot<P>> {
    loop {
        let snapshot = rx.borrow_and_update().clone();
        printer.print(&snapshot);
        if !snapshot.running {
            return Ok(snapshot);
        }

        tokio::select! {
            changed = rx.changed() => changed.context("Simulation stopped unexpectedly")?,
            _ = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            } => return Ok(snapshot),
            _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
        }
    }
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Neutral => Style::new(),
        Tone::Active => Style::new().cyan(),
        Tone::Success => Style::new().green(),
        Tone::Muted => Style::new().dim(),
        Tone::Warning => Style::new().yellow(),
        Tone::Danger => Style::new().red(),
    }
}

fn print_scene(scene: &SceneView) {
    println!();
    println!("{}", tone_style(scene.status_tone).bold().apply_to(&scene.status));
    let badges: Vec<String> = scene
        .badges
        .iter()
        .map(|b| tone_style(b.tone).apply_to(format!("[{}]", b.label)).to_string())
        .collect();
    if !badges.is_empty() {
        println!("{}", badges.join(" "));
    }
    for line in &scene.detail {
        println!("  {}", line);
    }
}
