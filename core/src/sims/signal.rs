//! Signal monitor: account signals converging on an action
//!
//! A fixed feed of signals is revealed on a 12 second loop. Each signal links
//! to the hub a second after it appears; the growth driver is identified, an
//! insight is surfaced and finally a deal is created automatically.
//!
//! The timeline is an event table compiled into a repeating script, one step
//! per distinct event time.

use super::SimOptions;
use crate::engine::{Phase, Script, Snapshot, StartOutcome, Step, TransitionEngine};
use crate::error::Result;
use tokio::sync::watch;

pub const CYCLE_MS: u64 = 12_000;
const LINK_DELAY_MS: u64 = 1000;
const DRIVER_AT_MS: u64 = 3000;
const INSIGHT_AT_MS: u64 = 6000;
const ACTION_AT_MS: u64 = 9000;

pub const GROWTH_INSIGHT: &str =
    "Usage spike (+240%) correlates with recent Series B funding news. High probability of up-sell.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Query,
    Insight,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalNode {
    pub label: &'static str,
    pub kind: SignalKind,
    pub driver: &'static str,
    /// Position as a percentage of the panel, (x, y)
    pub position: (u8, u8),
    pub delay_ms: u64,
}

/// The feed, ordered by reveal time
pub const NODES: [SignalNode; 6] = [
    SignalNode { label: "Account: Acme Corp", kind: SignalKind::Query, driver: "Growth", position: (20, 30), delay_ms: 0 },
    SignalNode { label: "News: Series B Funding", kind: SignalKind::Query, driver: "Growth", position: (70, 15), delay_ms: 1500 },
    SignalNode { label: "Competitor: Globex", kind: SignalKind::Query, driver: "Risk", position: (15, 70), delay_ms: 3000 },
    SignalNode { label: "Usage: +240% MoM", kind: SignalKind::Query, driver: "Growth", position: (85, 60), delay_ms: 4500 },
    SignalNode { label: "Intent: Enterprise Expansion", kind: SignalKind::Insight, driver: "Growth", position: (50, 40), delay_ms: 6500 },
    SignalNode { label: "Auto-Create Deal: $150k", kind: SignalKind::Action, driver: "Growth", position: (50, 75), delay_ms: 9000 },
];

/// What the monitor shows at one moment of the loop
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalFrame {
    /// Number of nodes from `NODES` currently visible
    pub visible: usize,
    /// Number of visible nodes linked to the hub
    pub connected: usize,
    pub drivers: Vec<String>,
    pub insight: bool,
    pub action: bool,
}

impl SignalFrame {
    pub fn visible_nodes(&self) -> &[SignalNode] {
        &NODES[..self.visible.min(NODES.len())]
    }

    pub fn is_connected(&self, index: usize) -> bool {
        index < self.connected
    }
}

impl Phase for SignalFrame {
    fn label(&self) -> String {
        format!(
            "visible:{} connected:{} drivers:{} insight:{} action:{}",
            self.visible,
            self.connected,
            self.drivers.len(),
            self.insight,
            self.action
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Reveal(usize),
    Link(usize),
    Driver(&'static str),
    Insight,
    Action,
}

fn timeline() -> Vec<(u64, Event)> {
    let mut events = Vec::new();
    for (index, node) in NODES.iter().enumerate() {
        events.push((node.delay_ms, Event::Reveal(index)));
        events.push((node.delay_ms + LINK_DELAY_MS, Event::Link(index)));
    }
    events.push((DRIVER_AT_MS, Event::Driver("Growth")));
    events.push((INSIGHT_AT_MS, Event::Insight));
    events.push((ACTION_AT_MS, Event::Action));
    events.retain(|(at, _)| *at < CYCLE_MS);
    // Stable: events at the same instant keep table order
    events.sort_by_key(|(at, _)| *at);
    events
}

/// Compile the event table into a repeating script
pub fn script() -> Result<Script<SignalFrame>> {
    let events = timeline();
    let mut steps: Vec<Step<SignalFrame>> = Vec::new();
    let mut frame = SignalFrame::default();
    let mut index = 0;

    while index < events.len() {
        let at = events[index].0;
        let mut logs = Vec::new();
        if at == 0 {
            frame = SignalFrame::default();
            logs.push("Monitoring feed for intent signals...".to_string());
        }

        while index < events.len() && events[index].0 == at {
            match events[index].1 {
                Event::Reveal(n) => {
                    frame.visible = frame.visible.max(n + 1);
                    logs.push(format!("Signal: {}", NODES[n].label));
                }
                Event::Link(n) => frame.connected = frame.connected.max(n + 1),
                Event::Driver(driver) => {
                    if !frame.drivers.iter().any(|d| d == driver) {
                        frame.drivers.push(driver.to_string());
                    }
                    logs.push(format!("Driver identified: {}", driver));
                }
                Event::Insight => {
                    frame.insight = true;
                    logs.push(format!("Insight: {}", GROWTH_INSIGHT));
                }
                Event::Action => {
                    frame.action = true;
                    logs.push(format!("Action: {}", NODES[NODES.len() - 1].label));
                }
            }
            index += 1;
        }

        let next = events.get(index).map(|(t, _)| *t).unwrap_or(CYCLE_MS);
        let mut step = Step::new(frame.clone(), next - at);
        step.logs = logs;
        steps.push(step);
    }

    Ok(Script::new("signal", steps)?.repeating())
}

pub struct SignalMonitor {
    engine: TransitionEngine<SignalFrame>,
    speed: f64,
}

impl SignalMonitor {
    pub fn new(options: &SimOptions) -> Self {
        Self {
            engine: TransitionEngine::with_config("signal", SignalFrame::default(), options.engine_config()),
            speed: options.speed,
        }
    }

    /// Start looping. Runs until reset or dropped.
    pub fn start(&self) -> Result<StartOutcome> {
        if self.engine.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        Ok(self.engine.start(script()?.scaled(self.speed)?))
    }

    pub fn reset(&self) {
        self.engine.reset();
    }

    pub fn snapshot(&self) -> Snapshot<SignalFrame> {
        self.engine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<SignalFrame>> {
        self.engine.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }
}
