//! TUI application state: one live instance of every simulation

use agentic_sim_core::analytics::SharedSink;
use agentic_sim_core::sims::{
    AgentFlow, Decision, GovernanceFlow, LatencyRace, Pipeline, SignalMonitor, TieredRouter,
};
use agentic_sim_core::view::{self, SceneView};
use agentic_sim_core::{debug_log, warn_log, Config, SimError, SimKind, SimOptions, StartOutcome};

pub struct App {
    selected: usize,
    agent: AgentFlow,
    tiered: TieredRouter,
    latency: LatencyRace,
    governance: GovernanceFlow,
    signal: SignalMonitor,
    /// Last user-facing message, shown in the status line
    pub notice: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &Config, analytics: SharedSink) -> Result<Self, SimError> {
        let options = SimOptions::from_config(config, analytics);
        let table = config.scenario_table()?;
        Ok(Self {
            selected: 0,
            agent: AgentFlow::new(&options),
            tiered: TieredRouter::new(table, Pipeline::standard(), &options),
            latency: LatencyRace::new(&options),
            governance: GovernanceFlow::new(&options),
            signal: SignalMonitor::new(&options),
            notice: None,
            should_quit: false,
        })
    }

    pub fn selected(&self) -> SimKind {
        SimKind::ALL[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn next_tab(&mut self) {
        self.select((self.selected + 1) % SimKind::ALL.len());
    }

    pub fn prev_tab(&mut self) {
        self.select((self.selected + SimKind::ALL.len() - 1) % SimKind::ALL.len());
    }

    fn select(&mut self, index: usize) {
        self.selected = index;
        self.notice = None;
        // The signal monitor plays as soon as it is shown
        if self.selected() == SimKind::Signal && !self.signal.is_running() {
            self.start_selected();
        }
    }

    pub fn start_selected(&mut self) {
        let result = match self.selected() {
            SimKind::Agent => self.agent.start(),
            SimKind::Tiered => self.tiered.start(),
            SimKind::Latency => self.latency.start(),
            SimKind::Governance => self.governance.start(),
            SimKind::Signal => self.signal.start(),
        };
        match result {
            Ok(StartOutcome::Started(run)) => {
                debug_log!("tui: started {} run {}", self.selected(), run);
                self.notice = None;
            }
            Ok(StartOutcome::AlreadyRunning) => {}
            Err(e) => self.report(e),
        }
    }

    pub fn reset_selected(&mut self) {
        match self.selected() {
            SimKind::Agent => self.agent.reset(),
            SimKind::Tiered => self.tiered.reset(),
            SimKind::Latency => self.latency.reset(),
            SimKind::Governance => self.governance.reset(),
            SimKind::Signal => self.signal.reset(),
        }
        self.notice = None;
    }

    /// Approve or reject on the governance tab; ignored elsewhere
    pub fn decide(&mut self, decision: Decision) {
        if self.selected() != SimKind::Governance {
            return;
        }
        if let Err(e) = self.governance.decide(decision) {
            self.report(e);
        }
    }

    fn report(&mut self, error: SimError) {
        warn_log!("tui: {}", error);
        self.notice = Some(error.user_message());
    }

    pub fn is_running(&self, kind: SimKind) -> bool {
        match kind {
            SimKind::Agent => self.agent.is_running(),
            SimKind::Tiered => self.tiered.is_running(),
            SimKind::Latency => self.latency.is_running(),
            SimKind::Governance => self.governance.is_running(),
            SimKind::Signal => self.signal.is_running(),
        }
    }

    pub fn awaiting_decision(&self) -> bool {
        self.governance.awaiting_decision()
    }

    /// Scene for the selected simulation
    pub fn scene(&self) -> SceneView {
        match self.selected() {
            SimKind::Agent => view::describe_agent_flow(&self.agent.snapshot()),
            SimKind::Tiered => {
                view::describe_tiered(&self.tiered.snapshot(), self.tiered.scenario().as_ref())
            }
            SimKind::Latency => {
                view::describe_latency(&self.latency.snapshot(), &self.latency.report())
            }
            SimKind::Governance => view::describe_governance(&self.governance.snapshot()),
            SimKind::Signal => view::describe_signal(&self.signal.snapshot()),
        }
    }
}
