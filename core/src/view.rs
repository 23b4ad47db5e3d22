//! Presentation descriptions
//!
//! Pure mapping from a simulation snapshot to what should be on screen.
//! Front-ends turn a [`SceneView`] into widgets; nothing here knows about
//! terminals or colours beyond a semantic [`Tone`].

use crate::engine::Snapshot;
use crate::scenario::{Scenario, TierKind};
use crate::sims::agent_flow::{AgentPhase, USER_PROMPT};
use crate::sims::governance::{GovernancePhase, REQUIRED_SCOPE, TOOL_NAME};
use crate::sims::latency::{BlockingLane, LatencyFrame, LatencyReport, OptimisticLane};
use crate::sims::signal::{SignalFrame, SignalKind, GROWTH_INSIGHT, NODES};
use crate::sims::tiered::{NodeStatus, PipelineState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Neutral,
    Active,
    Success,
    Muted,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    pub tone: Tone,
}

impl Badge {
    fn new(label: impl Into<String>, tone: Tone) -> Self {
        Self {
            label: label.into(),
            tone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneView {
    pub title: String,
    pub status: String,
    pub status_tone: Tone,
    pub badges: Vec<Badge>,
    pub detail: Vec<String>,
    pub logs: Vec<String>,
}

impl SceneView {
    fn new(title: &str, status: impl Into<String>, status_tone: Tone) -> Self {
        Self {
            title: title.to_string(),
            status: status.into(),
            status_tone,
            badges: Vec::new(),
            detail: Vec::new(),
            logs: Vec::new(),
        }
    }

    fn with_logs<P>(mut self, snapshot: &Snapshot<P>) -> Self {
        self.logs = snapshot.logs.iter().map(|l| format!("> {}", l)).collect();
        self
    }
}

pub fn describe_agent_flow(snapshot: &Snapshot<AgentPhase>) -> SceneView {
    let phase = snapshot.phase;
    let (status, tone) = match phase {
        AgentPhase::Idle => ("Ready. Press start to send a request.", Tone::Neutral),
        AgentPhase::Input => ("User message received", Tone::Active),
        AgentPhase::Routing => ("Orchestrator classifying intent", Tone::Active),
        AgentPhase::Tool => ("Querying RevenueDB", Tone::Warning),
        AgentPhase::Thinking => ("Model generating component tree", Tone::Active),
        AgentPhase::Rendering => ("Streaming <RevenueChart /> to client", Tone::Active),
        AgentPhase::Done => ("Request complete", Tone::Success),
    };

    let mut view = SceneView::new("Agent Request Lifecycle", status, tone).with_logs(snapshot);

    let reached = AgentPhase::ALL
        .iter()
        .position(|p| *p == phase)
        .unwrap_or(0);
    for (index, step) in AgentPhase::ALL.iter().enumerate().skip(1) {
        let tone = if index < reached || phase == AgentPhase::Done {
            Tone::Success
        } else if index == reached {
            Tone::Active
        } else {
            Tone::Muted
        };
        view.badges.push(Badge::new(step.as_str(), tone));
    }

    view.detail.push("AI: Hello! How can I help with your data today?".to_string());
    match phase {
        AgentPhase::Idle => {}
        AgentPhase::Input | AgentPhase::Routing | AgentPhase::Tool | AgentPhase::Thinking => {
            view.detail.push(format!("You: {}", USER_PROMPT));
            view.detail.push("AI: ...".to_string());
        }
        AgentPhase::Rendering => {
            view.detail.push(format!("You: {}", USER_PROMPT));
            view.detail.push("AI: [rendering RevenueChart]".to_string());
        }
        AgentPhase::Done => {
            view.detail.push(format!("You: {}", USER_PROMPT));
            view.detail.push("AI: [RevenueChart] Q3 revenue is 12% above target.".to_string());
        }
    }

    if snapshot.logs.is_empty() {
        view.logs = vec![
            "> System initialized.".to_string(),
            "> Waiting for user input...".to_string(),
        ];
    }
    view
}

fn node_tone(status: NodeStatus) -> Tone {
    match status {
        NodeStatus::Idle => Tone::Neutral,
        NodeStatus::Scanning => Tone::Active,
        NodeStatus::Hit => Tone::Success,
        NodeStatus::Miss => Tone::Danger,
        NodeStatus::Bypassed => Tone::Muted,
    }
}

pub fn describe_tiered(snapshot: &Snapshot<PipelineState>, scenario: Option<&Scenario>) -> SceneView {
    let pipeline = &snapshot.phase;

    let mut view = match (scenario, pipeline.hit()) {
        (None, _) => SceneView::new("Tiered Router", "Waiting for traffic", Tone::Neutral),
        (Some(_), Some(tier)) => SceneView::new(
            "Tiered Router",
            format!("Resolved by {}", tier.title()),
            if tier == TierKind::Model { Tone::Warning } else { Tone::Success },
        ),
        (Some(_), None) => {
            let scanning = pipeline
                .nodes()
                .iter()
                .find(|(_, s)| *s == NodeStatus::Scanning)
                .map(|(k, _)| k.title());
            match scanning {
                Some(title) => SceneView::new("Tiered Router", format!("{} scanning", title), Tone::Active),
                None => SceneView::new("Tiered Router", "Forwarding", Tone::Active),
            }
        }
    }
    .with_logs(snapshot);

    for (kind, status) in pipeline.nodes() {
        view.badges.push(Badge::new(
            format!("{} [{}]", kind.title(), status.as_str()),
            // Without a scenario every node renders neutral
            if scenario.is_some() { node_tone(*status) } else { Tone::Neutral },
        ));
    }

    if let Some(scenario) = scenario {
        view.detail.push(format!("Query: {}", scenario.query));
        view.detail.push(format!("Category: {}", scenario.category));
        if pipeline.hit().is_some() {
            view.detail.push(scenario.explanation.clone());
            view.detail.push(format!("Latency saved: {}", scenario.latency_saved_label()));
        }
    }
    view
}

pub fn describe_latency(snapshot: &Snapshot<LatencyFrame>, report: &LatencyReport) -> SceneView {
    let frame = snapshot.phase;
    let (status, tone) = match (frame.blocking, frame.optimistic) {
        (BlockingLane::Idle, _) => ("Press start to compare", Tone::Neutral),
        (BlockingLane::Done, _) => ("Same actual latency, different perceived latency", Tone::Success),
        (BlockingLane::Loading, _) => ("Simulating...", Tone::Active),
    };
    let mut view = SceneView::new("Latency Masking", status, tone).with_logs(snapshot);

    let (blocking, blocking_tone) = match frame.blocking {
        BlockingLane::Idle => ("Traditional: idle", Tone::Neutral),
        BlockingLane::Loading => ("Traditional: waiting for response...", Tone::Warning),
        BlockingLane::Done => ("Traditional: report delivered", Tone::Success),
    };
    let (optimistic, optimistic_tone) = match frame.optimistic {
        OptimisticLane::Idle => ("Agentic: idle", Tone::Neutral),
        OptimisticLane::Thinking => ("Agentic: thinking...", Tone::Active),
        OptimisticLane::Streaming => ("Agentic: streaming tokens", Tone::Active),
        OptimisticLane::Done => ("Agentic: report delivered", Tone::Success),
    };
    view.badges.push(Badge::new(blocking, blocking_tone));
    view.badges.push(Badge::new(optimistic, optimistic_tone));

    if frame.blocking == BlockingLane::Done {
        view.detail.push(format!(
            "Traditional perceived wait: {}ms",
            report.blocking_perceived.as_millis()
        ));
        view.detail.push(format!(
            "Agentic perceived wait: {}ms",
            report.optimistic_perceived.as_millis()
        ));
        view.detail.push(format!("Masked: {}ms", report.masked().as_millis()));
    }
    view
}

pub fn describe_governance(snapshot: &Snapshot<GovernancePhase>) -> SceneView {
    let (status, tone) = match snapshot.phase {
        GovernancePhase::Idle => ("Trigger the sensitive action to begin", Tone::Neutral),
        GovernancePhase::Request => ("Agent requesting tool call", Tone::Active),
        GovernancePhase::Intercept => ("Approval required: press y to approve, n to reject", Tone::Warning),
        GovernancePhase::Executed => ("Approved and executed", Tone::Success),
        GovernancePhase::Rejected => ("Rejected; call blocked", Tone::Danger),
    };
    let mut view = SceneView::new("Tool Governance", status, tone).with_logs(snapshot);

    let (agent, regulator, api) = match snapshot.phase {
        GovernancePhase::Idle => (Tone::Neutral, Tone::Neutral, Tone::Neutral),
        GovernancePhase::Request => (Tone::Active, Tone::Neutral, Tone::Neutral),
        GovernancePhase::Intercept => (Tone::Muted, Tone::Warning, Tone::Neutral),
        GovernancePhase::Executed => (Tone::Muted, Tone::Success, Tone::Success),
        GovernancePhase::Rejected => (Tone::Muted, Tone::Danger, Tone::Muted),
    };
    view.badges.push(Badge::new("Agent", agent));
    view.badges.push(Badge::new("Regulator", regulator));
    view.badges.push(Badge::new("Finance API", api));

    view.detail.push(format!("Tool: {} (riskLevel HIGH)", TOOL_NAME));
    view.detail.push(format!("Required scope: {}", REQUIRED_SCOPE));
    view
}

pub fn describe_signal(snapshot: &Snapshot<SignalFrame>) -> SceneView {
    let frame = &snapshot.phase;
    let (status, tone) = if !snapshot.running && frame.visible == 0 {
        ("Monitor paused", Tone::Neutral)
    } else if frame.action {
        ("Deal created automatically", Tone::Success)
    } else if frame.insight {
        ("Insight surfaced", Tone::Warning)
    } else {
        ("Monitoring feed for intent signals...", Tone::Active)
    };
    let mut view = SceneView::new("Signal Monitor", status, tone).with_logs(snapshot);

    for (index, node) in frame.visible_nodes().iter().enumerate() {
        let tone = match (node.kind, frame.is_connected(index)) {
            (_, false) => Tone::Muted,
            (SignalKind::Query, true) => Tone::Neutral,
            (SignalKind::Insight, true) => Tone::Warning,
            (SignalKind::Action, true) => Tone::Success,
        };
        view.badges.push(Badge::new(node.label, tone));
    }

    for driver in &frame.drivers {
        let related = frame
            .visible_nodes()
            .iter()
            .filter(|n| n.driver == driver.as_str())
            .count();
        view.detail.push(format!("Driver: {} ({} signals)", driver, related));
    }
    if frame.insight {
        view.detail.push(GROWTH_INSIGHT.to_string());
    }
    if frame.action {
        view.detail.push(format!("{} -> View in CRM", NODES[NODES.len() - 1].label));
    }
    view
}
