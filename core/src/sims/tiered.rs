//! Tiered router: cache → heuristic → model
//!
//! Cheaper tiers are always tried first and a hit at any tier short-circuits
//! the rest. When no tier matches the scenario's target the last tier
//! resolves the request anyway.

use super::SimOptions;
use crate::analytics::{AnalyticsEvent, SharedSink};
use crate::engine::{Phase, Script, Snapshot, StartOutcome, Step, TransitionEngine};
use crate::error::{Result, SimError};
use crate::scenario::{Scenario, ScenarioTable, TierKind};
use crate::warn_log;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Idle,
    Scanning,
    Hit,
    Miss,
    Bypassed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Idle => "idle",
            NodeStatus::Scanning => "scanning",
            NodeStatus::Hit => "hit",
            NodeStatus::Miss => "miss",
            NodeStatus::Bypassed => "bypassed",
        }
    }
}

/// Status of every tier, in pipeline order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    nodes: Vec<(TierKind, NodeStatus)>,
}

impl PipelineState {
    fn idle(tiers: &[TierSpec]) -> Self {
        Self {
            nodes: tiers.iter().map(|t| (t.kind, NodeStatus::Idle)).collect(),
        }
    }

    pub fn nodes(&self) -> &[(TierKind, NodeStatus)] {
        &self.nodes
    }

    pub fn status(&self, tier: TierKind) -> Option<NodeStatus> {
        self.nodes.iter().find(|(k, _)| *k == tier).map(|(_, s)| *s)
    }

    /// Tier that resolved the request, if any
    pub fn hit(&self) -> Option<TierKind> {
        self.nodes
            .iter()
            .find(|(_, s)| *s == NodeStatus::Hit)
            .map(|(k, _)| *k)
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.nodes.iter().filter(|(_, s)| *s == status).count()
    }

    pub fn is_idle(&self) -> bool {
        self.count(NodeStatus::Idle) == self.nodes.len()
    }

    fn with(&self, index: usize, status: NodeStatus) -> Self {
        let mut next = self.clone();
        next.nodes[index].1 = status;
        next
    }
}

impl Phase for PipelineState {
    fn label(&self) -> String {
        self.nodes
            .iter()
            .map(|(k, s)| format!("{}:{}", k, s.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One tier with its timings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    pub kind: TierKind,
    /// Time spent scanning before the tier resolves
    pub scan_ms: u64,
    /// Travel time to the next tier after a miss
    pub travel_ms: u64,
}

impl TierSpec {
    pub fn new(kind: TierKind, scan_ms: u64, travel_ms: u64) -> Self {
        Self {
            kind,
            scan_ms,
            travel_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    tiers: Vec<TierSpec>,
}

impl Pipeline {
    pub fn new(tiers: Vec<TierSpec>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(SimError::EmptyPipeline);
        }
        Ok(Self { tiers })
    }

    /// Cache 600 ms, heuristic 800 ms, model 1200 ms; 300 ms between tiers
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                TierSpec::new(TierKind::Cache, 600, 300),
                TierSpec::new(TierKind::Heuristic, 800, 300),
                TierSpec::new(TierKind::Model, 1200, 0),
            ],
        }
    }

    pub fn tiers(&self) -> &[TierSpec] {
        &self.tiers
    }

    pub fn idle_state(&self) -> PipelineState {
        PipelineState::idle(&self.tiers)
    }

    /// Build the frames a run of `scenario` walks through
    pub fn plan(&self, scenario: &Scenario) -> Result<Script<PipelineState>> {
        if !self.tiers.iter().any(|t| t.kind == scenario.target) {
            warn_log!(
                "scenario {} targets '{}' which is not in the pipeline; last tier will resolve it",
                scenario.id,
                scenario.target
            );
        }

        let last = self.tiers.len() - 1;
        let mut frame = self.idle_state();
        let mut steps = Vec::new();

        for (index, tier) in self.tiers.iter().enumerate() {
            frame = frame.with(index, NodeStatus::Scanning);
            let mut scanning = Step::new(frame.clone(), tier.scan_ms);
            if index == 0 {
                scanning = scanning.log(format!("Request: \"{}\" [{}]", scenario.query, scenario.category));
            }
            steps.push(scanning.log(format!("{}: scanning...", tier.kind.title())));

            if tier.kind == scenario.target || index == last {
                frame = frame.with(index, NodeStatus::Hit);
                for downstream in index + 1..self.tiers.len() {
                    frame = frame.with(downstream, NodeStatus::Bypassed);
                }
                steps.push(
                    Step::terminal(frame.clone())
                        .log(format!(
                            "{}: HIT ({} saved)",
                            tier.kind.title(),
                            scenario.latency_saved_label()
                        ))
                        .log(scenario.explanation.clone()),
                );
                break;
            }

            frame = frame.with(index, NodeStatus::Miss);
            steps.push(
                Step::new(frame.clone(), tier.travel_ms)
                    .log(format!("{}: MISS, forwarding", tier.kind.title())),
            );
        }

        Script::new(format!("tiered:{}", scenario.id), steps)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Picks a scenario and routes it through the pipeline
pub struct TieredRouter {
    engine: TransitionEngine<PipelineState>,
    table: ScenarioTable,
    pipeline: Pipeline,
    rng: Mutex<StdRng>,
    scenario: Mutex<Option<Scenario>>,
    speed: f64,
    analytics: SharedSink,
}

impl TieredRouter {
    pub fn new(table: ScenarioTable, pipeline: Pipeline, options: &SimOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            engine: TransitionEngine::with_config(
                "tiered",
                pipeline.idle_state(),
                options.engine_config(),
            ),
            table,
            pipeline,
            rng: Mutex::new(rng),
            scenario: Mutex::new(None),
            speed: options.speed,
            analytics: options.analytics.clone(),
        }
    }

    /// Pick a random scenario and run it. No-op while a run is in flight.
    pub fn start(&self) -> Result<StartOutcome> {
        if self.engine.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        let scenario = self.table.pick(&mut *self.rng.lock()).clone();
        self.run(scenario)
    }

    /// Run the scenario with the given id
    pub fn start_with(&self, id: &str) -> Result<StartOutcome> {
        if self.engine.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        let scenario = self.table.pick_by_id(id)?.clone();
        self.run(scenario)
    }

    fn run(&self, scenario: Scenario) -> Result<StartOutcome> {
        let script = self.pipeline.plan(&scenario)?.scaled(self.speed)?;
        let mut current = self.scenario.lock();
        let outcome = self.engine.start(script);
        if outcome.is_started() {
            self.analytics.track(&AnalyticsEvent::ScenarioPicked {
                sim: self.engine.name().to_string(),
                scenario: scenario.id.clone(),
            });
            *current = Some(scenario);
        }
        Ok(outcome)
    }

    /// Clear scenario, node states and log
    pub fn reset(&self) {
        let mut current = self.scenario.lock();
        self.engine.reset();
        *current = None;
    }

    pub fn scenario(&self) -> Option<Scenario> {
        self.scenario.lock().clone()
    }

    pub fn snapshot(&self) -> Snapshot<PipelineState> {
        self.engine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<PipelineState>> {
        self.engine.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub async fn wait_until_idle(&self) {
        self.engine.wait_until_idle().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    fn scenario(target: TierKind) -> Scenario {
        ScenarioTable::builtin()
            .scenarios()
            .iter()
            .find(|s| s.target == target)
            .cloned()
            .unwrap()
    }

    fn frames(script: &Script<PipelineState>) -> Vec<PipelineState> {
        script.steps().iter().map(|s| s.phase.clone()).collect()
    }

    fn assert_invariants(script: &Script<PipelineState>) {
        for frame in frames(script) {
            assert!(frame.count(NodeStatus::Scanning) <= 1, "{}", frame.label());
            assert!(frame.count(NodeStatus::Hit) <= 1, "{}", frame.label());
        }
        let terminal = script.terminal();
        assert_eq!(terminal.count(NodeStatus::Hit), 1);
        let hit_at = terminal
            .nodes()
            .iter()
            .position(|(_, s)| *s == NodeStatus::Hit)
            .unwrap();
        for (_, status) in &terminal.nodes()[hit_at + 1..] {
            assert_eq!(*status, NodeStatus::Bypassed);
        }
        for (_, status) in &terminal.nodes()[..hit_at] {
            assert_eq!(*status, NodeStatus::Miss);
        }
    }

    #[test]
    fn test_cache_hit_bypasses_downstream() {
        let script = Pipeline::standard().plan(&scenario(TierKind::Cache)).unwrap();
        let terminal = script.terminal();
        assert_eq!(terminal.status(TierKind::Cache), Some(NodeStatus::Hit));
        assert_eq!(terminal.status(TierKind::Heuristic), Some(NodeStatus::Bypassed));
        assert_eq!(terminal.status(TierKind::Model), Some(NodeStatus::Bypassed));

        for frame in frames(&script) {
            assert_ne!(frame.status(TierKind::Heuristic), Some(NodeStatus::Scanning));
            assert_ne!(frame.status(TierKind::Model), Some(NodeStatus::Scanning));
        }
        assert_eq!(script.duration(), Duration::from_millis(600));
    }

    #[test]
    fn test_heuristic_hit() {
        let script = Pipeline::standard().plan(&scenario(TierKind::Heuristic)).unwrap();
        let terminal = script.terminal();
        assert_eq!(terminal.status(TierKind::Cache), Some(NodeStatus::Miss));
        assert_eq!(terminal.status(TierKind::Heuristic), Some(NodeStatus::Hit));
        assert_eq!(terminal.status(TierKind::Model), Some(NodeStatus::Bypassed));
        assert_eq!(script.duration(), Duration::from_millis(600 + 300 + 800));
    }

    #[test]
    fn test_model_hit_visits_every_tier() {
        let script = Pipeline::standard().plan(&scenario(TierKind::Model)).unwrap();
        let terminal = script.terminal();
        assert_eq!(terminal.status(TierKind::Cache), Some(NodeStatus::Miss));
        assert_eq!(terminal.status(TierKind::Heuristic), Some(NodeStatus::Miss));
        assert_eq!(terminal.status(TierKind::Model), Some(NodeStatus::Hit));

        for tier in [TierKind::Cache, TierKind::Heuristic, TierKind::Model] {
            assert!(frames(&script)
                .iter()
                .any(|f| f.status(tier) == Some(NodeStatus::Scanning)));
        }
    }

    #[test]
    fn test_every_builtin_scenario_keeps_invariants() {
        let pipeline = Pipeline::standard();
        for scenario in ScenarioTable::builtin().scenarios() {
            let script = pipeline.plan(scenario).unwrap();
            assert_invariants(&script);
            assert_eq!(script.terminal().hit(), Some(scenario.target));
        }
    }

    #[test]
    fn test_missing_target_falls_to_last_tier() {
        let pipeline = Pipeline::new(vec![
            TierSpec::new(TierKind::Cache, 600, 300),
            TierSpec::new(TierKind::Model, 1200, 0),
        ])
        .unwrap();
        let script = pipeline.plan(&scenario(TierKind::Heuristic)).unwrap();
        assert_invariants(&script);
        assert_eq!(script.terminal().hit(), Some(TierKind::Model));
        assert_eq!(script.terminal().status(TierKind::Heuristic), None);
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        assert!(matches!(Pipeline::new(Vec::new()), Err(SimError::EmptyPipeline)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_router_run_and_reset() {
        let router = TieredRouter::new(ScenarioTable::builtin(), Pipeline::standard(), &SimOptions::default());
        assert!(router.snapshot().phase.is_idle());
        assert!(router.scenario().is_none());

        let outcome = router.start_with("s3").unwrap();
        assert!(outcome.is_started());
        assert_eq!(router.start().unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(router.scenario().map(|s| s.id), Some("s3".to_string()));

        router.wait_until_idle().await;
        let snapshot = router.snapshot();
        assert_eq!(snapshot.phase.hit(), Some(TierKind::Cache));
        assert_eq!(snapshot.completed_runs, 1);
        assert!(!snapshot.logs.is_empty());

        router.reset();
        let snapshot = router.snapshot();
        assert!(snapshot.phase.is_idle());
        assert!(snapshot.logs.is_empty());
        assert!(router.scenario().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_mid_run_never_resumes() {
        let router = TieredRouter::new(ScenarioTable::builtin(), Pipeline::standard(), &SimOptions::default());
        router.start_with("s2").unwrap();
        sleep(Duration::from_millis(700)).await;
        assert_eq!(router.snapshot().phase.status(TierKind::Cache), Some(NodeStatus::Miss));

        router.reset();
        sleep(Duration::from_secs(5)).await;
        assert!(router.snapshot().phase.is_idle());
        assert_eq!(router.snapshot().completed_runs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_show_previous_hit() {
        let router = TieredRouter::new(ScenarioTable::builtin(), Pipeline::standard(), &SimOptions::default());
        router.start_with("s3").unwrap();
        router.wait_until_idle().await;
        assert_eq!(router.snapshot().phase.hit(), Some(TierKind::Cache));

        let mut rx = router.subscribe();
        router.start_with("s2").unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.running);
        assert_eq!(snapshot.phase.hit(), None);
        let scene = crate::view::describe_tiered(&snapshot, router.scenario().as_ref());
        assert!(!scene.status.starts_with("Resolved by"), "{}", scene.status);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_router_is_deterministic() {
        let options = SimOptions {
            seed: Some(11),
            ..SimOptions::default()
        };
        let a = TieredRouter::new(ScenarioTable::builtin(), Pipeline::standard(), &options);
        let b = TieredRouter::new(ScenarioTable::builtin(), Pipeline::standard(), &options);
        for _ in 0..5 {
            a.start().unwrap();
            b.start().unwrap();
            assert_eq!(a.scenario(), b.scenario());
            a.wait_until_idle().await;
            b.wait_until_idle().await;
        }
    }

    #[test]
    fn test_unknown_scenario_id() {
        let router = TieredRouter::new(ScenarioTable::builtin(), Pipeline::standard(), &SimOptions::default());
        assert!(matches!(
            router.start_with("missing"),
            Err(SimError::ScenarioNotFound { .. })
        ));
    }
}
