//! Scenario table for the tiered router
//!
//! A scenario is a canned request with the tier that should resolve it.
//! Tables come from the builtin set or a TOML file of `[[scenario]]` entries.

use crate::error::{OptionExt, Result, SimError};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// A tier of the lookup pipeline, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    Cache,
    Heuristic,
    Model,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Cache => "cache",
            TierKind::Heuristic => "heuristic",
            TierKind::Model => "model",
        }
    }

    /// Display name of the tier's backing system
    pub fn title(&self) -> &'static str {
        match self {
            TierKind::Cache => "Semantic Cache",
            TierKind::Heuristic => "Heuristic Router",
            TierKind::Model => "LLM Inference",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub query: String,
    pub category: String,
    pub target: TierKind,
    pub explanation: String,
    /// Latency avoided by resolving before the model tier
    #[serde(rename = "latency_saved_ms", with = "millis")]
    pub latency_saved: Duration,
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl Scenario {
    fn builtin(
        id: &str,
        query: &str,
        category: &str,
        target: TierKind,
        explanation: &str,
        latency_saved_ms: u64,
    ) -> Self {
        Self {
            id: id.to_string(),
            query: query.to_string(),
            category: category.to_string(),
            target,
            explanation: explanation.to_string(),
            latency_saved: Duration::from_millis(latency_saved_ms),
        }
    }

    /// Latency saved, formatted the way the router panel shows it
    pub fn latency_saved_label(&self) -> String {
        format!("{:.1}s", self.latency_saved.as_secs_f64())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    #[serde(rename = "scenario", default)]
    scenarios: Vec<Scenario>,
}

/// Immutable, validated list of scenarios
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioTable {
    scenarios: Vec<Scenario>,
}

impl ScenarioTable {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(SimError::EmptyScenarioTable);
        }
        let mut seen = HashSet::new();
        for scenario in &scenarios {
            if !seen.insert(scenario.id.as_str()) {
                return Err(SimError::DuplicateScenario {
                    id: scenario.id.clone(),
                });
            }
        }
        Ok(Self { scenarios })
    }

    pub fn builtin() -> Self {
        use TierKind::*;
        Self {
            scenarios: vec![
                Scenario::builtin(
                    "s1",
                    "GET /users/u_8829/profile",
                    "Postgres Data",
                    Heuristic,
                    "Deterministic Route: URL matches pattern ^/users/:id. Bypassing LLM for direct SQL lookup.",
                    1200,
                ),
                Scenario::builtin(
                    "s2",
                    "Summarize Q3 board meeting notes",
                    "Unstructured Text",
                    Model,
                    "Semantic Complexity: Request requires summarization and reasoning. Routing to GPT-4o.",
                    0,
                ),
                Scenario::builtin(
                    "s3",
                    "Get AAPL stock price",
                    "Market Data",
                    Cache,
                    "Hot Path: Key \"ticker:AAPL\" found in Redis (TTL 5s). Serving instantly.",
                    2400,
                ),
                Scenario::builtin(
                    "s4",
                    "Export 50k logs to CSV",
                    "Data Lake",
                    Heuristic,
                    "Bulk Operation: Mapped to \"job.export_logs\". Delegating to background worker queue.",
                    800,
                ),
                Scenario::builtin(
                    "s5",
                    "Why is the checkout slow?",
                    "System Diagnostics",
                    Model,
                    "Root Cause Analysis: Multi-step reasoning required across logs and metrics.",
                    0,
                ),
                Scenario::builtin(
                    "s6",
                    "Refund Order #9912",
                    "RPC Action",
                    Heuristic,
                    "Strict Governance: Mutating action detected. Routing to regulated \"Refund\" tool with scope check.",
                    1500,
                ),
                Scenario::builtin(
                    "s7",
                    "Translate \"Hello\" to French",
                    "NLP Task",
                    Model,
                    "Generative Task: Zero-shot translation required.",
                    0,
                ),
                Scenario::builtin(
                    "s8",
                    "Get Navbar Configuration",
                    "Static Config",
                    Cache,
                    "Static Asset: Global config hash matches CDN version. No compute needed.",
                    400,
                ),
                Scenario::builtin(
                    "s9",
                    "Search: \"Best headset under $200\"",
                    "Vector Search",
                    Heuristic,
                    "Hybrid Search: Routing to Pinecone/Elasticsearch. LLM used only for re-ranking results.",
                    1100,
                ),
                Scenario::builtin(
                    "s10",
                    "Analyze sentiment of review",
                    "Classification",
                    Model,
                    "Nuance Detection: Irony and sentiment analysis require Model inference.",
                    0,
                ),
            ],
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TableFile = toml::from_str(content)?;
        Self::new(file.scenarios)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SimError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let file = TableFile {
            scenarios: self.scenarios.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Uniform random pick
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &Scenario {
        // Table is never empty, see ScenarioTable::new
        self.scenarios
            .choose(rng)
            .unwrap_or(&self.scenarios[0])
    }

    pub fn pick_by_id(&self, id: &str) -> Result<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id).ok_or_scenario(id)
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl Default for ScenarioTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = ScenarioTable::builtin();
        assert_eq!(table.len(), 10);
        assert!(ScenarioTable::new(table.scenarios().to_vec()).is_ok());
        assert_eq!(table.pick_by_id("s3").unwrap().target, TierKind::Cache);
    }

    #[test]
    fn test_pick_is_roughly_uniform() {
        let table = ScenarioTable::builtin();
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for _ in 0..1000 {
            *counts.entry(table.pick(&mut rng).id.as_str()).or_default() += 1;
        }

        assert_eq!(counts.len(), table.len());
        for (id, count) in counts {
            assert!((50..=150).contains(&count), "{} picked {} times", id, count);
        }
    }

    #[test]
    fn test_seeded_pick_is_deterministic() {
        let table = ScenarioTable::builtin();
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..20).map(|_| table.pick(&mut rng).id.clone()).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..20).map(|_| table.pick(&mut rng).id.clone()).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_id() {
        let table = ScenarioTable::builtin();
        assert!(matches!(
            table.pick_by_id("nope"),
            Err(SimError::ScenarioNotFound { .. })
        ));
    }

    #[test]
    fn test_parse_toml_table() {
        let table = ScenarioTable::from_toml_str(
            r#"
            [[scenario]]
            id = "faq"
            query = "What are your opening hours?"
            category = "FAQ"
            target = "cache"
            explanation = "Answered from the FAQ cache."
            latency_saved_ms = 1800
            "#,
        )
        .unwrap();
        let faq = table.pick_by_id("faq").unwrap();
        assert_eq!(faq.target, TierKind::Cache);
        assert_eq!(faq.latency_saved, Duration::from_millis(1800));
        assert_eq!(faq.latency_saved_label(), "1.8s");
    }

    #[test]
    fn test_unknown_target_rejected() {
        let result = ScenarioTable::from_toml_str(
            r#"
            [[scenario]]
            id = "x"
            query = "q"
            category = "c"
            target = "oracle"
            explanation = "e"
            latency_saved_ms = 0
            "#,
        );
        assert!(matches!(result, Err(SimError::TomlDe(_))));
    }

    #[test]
    fn test_duplicates_and_empty_rejected() {
        let s = ScenarioTable::builtin().scenarios()[0].clone();
        assert!(matches!(
            ScenarioTable::new(vec![s.clone(), s]),
            Err(SimError::DuplicateScenario { .. })
        ));
        assert!(matches!(
            ScenarioTable::from_toml_str(""),
            Err(SimError::EmptyScenarioTable)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.toml");
        std::fs::write(&path, ScenarioTable::builtin().to_toml_string().unwrap()).unwrap();

        let loaded = ScenarioTable::load(&path).unwrap();
        assert_eq!(loaded, ScenarioTable::builtin());

        assert!(matches!(
            ScenarioTable::load(dir.path().join("missing.toml")),
            Err(SimError::FileNotFound { .. })
        ));
    }
}
