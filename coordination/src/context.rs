//! Scenario input and the structured context passed between pattern stages
//!
//! Every generation call is rendered from a [`CoordinationContext`]: the
//! scenario, caller-supplied facts, the stage the run is in, and the prior
//! responses that stage is allowed to see.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::roster::Workload;
use crate::session::SessionPriority;

/// Version of the [`CoordinationContext`] layout
pub const CONTEXT_VERSION: u32 = 1;

/// A decision scenario submitted for coordination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique while a session for it is active
    pub id: String,
    /// Free-form category, e.g. `financial` or `crisis`
    pub scenario_type: String,
    pub description: String,
    /// Pattern name, parsed at coordination time
    pub pattern: String,
    #[serde(default)]
    pub priority: SessionPriority,
    /// Requested participant ids; empty selects the whole roster
    #[serde(default)]
    pub participants: Vec<String>,
}

impl Scenario {
    pub fn new(
        id: impl Into<String>,
        scenario_type: impl Into<String>,
        description: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            scenario_type: scenario_type.into(),
            description: description.into(),
            pattern: pattern.into(),
            priority: SessionPriority::default(),
            participants: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: SessionPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants = participants.into_iter().map(Into::into).collect();
        self
    }
}

/// Caller-supplied background facts for a scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioContext {
    facts: BTreeMap<String, serde_json::Value>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.facts.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.facts.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn facts(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.facts
    }
}

impl From<BTreeMap<String, serde_json::Value>> for ScenarioContext {
    fn from(facts: BTreeMap<String, serde_json::Value>) -> Self {
        Self { facts }
    }
}

/// Stage of a pattern run a generation call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ContextStage {
    /// First independent response
    Initial,
    /// Consensus refinement, 1-based round
    Refinement { round: u32 },
    /// Sequential chain, 1-based position
    Chain { position: usize },
    /// Hierarchical primary reviewing subordinate input
    Subordinate,
    /// Final decision synthesis
    Synthesis,
}

impl std::fmt::Display for ContextStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Refinement { round } => write!(f, "refinement round {}", round),
            Self::Chain { position } => write!(f, "chain position {}", position),
            Self::Subordinate => write!(f, "subordinate review"),
            Self::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// A prior response visible to the current stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorInput {
    pub workload_id: String,
    pub text: String,
    pub confidence: f64,
}

/// Structured context passed between pattern stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationContext {
    pub version: u32,
    pub scenario_id: String,
    pub scenario_type: String,
    pub description: String,
    pub facts: ScenarioContext,
    pub stage: ContextStage,
    pub prior: Vec<PriorInput>,
}

impl CoordinationContext {
    pub fn new(scenario: &Scenario, facts: ScenarioContext) -> Self {
        Self {
            version: CONTEXT_VERSION,
            scenario_id: scenario.id.clone(),
            scenario_type: scenario.scenario_type.clone(),
            description: scenario.description.clone(),
            facts,
            stage: ContextStage::Initial,
            prior: Vec::new(),
        }
    }

    /// Derive the context for another stage
    pub fn at_stage(&self, stage: ContextStage, prior: Vec<PriorInput>) -> Self {
        Self {
            stage,
            prior,
            ..self.clone()
        }
    }

    /// Render the prompt for one participant
    pub fn render_prompt(&self, participant: &Workload) -> String {
        let mut prompt = format!(
            "Role: {} ({})\nStage: {}\n\n",
            participant.display_title, participant.id, self.stage
        );
        self.render_scenario(&mut prompt);

        if !self.prior.is_empty() {
            let heading = match self.stage {
                ContextStage::Subordinate => "Input from your team",
                ContextStage::Chain { .. } => "Responses so far",
                _ => "Responses from the previous round",
            };
            prompt.push_str(&format!("\n## {}\n\n", heading));
            for input in &self.prior {
                prompt.push_str(&format!(
                    "### {} (confidence {:.2})\n{}\n\n",
                    input.workload_id, input.confidence, input.text
                ));
            }
        }

        let instruction = match self.stage {
            ContextStage::Initial | ContextStage::Chain { .. } => {
                "Give your assessment from your area of responsibility."
            }
            ContextStage::Refinement { .. } => {
                "Refine your assessment in light of the other responses."
            }
            ContextStage::Subordinate => {
                "As the lead on this scenario, give your final position using your team's input."
            }
            ContextStage::Synthesis => "Synthesize the inputs into one decision.",
        };
        prompt.push_str(&format!(
            "\n{}\nAnswer with 'Reasoning:' and 'Recommendations:' sections and end with [confidence: x].",
            instruction
        ));
        prompt
    }

    /// Render the synthesis prompt from per-participant excerpts
    pub fn render_synthesis_prompt(&self, excerpts: &[(String, f64, String)]) -> String {
        let mut prompt = format!("Stage: {}\n\n", ContextStage::Synthesis);
        self.render_scenario(&mut prompt);
        prompt.push_str("\n## Executive input\n\n");
        for (workload_id, weight, excerpt) in excerpts {
            prompt.push_str(&format!("- {} (weight {:.2}): {}\n", workload_id, weight, excerpt));
        }
        prompt.push_str("\nState the final decision in a few sentences.");
        prompt
    }

    fn render_scenario(&self, prompt: &mut String) {
        prompt.push_str(&format!(
            "## Scenario {} ({})\n\n{}\n",
            self.scenario_id, self.scenario_type, self.description
        ));
        if !self.facts.is_empty() {
            prompt.push_str("\n## Context\n\n");
            for (key, value) in self.facts.facts() {
                match value {
                    serde_json::Value::String(s) => prompt.push_str(&format!("- {}: {}\n", key, s)),
                    other => prompt.push_str(&format!("- {}: {}\n", key, other)),
                }
            }
        }
    }
}
