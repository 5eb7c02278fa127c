//! Scripted in-process generator for unit tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::generator::{GenerationError, GenerationOptions, ResponseGenerator};
use crate::roster::Workload;

/// Role used for calls made without a participant role
pub const SYNTHESIS_ROLE: &str = "synthesis";

#[derive(Debug, Clone)]
pub struct Call {
    pub role: String,
    pub prompt: String,
}

/// Answers by role with a fixed confidence marker
#[derive(Default)]
pub struct ScriptedGenerator {
    confidences: HashMap<String, f64>,
    failing: HashSet<String>,
    failing_when: Vec<(String, String)>,
    delays: HashMap<String, Duration>,
    fail_synthesis: bool,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confidence(mut self, role: &str, confidence: f64) -> Self {
        self.confidences.insert(role.to_string(), confidence);
        self
    }

    pub fn failing(mut self, role: &str) -> Self {
        self.failing.insert(role.to_string());
        self
    }

    /// Fail the role only when its prompt contains `marker`
    pub fn failing_when(mut self, role: &str, marker: &str) -> Self {
        self.failing_when.push((role.to_string(), marker.to_string()));
        self
    }

    pub fn delay(mut self, role: &str, delay: Duration) -> Self {
        self.delays.insert(role.to_string(), delay);
        self
    }

    pub fn fail_synthesis(mut self) -> Self {
        self.fail_synthesis = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, role: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.role == role).collect()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let role = options.role.clone().unwrap_or_else(|| SYNTHESIS_ROLE.to_string());
        self.calls.lock().unwrap().push(Call {
            role: role.clone(),
            prompt: prompt.to_string(),
        });

        if let Some(delay) = self.delays.get(&role) {
            tokio::time::sleep(*delay).await;
        }

        if role == SYNTHESIS_ROLE {
            if self.fail_synthesis {
                return Err(GenerationError::Failed("synthesis backend down".to_string()));
            }
            return Ok("Final decision: proceed in phases.".to_string());
        }
        let scripted_failure = self
            .failing_when
            .iter()
            .any(|(r, marker)| *r == role && prompt.contains(marker.as_str()));
        if self.failing.contains(&role) || scripted_failure {
            return Err(GenerationError::Failed(format!("{} unavailable", role)));
        }

        let confidence = self.confidences.get(&role).copied().unwrap_or(0.8);
        Ok(format!(
            "Reasoning: {role} assessment.\nRecommendations:\n- {role} action one\n- {role} action two\n[confidence: {confidence}]"
        ))
    }
}

pub fn team(ids: &[(&str, i32, f64)]) -> Vec<Workload> {
    ids.iter()
        .map(|&(id, priority, weight)| Workload::new(id, id.to_uppercase(), priority, weight))
        .collect()
}
