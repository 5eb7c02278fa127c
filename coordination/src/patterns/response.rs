//! Participant responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::PriorInput;

/// One participant's generated response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub workload_id: String,
    pub text: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub processing_duration_ms: u64,
    /// 1-based generation index for this participant within the run
    pub round: u32,
}

impl ParticipantResponse {
    pub fn to_prior(&self) -> PriorInput {
        PriorInput {
            workload_id: self.workload_id.clone(),
            text: self.text.clone(),
            confidence: self.confidence,
        }
    }

    /// Leading `max_chars` characters of the text, cut on a char boundary
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((end, _)) => self.text[..end].to_string(),
            None => self.text.clone(),
        }
    }
}

/// Latest response per participant, in first-insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseSet {
    responses: Vec<ParticipantResponse>,
}

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or replace the participant's earlier response in place
    pub fn upsert(&mut self, response: ParticipantResponse) {
        match self
            .responses
            .iter_mut()
            .find(|r| r.workload_id == response.workload_id)
        {
            Some(existing) => *existing = response,
            None => self.responses.push(response),
        }
    }

    pub fn extend<I: IntoIterator<Item = ParticipantResponse>>(&mut self, responses: I) {
        for response in responses {
            self.upsert(response);
        }
    }

    pub fn get(&self, workload_id: &str) -> Option<&ParticipantResponse> {
        self.responses.iter().find(|r| r.workload_id == workload_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParticipantResponse> {
        self.responses.iter()
    }

    pub fn as_slice(&self) -> &[ParticipantResponse] {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn confidences(&self) -> Vec<f64> {
        self.responses.iter().map(|r| r.confidence).collect()
    }

    /// Confidences of responses generated in `round`
    pub fn confidences_in_round(&self, round: u32) -> Vec<f64> {
        self.responses
            .iter()
            .filter(|r| r.round == round)
            .map(|r| r.confidence)
            .collect()
    }

    pub fn workload_ids(&self) -> Vec<String> {
        self.responses.iter().map(|r| r.workload_id.clone()).collect()
    }

    /// Prior inputs, optionally excluding one participant
    pub fn priors_excluding(&self, workload_id: Option<&str>) -> Vec<PriorInput> {
        self.responses
            .iter()
            .filter(|r| Some(r.workload_id.as_str()) != workload_id)
            .map(ParticipantResponse::to_prior)
            .collect()
    }
}

impl<'a> IntoIterator for &'a ResponseSet {
    type Item = &'a ParticipantResponse;
    type IntoIter = std::slice::Iter<'a, ParticipantResponse>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

impl FromIterator<ParticipantResponse> for ResponseSet {
    fn from_iter<I: IntoIterator<Item = ParticipantResponse>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
pub(crate) fn response(workload_id: &str, confidence: f64, round: u32) -> ParticipantResponse {
    ParticipantResponse {
        workload_id: workload_id.to_string(),
        text: format!("{} says proceed", workload_id),
        confidence,
        reasoning: String::new(),
        recommendations: Vec::new(),
        timestamp: Utc::now(),
        processing_duration_ms: 1,
        round,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_keeps_latest_in_original_position() {
        let mut set = ResponseSet::new();
        set.upsert(response("cfo", 0.5, 1));
        set.upsert(response("cto", 0.6, 1));
        set.upsert(response("cfo", 0.9, 2));

        assert_eq!(set.len(), 2);
        assert_eq!(set.workload_ids(), vec!["cfo".to_string(), "cto".to_string()]);
        assert_eq!(set.get("cfo").unwrap().round, 2);
        assert_eq!(set.confidences(), vec![0.9, 0.6]);
    }

    #[test]
    fn test_priors_excluding() {
        let set: ResponseSet = vec![response("a", 0.1, 1), response("b", 0.2, 1)]
            .into_iter()
            .collect();
        let priors = set.priors_excluding(Some("a"));
        assert_eq!(priors.len(), 1);
        assert_eq!(priors[0].workload_id, "b");
        assert_eq!(set.priors_excluding(None).len(), 2);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let mut r = response("cmo", 0.5, 1);
        r.text = "é".repeat(300);
        let excerpt = r.excerpt(200);
        assert_eq!(excerpt.chars().count(), 200);

        r.text = "short".to_string();
        assert_eq!(r.excerpt(200), "short");
    }
}
