//! Workload roster: the executives that take part in coordination
//!
//! Workloads come from an external [`WorkloadDirectory`] at engine
//! configuration time. The engine validates them once into a [`Roster`],
//! which is read-only afterwards.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Score bonus for a participant whose expertise overlaps the scenario type
pub const EXPERTISE_MATCH_BONUS: i64 = 2;

/// Errors raised while validating a roster
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RosterError {
    #[error("Roster is empty")]
    Empty,

    #[error("Workload id must not be empty")]
    EmptyId,

    #[error("Duplicate workload id: {0}")]
    DuplicateId(String),

    #[error("Workload {id} has decision weight {weight}, expected a value in (0, 1]")]
    InvalidWeight { id: String, weight: f64 },

    #[error("More than one coordinator: {first} and {second}")]
    MultipleCoordinators { first: String, second: String },

    #[error("Unknown workload: {0}")]
    UnknownWorkload(String),
}

/// A logical participant ("executive") in coordination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Stable identifier
    pub id: String,
    /// Human-readable title used in prompts
    pub display_title: String,
    /// Domains this workload is authoritative on
    #[serde(default)]
    pub expertise_tags: BTreeSet<String>,
    /// Authority level, higher wins
    pub priority: i32,
    /// Weight in the final decision, in (0, 1]
    pub decision_weight: f64,
    /// Marks the system's top-priority coordinator
    #[serde(default)]
    pub coordinator: bool,
}

impl Workload {
    pub fn new(
        id: impl Into<String>,
        display_title: impl Into<String>,
        priority: i32,
        decision_weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            display_title: display_title.into(),
            expertise_tags: BTreeSet::new(),
            priority,
            decision_weight,
            coordinator: false,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn as_coordinator(mut self) -> Self {
        self.coordinator = true;
        self
    }

    /// Whether any expertise tag textually overlaps the scenario type
    pub fn matches_expertise(&self, scenario_type: &str) -> bool {
        let scenario = scenario_type.trim().to_lowercase();
        if scenario.is_empty() {
            return false;
        }
        self.expertise_tags.iter().any(|tag| {
            let tag = tag.trim().to_lowercase();
            !tag.is_empty() && (tag.contains(&scenario) || scenario.contains(&tag))
        })
    }

    /// Priority plus the expertise bonus for this scenario type
    pub fn primary_score(&self, scenario_type: &str) -> i64 {
        let bonus = if self.matches_expertise(scenario_type) {
            EXPERTISE_MATCH_BONUS
        } else {
            0
        };
        i64::from(self.priority) + bonus
    }
}

/// Pick the primary participant for a scenario.
///
/// Highest `priority + expertise bonus` wins; ties go to the earliest
/// participant in input order.
pub fn select_primary<'a>(participants: &'a [Workload], scenario_type: &str) -> Option<&'a Workload> {
    let mut best: Option<(&Workload, i64)> = None;
    for workload in participants {
        let score = workload.primary_score(scenario_type);
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((workload, score)),
        }
    }
    best.map(|(workload, _)| workload)
}

/// Source of the workload roster
pub trait WorkloadDirectory: Send + Sync {
    /// Ordered list of workloads
    fn list_workloads(&self) -> Vec<Workload>;
}

/// In-memory directory, typically loaded from a config file
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    workloads: Vec<Workload>,
}

impl StaticDirectory {
    pub fn new(workloads: Vec<Workload>) -> Self {
        Self { workloads }
    }

    /// The standard eight-member executive team. Decision weights sum to 1.0.
    pub fn executive_team() -> Self {
        Self::new(vec![
            Workload::new("ceo", "Chief Executive Officer", 10, 0.20)
                .with_tags(["strategic", "leadership", "crisis", "vision"])
                .as_coordinator(),
            Workload::new("cfo", "Chief Financial Officer", 9, 0.15)
                .with_tags(["financial", "budget", "investment", "risk"]),
            Workload::new("cto", "Chief Technology Officer", 9, 0.15)
                .with_tags(["technical", "infrastructure", "security", "innovation"]),
            Workload::new("coo", "Chief Operating Officer", 8, 0.12)
                .with_tags(["operational", "logistics", "process"]),
            Workload::new("cmo", "Chief Marketing Officer", 7, 0.10)
                .with_tags(["market", "brand", "customer", "growth"]),
            Workload::new("clo", "Chief Legal Officer", 7, 0.10)
                .with_tags(["legal", "compliance", "contracts", "regulatory"]),
            Workload::new("cso", "Chief Strategy Officer", 7, 0.10)
                .with_tags(["strategic", "competitive", "partnerships"]),
            Workload::new("chro", "Chief Human Resources Officer", 6, 0.08)
                .with_tags(["people", "talent", "culture"]),
        ])
    }
}

impl WorkloadDirectory for StaticDirectory {
    fn list_workloads(&self) -> Vec<Workload> {
        self.workloads.clone()
    }
}

/// Validated, read-only workload registry
#[derive(Debug, Clone)]
pub struct Roster {
    workloads: Vec<Workload>,
    index: HashMap<String, usize>,
}

impl Roster {
    /// Validate a list of workloads
    pub fn new(workloads: Vec<Workload>) -> Result<Self, RosterError> {
        if workloads.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut index = HashMap::with_capacity(workloads.len());
        let mut coordinator: Option<&str> = None;

        for (position, workload) in workloads.iter().enumerate() {
            if workload.id.trim().is_empty() {
                return Err(RosterError::EmptyId);
            }
            let weight = workload.decision_weight;
            if !weight.is_finite() || weight <= 0.0 || weight > 1.0 {
                return Err(RosterError::InvalidWeight {
                    id: workload.id.clone(),
                    weight,
                });
            }
            if workload.coordinator {
                if let Some(first) = coordinator {
                    return Err(RosterError::MultipleCoordinators {
                        first: first.to_string(),
                        second: workload.id.clone(),
                    });
                }
                coordinator = Some(workload.id.as_str());
            }
            if index.insert(workload.id.clone(), position).is_some() {
                return Err(RosterError::DuplicateId(workload.id.clone()));
            }
        }

        Ok(Self { workloads, index })
    }

    /// Load and validate from a directory
    pub fn from_directory(directory: &dyn WorkloadDirectory) -> Result<Self, RosterError> {
        Self::new(directory.list_workloads())
    }

    pub fn workloads(&self) -> &[Workload] {
        &self.workloads
    }

    pub fn len(&self) -> usize {
        self.workloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Workload> {
        self.index.get(id).map(|&i| &self.workloads[i])
    }

    /// Id of the flagged coordinator, if any
    pub fn coordinator_id(&self) -> Option<&str> {
        self.workloads
            .iter()
            .find(|w| w.coordinator)
            .map(|w| w.id.as_str())
    }

    /// Decision weight registered for a workload
    pub fn weight_of(&self, id: &str) -> Option<f64> {
        self.get(id).map(|w| w.decision_weight)
    }

    /// Resolve requested ids in order. An empty request selects the whole roster.
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<Workload>, RosterError> {
        if ids.is_empty() {
            return Ok(self.workloads.clone());
        }
        ids.iter()
            .map(|id| {
                self.get(id)
                    .cloned()
                    .ok_or_else(|| RosterError::UnknownWorkload(id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executive_team_is_valid() {
        let roster = Roster::from_directory(&StaticDirectory::executive_team()).unwrap();
        assert_eq!(roster.len(), 8);
        assert_eq!(roster.coordinator_id(), Some("ceo"));

        let total: f64 = roster.workloads().iter().map(|w| w.decision_weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = Roster::new(vec![
            Workload::new("cfo", "CFO", 5, 0.5),
            Workload::new("cfo", "CFO again", 5, 0.5),
        ]);
        assert_eq!(result.unwrap_err(), RosterError::DuplicateId("cfo".to_string()));
    }

    #[test]
    fn test_rejects_weights_outside_unit_interval() {
        for weight in [0.0, -0.1, 1.5, f64::NAN] {
            let result = Roster::new(vec![Workload::new("x", "X", 1, weight)]);
            assert!(matches!(result, Err(RosterError::InvalidWeight { .. })));
        }
        assert!(Roster::new(vec![Workload::new("x", "X", 1, 1.0)]).is_ok());
    }

    #[test]
    fn test_rejects_two_coordinators_and_empty() {
        let result = Roster::new(vec![
            Workload::new("a", "A", 1, 0.5).as_coordinator(),
            Workload::new("b", "B", 1, 0.5).as_coordinator(),
        ]);
        assert!(matches!(result, Err(RosterError::MultipleCoordinators { .. })));
        assert_eq!(Roster::new(vec![]).unwrap_err(), RosterError::Empty);
        assert_eq!(
            Roster::new(vec![Workload::new(" ", "blank", 1, 0.5)]).unwrap_err(),
            RosterError::EmptyId
        );
    }

    #[test]
    fn test_resolve_preserves_request_order() {
        let roster = Roster::from_directory(&StaticDirectory::executive_team()).unwrap();
        let ids = vec!["cto".to_string(), "ceo".to_string()];
        let resolved = roster.resolve(&ids).unwrap();
        assert_eq!(resolved[0].id, "cto");
        assert_eq!(resolved[1].id, "ceo");

        assert_eq!(roster.resolve(&[]).unwrap().len(), 8);
        assert_eq!(
            roster.resolve(&["cio".to_string()]).unwrap_err(),
            RosterError::UnknownWorkload("cio".to_string())
        );
    }

    #[test]
    fn test_expertise_matching_is_textual_and_case_insensitive() {
        let cfo = Workload::new("cfo", "CFO", 5, 0.2).with_tags(["Financial", "budget"]);
        assert!(cfo.matches_expertise("financial"));
        assert!(cfo.matches_expertise("FINANCIAL_REVIEW"));
        assert!(cfo.matches_expertise("budget"));
        assert!(!cfo.matches_expertise("legal"));
        assert!(!cfo.matches_expertise(""));
        assert_eq!(cfo.primary_score("financial"), 7);
        assert_eq!(cfo.primary_score("legal"), 5);
    }

    #[test]
    fn test_select_primary_expertise_breaks_priority_tie() {
        let participants = vec![
            Workload::new("a", "A", 5, 0.3).with_tags(["people"]),
            Workload::new("b", "B", 5, 0.3).with_tags(["financial"]),
            Workload::new("c", "C", 5, 0.3).with_tags(["legal"]),
        ];
        let primary = select_primary(&participants, "financial").unwrap();
        assert_eq!(primary.id, "b");
    }

    #[test]
    fn test_select_primary_ties_go_to_input_order() {
        let participants = vec![
            Workload::new("a", "A", 5, 0.3),
            Workload::new("b", "B", 5, 0.3),
        ];
        assert_eq!(select_primary(&participants, "market").unwrap().id, "a");
        assert!(select_primary(&[], "market").is_none());
    }

    #[test]
    fn test_bonus_does_not_override_larger_priority_gap() {
        let participants = vec![
            Workload::new("cfo", "CFO", 5, 0.3).with_tags(["financial"]),
            Workload::new("ceo", "CEO", 8, 0.3),
        ];
        assert_eq!(select_primary(&participants, "financial").unwrap().id, "ceo");
    }

    #[test]
    fn test_workload_serde_defaults() {
        let workload: Workload = serde_json::from_str(
            r#"{"id":"cmo","display_title":"CMO","priority":3,"decision_weight":0.1}"#,
        )
        .unwrap();
        assert!(workload.expertise_tags.is_empty());
        assert!(!workload.coordinator);
    }
}
