//! Config file → engine wiring: topology, roster and engine settings loaded
//! from disk drive a real coordination run.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;

use executive_coordination::{
    ConfigError, ConfigFile, CoordinationError, ExecutiveEngine, GenerationError,
    GenerationOptions, ResponseGenerator, Scenario, ScenarioContext,
};

struct Steady;

#[async_trait]
impl ResponseGenerator for Steady {
    async fn generate(
        &self,
        _prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        Ok(match options.role.as_deref() {
            Some(role) => format!("Reasoning: {role} agrees.\nRecommendations:\n- {role} acts\n[confidence: 0.5]"),
            None => "Proceed.".to_string(),
        })
    }
}

fn write(suffix: &str, body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

const YAML: &str = r#"
engine:
  base_rate: 10.0
  plan_limit: 1
  max_rounds: 2
topology:
  kind: ring
  node_count: 4
  link_bandwidth: 100.0
executives:
  - id: chair
    display_title: Board Chair
    priority: 10
    decision_weight: 0.5
    coordinator: true
  - id: treasurer
    display_title: Treasurer
    priority: 9
    decision_weight: 0.5
    expertise_tags: [financial]
"#;

#[tokio::test]
async fn test_yaml_config_drives_engine() {
    let file = write(".yml", YAML);
    let config = ConfigFile::load(file.path()).unwrap();
    let engine = ExecutiveEngine::from_config_file(&config, Arc::new(Steady)).unwrap();

    assert_eq!(engine.roster().len(), 2);
    assert_eq!(engine.topology().node_count(), 4);

    let scenario = Scenario::new("budget", "financial", "Approve the budget", "hierarchical");
    let result = engine.coordinate(&scenario, ScenarioContext::new()).await.unwrap();

    // treasurer: 9 + expertise bonus beats chair at 10
    assert_eq!(result.primary.as_deref(), Some("treasurer"));
    assert_eq!(result.execution_plan.len(), 1);
    // 10 x 2 x 1.2 / 1000
    assert!((result.fabric_utilization - 0.024).abs() < 1e-9);
    assert_eq!(result.final_decision, "Proceed.");
}

#[test]
fn test_invalid_roster_in_config_is_rejected() {
    let file = write(
        ".json",
        r#"{"executives":[{"id":"a","display_title":"A","priority":1,"decision_weight":2.0}]}"#,
    );
    let config = ConfigFile::load(file.path()).unwrap();
    let result = ExecutiveEngine::from_config_file(&config, Arc::new(Steady));
    assert!(matches!(result, Err(CoordinationError::InvalidRoster(_))));
}

#[test]
fn test_invalid_topology_in_config_is_rejected() {
    let file = write(
        ".toml",
        "[topology]\nkind = \"adjacency\"\nneighbors = [[1], [0, 2], [1]]\nlink_bandwidth = 10.0\n",
    );
    let config = ConfigFile::load(file.path()).unwrap();
    let result = ExecutiveEngine::from_config_file(&config, Arc::new(Steady));
    assert!(matches!(result, Err(CoordinationError::InvalidTopology(_))));
}

#[test]
fn test_invalid_engine_values_fail_at_load() {
    let file = write(".toml", "[engine]\nbase_rate = -1.0\n");
    assert!(matches!(
        ConfigFile::load(file.path()),
        Err(ConfigError::InvalidValue { key: "base_rate", .. })
    ));
}
