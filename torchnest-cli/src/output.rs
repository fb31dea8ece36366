use serde::Serialize;
use torchnest::io::ext_repr::{ExtInstance, ExtSolution};
use torchnest::solver::{SensitivityRecord, SolverConfig};

/// Everything one run produces, written as a single JSON document: the job
/// as submitted, the solved layout and the settings that produced it.
#[derive(Serialize, Clone)]
pub struct Output {
    #[serde(flatten)]
    pub instance: ExtInstance,
    pub solution: ExtSolution,
    pub config: SolverConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Vec<SensitivityRecord>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use torchnest::io::export::export_solution;
    use torchnest::io::import::import_instance;
    use torchnest::solver::optimize;

    #[test]
    fn output_nests_the_job_next_to_the_solution() {
        let ext_instance: ExtInstance = serde_json::from_str(
            r#"{
                "pieces": [{"id": "sq", "width": 100.0, "height": 100.0, "quantity": 2}],
                "sheet": {"width": 500.0, "height": 500.0, "kerf": 2.0}
            }"#,
        )
        .unwrap();
        let (pieces, spec) = import_instance(&ext_instance).unwrap();
        let result = optimize(&pieces, &spec, &SolverConfig::default());

        let output = Output {
            instance: ext_instance,
            solution: export_solution(&pieces, &result),
            config: SolverConfig::default(),
            sensitivity: None,
        };

        let json: serde_json::Value = serde_json::from_str(
            &serde_json::to_string(&output).unwrap(),
        )
        .unwrap();
        // the instance is flattened into the root object
        assert!(json.get("pieces").is_some());
        assert!(json.get("sheet").is_some());
        assert_eq!(json["solution"]["total_sheets"], 1);
        assert_eq!(json["config"]["algorithm"], "hybrid");
        assert!(json.get("sensitivity").is_none());
    }
}
