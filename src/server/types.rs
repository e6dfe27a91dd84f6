use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConsoleError;

/// Identifies one job run: `pipeline/pipeline_counter/stage/stage_counter/job`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobLocator {
    pub pipeline: String,
    pub pipeline_counter: u64,
    pub stage: String,
    pub stage_counter: u64,
    pub job: String,
}

impl JobLocator {
    /// Filesystem-safe identifier, e.g. `build-12-test-1-unit`.
    pub fn slug(&self) -> String {
        self.to_string()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect()
    }
}

impl fmt::Display for JobLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.pipeline, self.pipeline_counter, self.stage, self.stage_counter, self.job
        )
    }
}

impl FromStr for JobLocator {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConsoleError::InvalidLocator(s.to_string());

        let parts: Vec<&str> = s.trim_matches('/').split('/').collect();
        let [pipeline, pipeline_counter, stage, stage_counter, job] = parts.as_slice() else {
            return Err(invalid());
        };
        if [pipeline, stage, job].iter().any(|part| part.is_empty()) {
            return Err(invalid());
        }

        Ok(Self {
            pipeline: (*pipeline).to_string(),
            pipeline_counter: pipeline_counter.parse().map_err(|_| invalid())?,
            stage: (*stage).to_string(),
            stage_counter: stage_counter.parse().map_err(|_| invalid())?,
            job: (*job).to_string(),
        })
    }
}

/// One entry of the job status endpoint's response array.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusEntry {
    pub building_info: Option<BuildingInfo>,
}

/// Job state as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingInfo {
    pub name: String,
    /// Final or provisional result, e.g. `Passed`, `Failed`, `Cancelled`, `Unknown`.
    pub result: String,
    /// Lifecycle state, e.g. `scheduled`, `building`, `completed`.
    pub current_status: String,
    #[serde(deserialize_with = "bool_or_string")]
    pub is_completed: bool,
    #[serde(default)]
    pub agent: Option<String>,
}

impl BuildingInfo {
    pub fn is_completed(&self) -> bool {
        self.is_completed || self.current_status.eq_ignore_ascii_case("completed")
    }
}

/// The status endpoint sends booleans as `"true"`/`"false"` strings.
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Text(text) => text.eq_ignore_ascii_case("true"),
    })
}

/// A slice of console output starting at a given line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleChunk {
    pub start_line: usize,
    pub lines: Vec<String>,
}

impl ConsoleChunk {
    pub fn next_line(&self) -> usize {
        self.start_line + self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_locator() {
        let locator: JobLocator = "build/12/test/1/unit".parse().unwrap();
        assert_eq!(locator.pipeline, "build");
        assert_eq!(locator.pipeline_counter, 12);
        assert_eq!(locator.stage, "test");
        assert_eq!(locator.stage_counter, 1);
        assert_eq!(locator.job, "unit");
        assert_eq!(locator.to_string(), "build/12/test/1/unit");
        assert_eq!(locator.slug(), "build-12-test-1-unit");
    }

    #[test]
    fn rejects_malformed_locators() {
        for bad in ["build/12/test/1", "build/x/test/1/unit", "build/1//1/unit", ""] {
            let err = bad.parse::<JobLocator>().unwrap_err();
            assert!(matches!(err, ConsoleError::InvalidLocator(_)), "{bad}");
        }
    }

    #[test]
    fn building_info_accepts_string_flags() {
        let json = r#"[{"building_info": {"name": "unit", "result": "Passed", "current_status": "completed", "is_completed": "true"}}]"#;
        let entries: Vec<JobStatusEntry> = serde_json::from_str(json).unwrap();
        let info = entries[0].building_info.as_ref().unwrap();
        assert!(info.is_completed());
        assert_eq!(info.result, "Passed");
        assert_eq!(info.agent, None);
    }

    #[test]
    fn building_info_in_progress() {
        let json = r#"{"name": "unit", "result": "Unknown", "current_status": "building", "is_completed": false, "agent": "agent-1"}"#;
        let info: BuildingInfo = serde_json::from_str(json).unwrap();
        assert!(!info.is_completed());
        assert_eq!(info.agent.as_deref(), Some("agent-1"));
    }

    #[test]
    fn chunk_next_line() {
        let chunk = ConsoleChunk {
            start_line: 10,
            lines: vec!["a".into(), "b".into()],
        };
        assert_eq!(chunk.next_line(), 12);
    }
}
