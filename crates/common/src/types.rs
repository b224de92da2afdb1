//! Core types for specretry

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Marker appended to a job name once a retried spec has been relabeled
pub const SUCCEEDED_AFTER_RETRY_MARKER: &str = "Succeeded after retry";

/// Glyph prefixed to a relabeled job name so the original failure stays visible
pub const FAILED_GLYPH: &str = "❌";

/// A spec file that failed in one browser session and may be retried
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetriedSpec {
    pub session_id: String,
    pub spec_file_name_path: String,
}

impl RetriedSpec {
    pub fn new(session_id: impl Into<String>, spec_file_name_path: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            spec_file_name_path: spec_file_name_path.into(),
        }
    }
}

/// Ordered ledger of retried specs, as persisted under the well-known key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetriedSpecs(Vec<RetriedSpec>);

impl RetriedSpecs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, spec: RetriedSpec) {
        self.0.push(spec);
    }

    /// First entry recorded for the given spec path
    pub fn find_by_spec_path(&self, spec_file_name_path: &str) -> Option<&RetriedSpec> {
        self.0
            .iter()
            .find(|s| s.spec_file_name_path == spec_file_name_path)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RetriedSpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[RetriedSpec] {
        &self.0
    }

    /// JSON form written back to the shared store
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.0
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "sessionId": s.session_id,
                        "specFileNamePath": s.spec_file_name_path,
                    })
                })
                .collect(),
        )
    }
}

impl From<Vec<RetriedSpec>> for RetriedSpecs {
    fn from(specs: Vec<RetriedSpec>) -> Self {
        Self(specs)
    }
}

impl IntoIterator for RetriedSpecs {
    type Item = RetriedSpec;
    type IntoIter = std::vec::IntoIter<RetriedSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RetriedSpecs {
    type Item = &'a RetriedSpec;
    type IntoIter = std::slice::Iter<'a, RetriedSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of one spec-file execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecOutcome {
    Passed,
    Failed,
}

impl SpecOutcome {
    /// Map a runner exit code: `0` passes, anything else fails
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

impl std::fmt::Display for SpecOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecOutcome::Passed => write!(f, "passed"),
            SpecOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Payload of the after-spec hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecRun {
    /// Runner result code (0 = pass)
    pub result: i32,

    /// Browser session the spec ran in
    pub session_id: String,

    /// Capabilities the session was created with
    #[serde(default)]
    pub capabilities: serde_json::Value,

    /// Spec paths executed; the first one identifies the spec
    pub specs: Vec<String>,
}

impl SpecRun {
    pub fn outcome(&self) -> SpecOutcome {
        SpecOutcome::from_exit_code(self.result)
    }

    pub fn spec_path(&self) -> Option<&str> {
        self.specs.first().map(String::as_str)
    }

    /// Browser name from W3C capabilities, for log context
    pub fn browser_name(&self) -> &str {
        self.capabilities
            .get("browserName")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

/// Job reporting region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SauceRegion {
    #[default]
    UsWest1,
    EuCentral1,
    UsEast4,
}

impl SauceRegion {
    /// REST API base URL for the region
    pub fn api_base_url(&self) -> &'static str {
        match self {
            SauceRegion::UsWest1 => "https://api.us-west-1.saucelabs.com",
            SauceRegion::EuCentral1 => "https://api.eu-central-1.saucelabs.com",
            SauceRegion::UsEast4 => "https://api.us-east-4.saucelabs.com",
        }
    }
}

impl FromStr for SauceRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" | "us-west-1" => Ok(SauceRegion::UsWest1),
            "eu" | "eu-central-1" => Ok(SauceRegion::EuCentral1),
            "us-east-4" => Ok(SauceRegion::UsEast4),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}

impl TryFrom<String> for SauceRegion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SauceRegion> for String {
    fn from(region: SauceRegion) -> Self {
        region.to_string()
    }
}

impl std::fmt::Display for SauceRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SauceRegion::UsWest1 => write!(f, "us-west-1"),
            SauceRegion::EuCentral1 => write!(f, "eu-central-1"),
            SauceRegion::UsEast4 => write!(f, "us-east-4"),
        }
    }
}

/// Remote job record, as returned by the job reporting service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub passed: Option<bool>,
    /// Remaining fields, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Job {
    /// Non-empty job name, if any
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn is_relabeled(&self) -> bool {
        self.name
            .as_deref()
            .map_or(false, |n| n.contains(SUCCEEDED_AFTER_RETRY_MARKER))
    }
}

/// Partial update sent to the job reporting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPatch {
    pub name: String,
    pub passed: bool,
}

impl JobPatch {
    /// Relabel a job whose spec failed first and passed on retry
    pub fn succeeded_after_retry(original_name: &str) -> Self {
        Self {
            name: format!(
                "{} - {} - {}",
                FAILED_GLYPH, original_name, SUCCEEDED_AFTER_RETRY_MARKER
            ),
            passed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retried_spec_wire_names() {
        let spec = RetriedSpec::new("abc", "login.spec.ts");
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"sessionId": "abc", "specFileNamePath": "login.spec.ts"})
        );
        assert_eq!(RetriedSpecs::from(vec![spec]).to_value(), serde_json::json!([value]));
    }

    #[test]
    fn test_find_by_spec_path_first_match_wins() {
        let specs = RetriedSpecs::from(vec![
            RetriedSpec::new("s1", "a.spec.ts"),
            RetriedSpec::new("s2", "b.spec.ts"),
            RetriedSpec::new("s3", "a.spec.ts"),
        ]);
        assert_eq!(specs.find_by_spec_path("a.spec.ts").unwrap().session_id, "s1");
        assert!(specs.find_by_spec_path("c.spec.ts").is_none());
    }

    #[test]
    fn test_outcome_from_exit_code() {
        assert_eq!(SpecOutcome::from_exit_code(0), SpecOutcome::Passed);
        assert_eq!(SpecOutcome::from_exit_code(1), SpecOutcome::Failed);
        assert_eq!(SpecOutcome::from_exit_code(-1), SpecOutcome::Failed);
    }

    #[test]
    fn test_region_parsing() {
        assert_eq!("us".parse::<SauceRegion>().unwrap(), SauceRegion::UsWest1);
        assert_eq!("EU".parse::<SauceRegion>().unwrap(), SauceRegion::EuCentral1);
        assert_eq!("us-east-4".parse::<SauceRegion>().unwrap(), SauceRegion::UsEast4);
        assert!("apac".parse::<SauceRegion>().is_err());
        assert_eq!(
            SauceRegion::EuCentral1.api_base_url(),
            "https://api.eu-central-1.saucelabs.com"
        );
    }

    #[test]
    fn test_job_patch_name() {
        let patch = JobPatch::succeeded_after_retry("My Build - abc");
        assert_eq!(patch.name, "❌ - My Build - abc - Succeeded after retry");
        assert!(patch.passed);
    }

    #[test]
    fn test_job_keeps_unknown_fields() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "name": "My Build",
            "browser": "chrome",
        }))
        .unwrap();
        assert_eq!(job.display_name(), Some("My Build"));
        assert!(!job.is_relabeled());
        assert_eq!(job.extra.get("browser").unwrap(), "chrome");
    }
}
