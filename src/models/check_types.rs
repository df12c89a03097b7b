use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TestCase {
    pub path: PathBuf,
    pub expected: String,
}

impl TestCase {
    pub fn new(path: impl Into<PathBuf>, expected: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
        }
    }

    /// Parses `PATH=LABEL`. The label is taken after the last `=`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        match spec.rsplit_once('=') {
            Some((path, label)) if !path.is_empty() && !label.is_empty() => {
                Ok(Self::new(path, label))
            }
            _ => Err(format!("expected PATH=LABEL, got '{}'", spec)),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    NotFound,
    Failed { reason: String },
    Match { confidence: f32 },
    Mismatch { predicted: String, confidence: f32 },
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct CheckReport {
    pub results: Vec<(TestCase, CaseOutcome)>,
}

impl CheckReport {
    fn count(&self, pred: impl Fn(&CaseOutcome) -> bool) -> usize {
        self.results.iter().filter(|(_, outcome)| pred(outcome)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Match { .. }))
    }

    pub fn mismatched(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Mismatch { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Failed { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::NotFound))
    }
}
