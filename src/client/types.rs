/// One backend round-trip made while serving a `call()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub model: String,
    pub tools_stripped: bool,
    /// Same-model retry index (0 for the first attempt at this model).
    pub retry: u32,
    /// HTTP status, `None` for transport failures.
    pub status: Option<u16>,
    /// `"ok"` or the failure class (e.g. `"rate_limited"`).
    pub outcome: &'static str,
}

/// Per-call statistics for observability.
#[derive(Debug, Clone, Default)]
pub struct CallStats {
    pub backend_calls: u32,
    pub attempts: Vec<AttemptRecord>,
    pub duration_ms: u128,
}

impl CallStats {
    /// Distinct (model, tools) segments walked, ignoring same-model retries.
    pub fn model_switches(&self) -> Vec<(&str, bool)> {
        let mut out: Vec<(&str, bool)> = Vec::new();
        for a in &self.attempts {
            if a.retry == 0 {
                out.push((a.model.as_str(), a.tools_stripped));
            }
        }
        out
    }
}
