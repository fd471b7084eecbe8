use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use openavail_agent::{Agent, AnalysisError};
use openavail_store::{AnalyzeFailure, DocumentAnalyzer};

/// Wraps the agent for the worker pool, enforcing a wall-clock budget per
/// document so one pathological PDF cannot stall a worker.
pub struct TimedAnalyzer {
    agent: Agent,
    budget: Duration,
}

impl TimedAnalyzer {
    pub fn new(agent: Agent, budget: Duration) -> Self {
        Self { agent, budget }
    }
}

impl DocumentAnalyzer for TimedAnalyzer {
    fn analyze<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, AnalyzeFailure>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::time::timeout(self.budget, self.agent.analyze_file(path)).await {
                Ok(Ok(result)) => Ok(result.to_json()),
                Ok(Err(err)) => Err(AnalyzeFailure::new(err.kind(), err.to_string())),
                Err(_) => {
                    let err = AnalysisError::Timeout(self.budget.as_secs());
                    Err(AnalyzeFailure::new(err.kind(), err.to_string()))
                }
            }
        })
    }
}
