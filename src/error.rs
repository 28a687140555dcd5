use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The loader steps that touch the store, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Clear,
    PrepareIndexes,
    SeedUsers,
    SeedCompanies,
    SeedJobs,
    SeedApplications,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Clear => "clearing old data",
            Step::PrepareIndexes => "preparing indexes",
            Step::SeedUsers => "inserting users",
            Step::SeedCompanies => "inserting companies",
            Step::SeedJobs => "inserting jobs",
            Step::SeedApplications => "inserting applications",
        })
    }
}

#[derive(Debug, Error)]
pub enum SeedError {
    /// The store is unreachable or rejected the connection string.
    #[error("could not connect to {target}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },

    /// A delete or insert failed; earlier steps stay committed.
    #[error("{step} failed")]
    Operation {
        step: Step,
        #[source]
        source: BoxError,
    },

    #[error("invalid fixture: {0}")]
    Fixture(String),
}

impl SeedError {
    pub fn connection(target: impl Into<String>, source: anyhow::Error) -> Self {
        SeedError::Connection {
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn operation(step: Step, source: anyhow::Error) -> Self {
        SeedError::Operation {
            step,
            source: source.into(),
        }
    }

    /// The step that failed, when the failure happened against the store.
    pub fn step(&self) -> Option<Step> {
        match self {
            SeedError::Operation { step, .. } => Some(*step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_operation_error_names_the_step() {
        let err = SeedError::operation(Step::SeedJobs, anyhow!("E11000 duplicate key"));
        assert_eq!(err.step(), Some(Step::SeedJobs));
        assert_eq!(err.to_string(), "inserting jobs failed");

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain, "inserting jobs failed: E11000 duplicate key");
    }

    #[test]
    fn test_connection_error_keeps_source() {
        let err = SeedError::connection("mongodb://***@db", anyhow!("server selection timeout"));
        assert!(err.step().is_none());
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("server selection timeout"));
    }
}
