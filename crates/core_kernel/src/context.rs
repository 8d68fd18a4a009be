//! Request-scoped context
//!
//! Every component call receives a [`RequestContext`] describing who asked
//! for the operation. The boundary layer builds it after authorizing the
//! caller; the domain only records the principal for audit and tracing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of principal that initiated an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// An authenticated user (admin or tenant)
    User,
    /// A scheduled job or other internal process
    System,
}

/// The authenticated principal behind a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub kind: PrincipalKind,
    /// Capabilities granted at the boundary, e.g. `payment:write`
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl Principal {
    pub fn user(subject: impl Into<String>, capabilities: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            kind: PrincipalKind::User,
            capabilities,
        }
    }

    pub fn system(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            kind: PrincipalKind::System,
            capabilities: Vec::new(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PrincipalKind::User => write!(f, "user:{}", self.subject),
            PrincipalKind::System => write!(f, "system:{}", self.subject),
        }
    }
}

/// Context carried through a single request or job run
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    /// Correlation ID for tracing across systems
    pub correlation_id: Option<String>,
    /// Additional context as key-value pairs
    pub attributes: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            correlation_id: None,
            attributes: HashMap::new(),
        }
    }

    /// Context for an internal job such as the nightly accrual run
    pub fn system(job: impl Into<String>) -> Self {
        Self::new(Principal::system(job))
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns true if the principal was granted `capability`
    pub fn has_capability(&self, capability: &str) -> bool {
        self.principal.capabilities.iter().any(|c| c == capability)
    }

    /// The subject recorded on audit fields such as `recorded_by`
    pub fn actor(&self) -> &str {
        &self.principal.subject
    }
}
