//! Depth policy resolution.
//!
//! A grant configures depth in up to three layers: per root field rules, an
//! API-wide limit and the session-wide default. Root fields with a matching
//! rule are checked against their own depth. If any root field has no rule,
//! the whole document is checked once against the API-wide limit, or the
//! session default when the grant has none.

use tracing::{debug, trace};

use crate::analyzer::OperationDepths;
use crate::error::InvalidDepthLimit;
use crate::outcome::AdmissionOutcome;

/// A depth ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthLimit {
    Unlimited,
    Max(usize),
}

impl DepthLimit {
    /// Configuration value that stands for [`DepthLimit::Unlimited`].
    pub const UNLIMITED: i64 = -1;

    /// The value as a document-wide ceiling, where `0` disables the check.
    fn ceiling(&self) -> Option<usize> {
        match self {
            DepthLimit::Max(max) if *max > 0 => Some(*max),
            DepthLimit::Max(_) | DepthLimit::Unlimited => None,
        }
    }
}

impl TryFrom<i64> for DepthLimit {
    type Error = InvalidDepthLimit;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            DepthLimit::UNLIMITED => Ok(DepthLimit::Unlimited),
            value => usize::try_from(value)
                .map(DepthLimit::Max)
                .map_err(|_| InvalidDepthLimit(value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLimitRule {
    pub type_name: String,
    pub field_name: String,
    /// Unlike the API-wide limit, `Max(0)` here is enforced and only lets a
    /// leaf field through.
    pub max_depth: DepthLimit,
}

impl FieldLimitRule {
    pub fn new(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        max_depth: DepthLimit,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
            max_depth,
        }
    }

    fn matches(&self, type_name: &str, field_name: &str) -> bool {
        self.type_name == type_name && self.field_name == field_name
    }
}

/// What a session may do against one API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGrant {
    /// API-wide ceiling. `Max(0)` and `Unlimited` disable it; `None` defers to
    /// the session default.
    pub global_depth_limit: Option<DepthLimit>,
    pub field_limits: Vec<FieldLimitRule>,
}

impl AccessGrant {
    pub fn with_global_depth_limit(mut self, limit: DepthLimit) -> Self {
        self.global_depth_limit = Some(limit);
        self
    }

    pub fn with_field_limit(mut self, rule: FieldLimitRule) -> Self {
        self.field_limits.push(rule);
        self
    }

    /// Any field rule, whatever its value, turns depth limiting on. The API-wide
    /// limit only does when it is a positive ceiling.
    pub fn depth_limit_enabled(&self) -> bool {
        !self.field_limits.is_empty()
            || matches!(self.global_depth_limit, Some(DepthLimit::Max(max)) if max > 0)
    }

    /// First rule for the root field wins.
    pub fn field_rule(&self, type_name: &str, field_name: &str) -> Option<&FieldLimitRule> {
        self.field_limits
            .iter()
            .find(|rule| rule.matches(type_name, field_name))
    }

    fn fallback_ceiling(&self, session_default: Option<DepthLimit>) -> Option<usize> {
        match self.global_depth_limit {
            Some(limit) => limit.ceiling(),
            None => session_default.and_then(|limit| limit.ceiling()),
        }
    }
}

/// Why an operation was rejected for depth.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DepthViolation {
    #[error(
        "root field '{type_name}.{field_name}' has depth {depth}, exceeding its limit of {max_depth}"
    )]
    Field {
        type_name: String,
        field_name: String,
        depth: usize,
        max_depth: usize,
    },
    #[error("document depth {depth} exceeds the limit of {max_depth}")]
    Document { depth: usize, max_depth: usize },
}

/// Depth limiting applies only to GraphQL APIs, and only when the grant
/// configures a real restriction.
pub fn depth_limit_enabled(graphql_enabled: bool, grant: &AccessGrant) -> bool {
    graphql_enabled && grant.depth_limit_enabled()
}

/// Checks root field rules, then the single document-wide fallback when some
/// root field has no rule.
pub fn check_depth(
    grant: &AccessGrant,
    session_default: Option<DepthLimit>,
    depths: &OperationDepths,
) -> Result<(), DepthViolation> {
    let mut requires_document_check = false;

    for field in &depths.fields {
        let Some(rule) = grant.field_rule(&field.type_name, &field.field_name) else {
            trace!(
                "root field '{}.{}' has no depth rule",
                field.type_name,
                field.field_name
            );
            requires_document_check = true;
            continue;
        };

        match rule.max_depth {
            DepthLimit::Unlimited => {}
            DepthLimit::Max(max_depth) if field.depth > max_depth => {
                return Err(DepthViolation::Field {
                    type_name: field.type_name.clone(),
                    field_name: field.field_name.clone(),
                    depth: field.depth,
                    max_depth,
                });
            }
            DepthLimit::Max(_) => {}
        }
    }

    if !requires_document_check {
        return Ok(());
    }

    match grant.fallback_ceiling(session_default) {
        Some(max_depth) if depths.document_depth > max_depth => Err(DepthViolation::Document {
            depth: depths.document_depth,
            max_depth,
        }),
        _ => Ok(()),
    }
}

pub fn evaluate(
    grant: &AccessGrant,
    session_default: Option<DepthLimit>,
    depths: &OperationDepths,
) -> AdmissionOutcome {
    if !grant.depth_limit_enabled() {
        return AdmissionOutcome::NoFailure;
    }

    match check_depth(grant, session_default, depths) {
        Ok(()) => AdmissionOutcome::NoFailure,
        Err(violation) => {
            debug!("depth limit exceeded: {}", violation);
            AdmissionOutcome::DepthLimitFailure
        }
    }
}
