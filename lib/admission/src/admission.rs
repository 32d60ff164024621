//! Per-request admission.
//!
//! Checks run cheapest first and the first failure wins: access rights for
//! the API, then the quota/rate gate, then depth limiting.

use std::sync::Arc;

use tracing::{debug, error, instrument, trace};

use crate::analyzer::compute_depths;
use crate::operation::{GraphQLRequest, OperationDocument};
use crate::outcome::AdmissionOutcome;
use crate::policy::{depth_limit_enabled, evaluate, AccessGrant};
use crate::quota::{QuotaTracker, QuotaVerdict};
use crate::session::{ApiDefinition, SessionState};

/// Entry point of the admission core. Holds no per-request state, so a single
/// controller is shared by all in-flight requests.
#[derive(Clone)]
pub struct AdmissionController {
    quota: Arc<dyn QuotaTracker>,
}

impl AdmissionController {
    pub fn new(quota: Arc<dyn QuotaTracker>) -> Self {
        Self { quota }
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(session = %session.key, api_id = %api.api_id, outcome)
    )]
    pub fn admit(
        &self,
        session: &SessionState,
        api: &ApiDefinition,
        operation: &OperationDocument,
    ) -> AdmissionOutcome {
        let outcome = match self.check_access(session, api) {
            Ok(grant) => self.check_depth(session, api, grant, operation),
            Err(outcome) => outcome,
        };

        tracing::Span::current().record("outcome", tracing::field::display(outcome));
        outcome
    }

    /// Admits a raw request. The operation is parsed only for GraphQL APIs, and
    /// a document that fails to parse is rejected as malformed before any other
    /// check runs.
    pub fn admit_request(
        &self,
        session: &SessionState,
        api: &ApiDefinition,
        request: &GraphQLRequest,
    ) -> AdmissionOutcome {
        if !api.graphql_enabled() {
            return match self.check_access(session, api) {
                Ok(_) => AdmissionOutcome::NoFailure,
                Err(outcome) => outcome,
            };
        }

        match request.parse() {
            Ok(operation) => self.admit(session, api, &operation),
            Err(err) => {
                error!("failed to parse GraphQL operation: {}", err);
                AdmissionOutcome::MalformedOperation
            }
        }
    }

    fn check_access<'s>(
        &self,
        session: &'s SessionState,
        api: &ApiDefinition,
    ) -> Result<&'s AccessGrant, AdmissionOutcome> {
        let Some(grant) = session.access_grant(&api.api_id) else {
            debug!("session has no access rights for the API");
            return Err(AdmissionOutcome::RateLimitFailure);
        };

        match self.quota.check_and_consume(session, &api.api_id) {
            QuotaVerdict::Allowed => Ok(grant),
            QuotaVerdict::RateLimited => {
                debug!("session is rate limited");
                Err(AdmissionOutcome::RateLimitFailure)
            }
            QuotaVerdict::QuotaExceeded => {
                debug!("session quota exceeded");
                Err(AdmissionOutcome::RateLimitFailure)
            }
        }
    }

    fn check_depth(
        &self,
        session: &SessionState,
        api: &ApiDefinition,
        grant: &AccessGrant,
        operation: &OperationDocument,
    ) -> AdmissionOutcome {
        let Some(schema) = api.graphql_schema() else {
            return AdmissionOutcome::NoFailure;
        };

        if !depth_limit_enabled(api.graphql_enabled(), grant) {
            trace!("depth limiting is disabled for this grant");
            return AdmissionOutcome::NoFailure;
        }

        let depths = match compute_depths(operation, schema) {
            Ok(depths) => depths,
            Err(err) => {
                error!("failed to compute the depth of the GraphQL operation: {}", err);
                return AdmissionOutcome::MalformedOperation;
            }
        };
        trace!(
            "operation depths: document {}, root fields {:?}",
            depths.document_depth,
            depths.fields
        );

        evaluate(grant, session.max_query_depth, &depths)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::policy::{DepthLimit, FieldLimitRule};
    use crate::schema::Schema;

    const COUNTRIES_SDL: &str = include_str!("../tests/fixtures/countries.graphql");
    const COUNTRIES_QUERY: &str =
        "query TestQuery { countries { code name continent { code name countries { code name } } } }";

    struct CountingTracker {
        verdict: QuotaVerdict,
        calls: AtomicUsize,
    }

    impl CountingTracker {
        fn new(verdict: QuotaVerdict) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl QuotaTracker for CountingTracker {
        fn check_and_consume(&self, _session: &SessionState, _api_id: &str) -> QuotaVerdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict
        }
    }

    fn countries_api() -> ApiDefinition {
        let schema = Schema::parse(COUNTRIES_SDL).expect("schema should parse");
        ApiDefinition::graphql("countries", Arc::new(schema))
    }

    fn countries_operation() -> OperationDocument {
        OperationDocument::parse(COUNTRIES_QUERY, Some("TestQuery")).expect("query should parse")
    }

    fn session_with(grant: AccessGrant) -> SessionState {
        SessionState::new("tenant")
            .with_max_query_depth(DepthLimit::Max(3))
            .with_access_right("countries", grant)
    }

    #[test]
    fn missing_grant_is_rate_limited_without_consuming_quota() {
        let tracker = CountingTracker::new(QuotaVerdict::Allowed);
        let controller = AdmissionController::new(tracker.clone());
        let session = SessionState::new("tenant").with_access_right("any", AccessGrant::default());

        // an operation the schema cannot resolve shows that no depth work happens
        let operation =
            OperationDocument::parse("{ planets { name } }", None).expect("query should parse");

        assert_eq!(
            controller.admit(&session, &countries_api(), &operation),
            AdmissionOutcome::RateLimitFailure
        );
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn throttled_session_fails_before_depth_checks() {
        for verdict in [QuotaVerdict::RateLimited, QuotaVerdict::QuotaExceeded] {
            let controller = AdmissionController::new(CountingTracker::new(verdict));
            let grant = AccessGrant::default().with_global_depth_limit(DepthLimit::Max(100));

            assert_eq!(
                controller.admit(&session_with(grant), &countries_api(), &countries_operation()),
                AdmissionOutcome::RateLimitFailure
            );
        }
    }

    #[test]
    fn takes_the_global_limit_from_access_rights() {
        let controller = AdmissionController::new(CountingTracker::new(QuotaVerdict::Allowed));
        let grant = AccessGrant::default().with_global_depth_limit(DepthLimit::Max(1));

        assert_eq!(
            controller.admit(&session_with(grant), &countries_api(), &countries_operation()),
            AdmissionOutcome::DepthLimitFailure
        );
    }

    #[test]
    fn takes_field_limits_from_access_rights() {
        let controller = AdmissionController::new(CountingTracker::new(QuotaVerdict::Allowed));
        let grant = AccessGrant::default().with_field_limit(FieldLimitRule::new(
            "Query",
            "countries",
            DepthLimit::Max(3),
        ));

        assert_eq!(
            controller.admit(&session_with(grant), &countries_api(), &countries_operation()),
            AdmissionOutcome::NoFailure
        );
    }

    #[test]
    fn falls_back_to_the_session_limit() {
        let controller = AdmissionController::new(CountingTracker::new(QuotaVerdict::Allowed));
        let grant = AccessGrant::default().with_field_limit(FieldLimitRule::new(
            "Query",
            "continents",
            DepthLimit::Max(4),
        ));

        assert_eq!(
            controller.admit(&session_with(grant), &countries_api(), &countries_operation()),
            AdmissionOutcome::DepthLimitFailure
        );
    }

    #[test]
    fn grant_without_restrictions_skips_analysis() {
        let controller = AdmissionController::new(CountingTracker::new(QuotaVerdict::Allowed));
        let operation =
            OperationDocument::parse("{ planets { name } }", None).expect("query should parse");

        assert_eq!(
            controller.admit(&session_with(AccessGrant::default()), &countries_api(), &operation),
            AdmissionOutcome::NoFailure
        );
    }

    #[test]
    fn unresolvable_operation_is_malformed() {
        let controller = AdmissionController::new(CountingTracker::new(QuotaVerdict::Allowed));
        let grant = AccessGrant::default().with_global_depth_limit(DepthLimit::Max(10));
        let operation = OperationDocument::parse(COUNTRIES_QUERY, Some("Missing"))
            .expect("query should parse");

        assert_eq!(
            controller.admit(&session_with(grant), &countries_api(), &operation),
            AdmissionOutcome::MalformedOperation
        );
    }

    #[test]
    fn non_graphql_api_is_never_depth_limited() {
        let controller = AdmissionController::new(CountingTracker::new(QuotaVerdict::Allowed));
        let grant = AccessGrant::default().with_global_depth_limit(DepthLimit::Max(1));
        let session = SessionState::new("tenant").with_access_right("rest", grant);
        let request = GraphQLRequest {
            query: "not graphql at all".to_string(),
            operation_name: None,
        };

        assert_eq!(
            controller.admit_request(&session, &ApiDefinition::non_graphql("rest"), &request),
            AdmissionOutcome::NoFailure
        );
    }

    #[test]
    fn unparsable_request_is_malformed() {
        let controller = AdmissionController::new(CountingTracker::new(QuotaVerdict::Allowed));
        let request = GraphQLRequest {
            query: "query { countries {".to_string(),
            operation_name: None,
        };

        assert_eq!(
            controller.admit_request(
                &session_with(AccessGrant::default()),
                &countries_api(),
                &request
            ),
            AdmissionOutcome::MalformedOperation
        );
    }
}
