//! Retry policy bounded by the configured execution attempts.

use scylla::transport::errors::{DbError, QueryError};
use scylla::transport::retry_policy::{QueryInfo, RetryDecision, RetryPolicy, RetrySession};

/// Retries transient failures until a request has been tried `max_attempts`
/// times in total.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionAttemptsRetryPolicy {
    max_attempts: u32,
}

impl ExecutionAttemptsRetryPolicy {
    /// Allow up to `max_attempts` tries per request (at least one).
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Total tries per request.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl RetryPolicy for ExecutionAttemptsRetryPolicy {
    fn new_session(&self) -> Box<dyn RetrySession> {
        Box::new(ExecutionAttemptsRetrySession::new(self.max_attempts))
    }

    fn clone_boxed(&self) -> Box<dyn RetryPolicy> {
        Box::new(*self)
    }
}

/// Per-request attempt counter.
#[derive(Debug)]
pub struct ExecutionAttemptsRetrySession {
    max_attempts: u32,
    attempts: u32,
}

impl ExecutionAttemptsRetrySession {
    fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempts: 1,
        }
    }
}

impl RetrySession for ExecutionAttemptsRetrySession {
    fn decide_should_retry(&mut self, query_info: QueryInfo) -> RetryDecision {
        if self.attempts >= self.max_attempts {
            return RetryDecision::DontRetry;
        }

        let decision = match query_info.error {
            QueryError::DbError(
                DbError::Unavailable { .. }
                | DbError::Overloaded
                | DbError::IsBootstrapping
                | DbError::ServerError
                | DbError::TruncateError,
                _,
            ) => RetryDecision::RetryNextNode(None),
            QueryError::DbError(DbError::ReadTimeout { .. } | DbError::WriteTimeout { .. }, _)
                if query_info.is_idempotent =>
            {
                RetryDecision::RetrySameNode(None)
            }
            QueryError::DbError(..) => RetryDecision::DontRetry,
            // Connection-level failure: the request may or may not have run.
            _ if query_info.is_idempotent => RetryDecision::RetryNextNode(None),
            _ => RetryDecision::DontRetry,
        };

        if !matches!(decision, RetryDecision::DontRetry) {
            self.attempts += 1;
        }
        decision
    }

    fn reset(&mut self) {
        self.attempts = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scylla::statement::Consistency;

    fn info(error: &QueryError, is_idempotent: bool) -> QueryInfo<'_> {
        QueryInfo {
            error,
            is_idempotent,
            consistency: Consistency::One,
        }
    }

    fn overloaded() -> QueryError {
        QueryError::DbError(DbError::Overloaded, "busy".into())
    }

    #[test]
    fn test_stops_after_max_attempts() {
        let policy = ExecutionAttemptsRetryPolicy::new(3);
        let mut session = policy.new_session();
        let error = overloaded();

        assert_eq!(
            session.decide_should_retry(info(&error, false)),
            RetryDecision::RetryNextNode(None)
        );
        assert_eq!(
            session.decide_should_retry(info(&error, false)),
            RetryDecision::RetryNextNode(None)
        );
        assert_eq!(
            session.decide_should_retry(info(&error, false)),
            RetryDecision::DontRetry
        );

        session.reset();
        assert_eq!(
            session.decide_should_retry(info(&error, false)),
            RetryDecision::RetryNextNode(None)
        );
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let mut session = ExecutionAttemptsRetryPolicy::new(1).new_session();
        assert_eq!(
            session.decide_should_retry(info(&overloaded(), true)),
            RetryDecision::DontRetry
        );
        assert_eq!(ExecutionAttemptsRetryPolicy::new(0).max_attempts(), 1);
    }

    #[test]
    fn test_non_transient_errors_are_not_retried() {
        let mut session = ExecutionAttemptsRetryPolicy::new(3).new_session();
        let error = QueryError::DbError(DbError::SyntaxError, "line 1".into());
        assert_eq!(
            session.decide_should_retry(info(&error, true)),
            RetryDecision::DontRetry
        );
    }

    #[test]
    fn test_timeouts_retry_only_when_idempotent() {
        let mut session = ExecutionAttemptsRetryPolicy::new(3).new_session();
        let error = QueryError::TimeoutError;
        assert_eq!(
            session.decide_should_retry(info(&error, false)),
            RetryDecision::DontRetry
        );
        assert_eq!(
            session.decide_should_retry(info(&error, true)),
            RetryDecision::RetryNextNode(None)
        );
    }

    #[test]
    fn test_boxed_clone_keeps_attempt_limit() {
        let boxed = ExecutionAttemptsRetryPolicy::new(2).clone_boxed();
        let mut session = boxed.new_session();
        let error = overloaded();

        assert_eq!(
            session.decide_should_retry(info(&error, false)),
            RetryDecision::RetryNextNode(None)
        );
        assert_eq!(
            session.decide_should_retry(info(&error, false)),
            RetryDecision::DontRetry
        );
    }
}
