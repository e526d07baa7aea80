// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-scoped context: tenant coordinates plus cancellation.

use tokio_util::sync::CancellationToken;

use crate::error::HeraldError;
use crate::types::TenantScope;

/// Carried through every ingress call and every handler invocation.
///
/// The scope is validated once when the context is built at the edge;
/// handlers read it through [`RequestContext::scope`] only.
#[derive(Debug, Clone)]
pub struct RequestContext {
    scope: TenantScope,
    cancel: CancellationToken,
    attempt: u32,
    max_attempts: u32,
}

impl RequestContext {
    /// Build a context for a validated scope.
    pub fn new(scope: TenantScope) -> Result<Self, HeraldError> {
        scope.validate()?;
        Ok(Self {
            scope,
            cancel: CancellationToken::new(),
            attempt: 1,
            max_attempts: 1,
        })
    }

    /// Same scope, cancelled together with `parent`.
    pub fn with_parent(&self, parent: &CancellationToken) -> Self {
        Self {
            scope: self.scope.clone(),
            cancel: parent.child_token(),
            attempt: 1,
            max_attempts: 1,
        }
    }

    /// Copy of this context marked as delivery `attempt` of `max_attempts`.
    pub fn for_attempt(&self, attempt: u32, max_attempts: u32) -> Self {
        Self {
            scope: self.scope.clone(),
            cancel: self.cancel.clone(),
            attempt,
            max_attempts,
        }
    }

    pub fn scope(&self) -> &TenantScope {
        &self.scope
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// True when the bus will not redeliver after this attempt.
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Run `fut`, failing with [`HeraldError::Cancelled`] if the context is
    /// cancelled first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, HeraldError>
    where
        F: std::future::Future<Output = Result<T, HeraldError>>,
    {
        tokio::select! {
            res = fut => res,
            _ = self.cancel.cancelled() => Err(HeraldError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> TenantScope {
        TenantScope::new("t", "p", "a")
    }

    #[test]
    fn rejects_missing_tenant() {
        assert!(RequestContext::new(TenantScope::new("", "p", "a")).is_err());
    }

    #[test]
    fn attempts() {
        let ctx = RequestContext::new(scope()).unwrap();
        assert!(ctx.is_final_attempt());
        let first = ctx.for_attempt(1, 3);
        assert!(!first.is_final_attempt());
        assert!(first.for_attempt(3, 3).is_final_attempt());
    }

    #[tokio::test]
    async fn parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let ctx = RequestContext::new(scope()).unwrap().with_parent(&parent);
        parent.cancel();
        assert!(ctx.is_cancelled());
        let res: Result<(), HeraldError> = ctx
            .run(async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(HeraldError::Cancelled)));
    }
}
