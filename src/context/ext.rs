//! Context queries for call sites that may not have a context.
//!
//! Dispatch code receives `Option<&OperationContext>` from layers that predate
//! contexts. An absent context is a caller bug, not an unbounded operation,
//! so every query here fails with [`ContextError::MissingContext`].

use crate::context::{ContextError, ContextResult, OperationContext, Timeout};

const PARAM: &str = "operation_context";

/// Checked context queries on an optional context.
pub trait OperationContextExt {
    /// See [`OperationContext::is_root_context_timeout_configured`].
    fn is_root_context_timeout_configured(self) -> ContextResult<bool>;

    /// See [`OperationContext::remaining_timeout_or_default`].
    fn remaining_timeout_or_default(self, default: Timeout) -> ContextResult<Timeout>;

    /// See [`OperationContext::derive_child`].
    fn derive_child(self, timeout: Option<Timeout>) -> ContextResult<OperationContext>;
}

impl OperationContextExt for Option<&OperationContext> {
    fn is_root_context_timeout_configured(self) -> ContextResult<bool> {
        Ok(require(self)?.is_root_context_timeout_configured())
    }

    fn remaining_timeout_or_default(self, default: Timeout) -> ContextResult<Timeout> {
        Ok(require(self)?.remaining_timeout_or_default(default))
    }

    fn derive_child(self, timeout: Option<Timeout>) -> ContextResult<OperationContext> {
        Ok(require(self)?.derive_child(timeout))
    }
}

fn require(context: Option<&OperationContext>) -> ContextResult<&OperationContext> {
    context.ok_or(ContextError::MissingContext { param: PARAM })
}
