//! Deferred link operations.
//!
//! A proxy's chain is a list of [`Link`]s. A link's argument is either a
//! ready [`Clause`] or a function of the variable the proxy is finally
//! assembled under. That variable depends on where the proxy sits in a
//! multi-hop chain, so deferred arguments are only evaluated during
//! assembly.

use crate::fragment::{Clause, ClauseKind, QueryFragment};
use std::fmt;
use std::sync::Arc;

/// Clause builder evaluated against the live node variable
pub type DeferredClause = Arc<dyn Fn(&str) -> Clause + Send + Sync>;

#[derive(Clone)]
pub enum LinkArgument {
    Literal(Clause),
    DeferredOnVariable(DeferredClause),
}

/// One `(kind, argument)` step of a chain.
#[derive(Clone)]
pub struct Link {
    kind: ClauseKind,
    argument: LinkArgument,
}

impl Link {
    pub fn literal(clause: Clause) -> Self {
        Self {
            kind: clause.kind(),
            argument: LinkArgument::Literal(clause),
        }
    }

    pub fn deferred<F>(kind: ClauseKind, build: F) -> Self
    where
        F: Fn(&str) -> Clause + Send + Sync + 'static,
    {
        Self {
            kind,
            argument: LinkArgument::DeferredOnVariable(Arc::new(build)),
        }
    }

    pub fn kind(&self) -> ClauseKind {
        self.kind
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.argument, LinkArgument::DeferredOnVariable(_))
    }

    /// Produce the clause for `variable`
    pub fn resolve(&self, variable: &str) -> Clause {
        match &self.argument {
            LinkArgument::Literal(clause) => clause.clone(),
            LinkArgument::DeferredOnVariable(build) => {
                let clause = build(variable);
                debug_assert_eq!(clause.kind(), self.kind, "deferred link changed kind");
                clause
            }
        }
    }

    pub fn apply(&self, fragment: QueryFragment, variable: &str) -> QueryFragment {
        fragment.apply(self.resolve(variable))
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            LinkArgument::Literal(clause) => f
                .debug_tuple("Link")
                .field(&self.kind)
                .field(clause)
                .finish(),
            LinkArgument::DeferredOnVariable(_) => f
                .debug_tuple("Link")
                .field(&self.kind)
                .field(&"<deferred>")
                .finish(),
        }
    }
}
