//! Shardkv error types.

use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for DynInnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl DynInnerError {
    /// Construct a new DynInnerError from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The core shardkv error type. This type is used in all external
/// shardkv apis as well as by shard implementations.
///
/// This type is required to implement `Clone` so that a shard error
/// can be logged and still be handed back to a caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SkError {
    /// Generic shardkv error.
    #[error("{ctx} (src: {src})")]
    Other {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// The facility used to dispatch concurrent shard requests could
    /// not accept the work of an aggregation round. Unlike individual
    /// shard failures, this aborts the whole call.
    #[error("dispatch failure: {ctx} (src: {src})")]
    Dispatch {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },
}

impl SkError {
    /// Construct an "other" error with an inner source error.
    pub fn other_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "other" error.
    pub fn other<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// Construct a "dispatch" error with an inner source error.
    pub fn dispatch_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Dispatch {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct a "dispatch" error.
    pub fn dispatch<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Dispatch {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// Returns true if this is an aggregation-level dispatch failure.
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch { .. })
    }
}

/// The core shardkv result type.
pub type SkResult<T> = Result<T, SkError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            "bla (src: None)",
            SkError::other("bla").to_string().as_str(),
        );
        assert_eq!(
            "bla (src: None)",
            SkError::other("bla".to_string()).to_string().as_str(),
        );
        assert_eq!(
            "foo (src: bar)",
            SkError::other_src("foo", std::io::Error::other("bar"))
                .to_string()
                .as_str(),
        );
        assert_eq!(
            "dispatch failure: no runtime (src: None)",
            SkError::dispatch("no runtime").to_string().as_str(),
        );
    }

    #[test]
    fn error_debug() {
        assert_eq!(
            "Other { ctx: \"bla\", src: None }",
            format!("{:?}", SkError::other("bla")).as_str(),
        );
        assert_eq!(
            "Dispatch { ctx: \"foo\", src: Some(Custom { kind: Other, error: \"bar\" }) }",
            format!(
                "{:?}",
                SkError::dispatch_src("foo", std::io::Error::other("bar"))
            )
            .as_str(),
        );
    }

    #[test]
    fn error_source_is_exposed() {
        use std::error::Error;

        let err = SkError::dispatch_src("foo", std::io::Error::other("bar"));
        assert!(err.is_dispatch());
        assert_eq!("bar", err.source().unwrap().to_string());
        assert!(!SkError::other("bla").is_dispatch());
    }

    #[test]
    fn ensure_sk_error_type_is_send_and_sync() {
        fn ensure<T: std::fmt::Display + Send + Sync>(_t: T) {}
        ensure(SkError::other("bla"));
    }
}
