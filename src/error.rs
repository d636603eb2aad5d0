//! Error taxonomy for report generation.
//!
//! Every failure is fatal to the `generate` call that produced it. The
//! variants carry the storage key, dataset or parameter that caused the
//! failure so callers can report it without inspecting logs.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::engine::RenderError;
use crate::page_count::PageCountError;
use crate::provider::ProviderError;
use crate::store::StoreError;
use crate::value::ParamKind;

/// The pipeline stage a [`GenerateError`] originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Loading or parsing definitions.
    Load,
    /// Locating provider methods for datasets.
    Resolve,
    /// Coercing parameter values into provider arguments.
    Bind,
    /// Calling provider methods.
    Invoke,
    /// Running the rendering engine.
    Render,
    /// Post-processing rendered bytes.
    PageCount,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Resolve => "resolve",
            Stage::Bind => "bind",
            Stage::Invoke => "invoke",
            Stage::Render => "render",
            Stage::PageCount => "page-count",
        };
        f.write_str(name)
    }
}

/// Why a provider lookup did not produce a binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupMiss {
    /// No registered provider type matches the declared type name.
    Type,
    /// The type exists but none of its methods matches the signature.
    Method,
    /// The rendering engine asked for a dataset that was never declared.
    Binding,
}

impl fmt::Display for LookupMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupMiss::Type => f.write_str("no provider type with that name is registered"),
            LookupMiss::Method => f.write_str("no provider method matches the signature"),
            LookupMiss::Binding => f.write_str("no dataset with that name was declared"),
        }
    }
}

/// Terminal failure of a single generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// A definition could not be read from storage.
    #[error("failed to load report definition '{key}': {source}")]
    DefinitionLoad {
        /// Storage key that was requested.
        key: String,
        /// Underlying storage failure.
        #[source]
        source: StoreError,
    },

    /// A definition was read but does not have the required structure.
    #[error("report definition '{key}' is malformed: {reason}")]
    DefinitionMalformed {
        /// Storage key of the offending definition.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A dataset's provider type or method could not be located.
    #[error("provider for dataset '{dataset}' not found ({provider_type} / {signature}): {miss}")]
    ProviderNotFound {
        /// Dataset whose binding failed.
        dataset: String,
        /// Declared provider type name.
        provider_type: String,
        /// Declared method signature.
        signature: String,
        /// Which part of the lookup missed.
        miss: LookupMiss,
    },

    /// A parameter value could not be converted to the declared type.
    #[error("parameter '{parameter}' value '{value}' cannot be converted to {kind}")]
    ParameterCoercion {
        /// Declared parameter name.
        parameter: String,
        /// The raw value supplied by the caller.
        value: String,
        /// Declared target kind.
        kind: ParamKind,
    },

    /// A provider method returned an error or panicked.
    #[error("provider for dataset '{dataset}' failed: {source}")]
    Invocation {
        /// Dataset being filled.
        dataset: String,
        /// Failure reported by the provider.
        #[source]
        source: ProviderError,
    },

    /// The rendering engine failed.
    #[error("rendering failed: {0}")]
    Rendering(#[from] RenderError),

    /// Page counting over the rendered output failed.
    #[error("page count failed: {0}")]
    PageCount(#[from] PageCountError),

    /// The configured deadline elapsed before generation finished.
    #[error("generation exceeded its deadline of {deadline:?} during {stage}")]
    Timeout {
        /// Stage that was about to run when the deadline was noticed.
        stage: Stage,
        /// Configured deadline.
        deadline: Duration,
    },
}

impl GenerateError {
    /// Returns the stage the error originated from.
    pub fn stage(&self) -> Stage {
        match self {
            Self::DefinitionLoad { .. } | Self::DefinitionMalformed { .. } => Stage::Load,
            Self::ProviderNotFound { .. } => Stage::Resolve,
            Self::ParameterCoercion { .. } => Stage::Bind,
            Self::Invocation { .. } => Stage::Invoke,
            Self::Rendering(_) => Stage::Render,
            Self::PageCount(_) => Stage::PageCount,
            Self::Timeout { stage, .. } => *stage,
        }
    }

    /// Returns the dataset name involved in the failure, if any.
    pub fn dataset(&self) -> Option<&str> {
        match self {
            Self::ProviderNotFound { dataset, .. } | Self::Invocation { dataset, .. } => {
                Some(dataset)
            }
            _ => None,
        }
    }

    pub(crate) fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DefinitionMalformed {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_follows_variant() {
        let err = GenerateError::ParameterCoercion {
            parameter: "orderId".into(),
            value: "abc".into(),
            kind: ParamKind::Int32,
        };
        assert_eq!(err.stage(), Stage::Bind);
        assert!(err.to_string().contains("orderId"));
        assert!(err.to_string().contains("abc"));

        let err = GenerateError::Timeout {
            stage: Stage::Invoke,
            deadline: Duration::from_millis(5),
        };
        assert_eq!(err.stage(), Stage::Invoke);
    }

    #[test]
    fn provider_not_found_names_dataset() {
        let err = GenerateError::ProviderNotFound {
            dataset: "Lines".into(),
            provider_type: "Invoice.Missing".into(),
            signature: "Vec<Line> lines(i32)".into(),
            miss: LookupMiss::Type,
        };
        assert_eq!(err.dataset(), Some("Lines"));
        assert!(err.to_string().contains("'Lines'"));
    }
}
