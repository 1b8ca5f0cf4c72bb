//! Call resolver configuration.

use serde::{Deserialize, Serialize};

/// Options of a [`CallResolver`](crate::resolver::CallResolver).
///
/// Every field has a default value, so that partial configurations can be
/// deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Drops instance, arguments and return value of calls once visitors
    /// have been notified.
    pub clear_call_values_after_visit: bool,
    /// Computes dominators to tell whether calls are unconditionally
    /// executed. Calls are reported as not control flow dependent otherwise.
    pub use_dominator_analysis: bool,
    /// Also dispatches virtual calls on subclasses of receivers whose type
    /// may be extended (except for `java/lang/Object`).
    pub include_subclasses: bool,
    /// Steps ceiling given to value evaluators, for every method.
    pub max_analysis_steps: Option<usize>,
    /// Does not report calls whose target signature is not fully known.
    pub skip_incomplete_calls: bool,
    /// Ignores exception handlers when computing dominators.
    pub ignore_exception_edges: bool,
    /// Also visits methods of library classes.
    pub include_library_classes: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            clear_call_values_after_visit: true,
            use_dominator_analysis: false,
            include_subclasses: false,
            max_analysis_steps: None,
            skip_incomplete_calls: false,
            ignore_exception_edges: true,
            include_library_classes: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_configuration() {
        let options: ResolverOptions = serde_json::from_str(
            r#"{ "use_dominator_analysis": true, "max_analysis_steps": 1000 }"#,
        )
        .unwrap();
        assert!(options.use_dominator_analysis);
        assert_eq!(options.max_analysis_steps, Some(1000));
        assert!(options.clear_call_values_after_visit);
        assert!(options.ignore_exception_edges);
        assert!(!options.skip_incomplete_calls);

        let empty: ResolverOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ResolverOptions::default());
    }
}
