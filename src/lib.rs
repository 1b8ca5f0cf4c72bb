//! # `ClassWorks`
//!
//! `classworks` is the main crate of the `ClassWorks` JVM bytecode analysis
//! project. The project is subdivided into multiple crates, `classworks` acts
//! as entry point by reexporting important structs and functions from those
//! sub-crates. Most of the reexport are done within the `classworks::prelude`
//! namespace.
//!
//! ## Library basics
//!
//! Classes are registered in a `Repo`, which links them into a class
//! hierarchy. The call graph of the registered classes is then computed by
//! resolving every invocation instruction they contain:
//!
//! ```rust
//! use classworks::prelude::*;
//! use classworks::bytecode::flags::MethodFlags;
//! use classworks::bytecode::instrs::ReturnKind;
//!
//! let main = ClassBuilder::new("app/Main")
//!     .method_with_code(MethodFlags::ACC_STATIC, "main", "()V", |code| {
//!         code.invoke_static("app/Util", "run", "()V")?;
//!         code.ret(ReturnKind::Void);
//!         Ok(())
//!     })?
//!     .build();
//! let util = ClassBuilder::new("app/Util")
//!     .method(MethodFlags::ACC_STATIC, "run", "()V")
//!     .build();
//!
//! let mut repo = Repo::new();
//! repo.register_classes([&main, &util], false)?;
//! repo.close_hierarchy()?;
//!
//! let metrics = Metrics::new();
//! let options = ResolverOptions::default();
//! let graph = build_callgraph(&repo, &metrics, &options, Evaluators::default());
//! assert_eq!(graph.nb_concrete_calls(), 1);
//! # Ok::<(), CwError>(())
//! ```
//!
//! Receivers of virtual calls are dispatched on the runtime types reported by
//! a multi-type [`Evaluator`](analysis::evaluation::Evaluator), and call
//! arguments are reconstructed from a particular-value one. Both are
//! optional, see [`pipeline::Evaluators`].
//!
//! ## Sub-crates
//!
//!  - [`cw_bytecode`] contains the in-memory model of class files (constant
//!    pools, instructions, method bodies) and builders to assemble them,
//!  - [`cw_analysis`] contains the analysis algorithms: class hierarchy,
//!    methods resolution, dominators and call resolution.

mod errors;

pub mod pipeline;

pub use cw_analysis as analysis;
pub use cw_bytecode as bytecode;

/// Reexport module of commonly used structures and functions from `ClassWorks` project
/// sub-crates:
///
/// ```rust
/// use classworks::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{CwError, CwResult};
    pub use crate::pipeline::{build_callgraph, build_filtered_callgraph, Evaluators};

    pub use cw_analysis::call::{Call, CallTarget, CallVisitor};
    pub use cw_analysis::callgraph::CallGraph;
    pub use cw_analysis::config::ResolverOptions;
    pub use cw_analysis::errors::AnalysisError;
    pub use cw_analysis::evaluation::{
        EvaluationError, Evaluator, Frames, Nullness, PrecomputedEvaluator, Value,
    };
    pub use cw_analysis::metrics::{MetricType, Metrics};
    pub use cw_analysis::repo::{Class, Repo};
    pub use cw_analysis::resolver::CallResolver;
    pub use cw_analysis::signature::{CodeLocation, MethodSignature};

    pub use cw_bytecode::{errors::BytecodeError, Addr, ClassBuilder, ClassFile, MethodInfo};

    use serde::{Deserialize, Serialize};

    /// Logging verbosity and format.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct LogOptions {
        pub verbose: bool,
        pub debug: bool,
        /// Elastic Common Schema JSON lines instead of plain text.
        pub ecs: bool,
    }

    /// Installs the global logger. The `CW_LOG` environment variable sets
    /// the filter (`info` by default) unless overridden by `options`.
    ///
    /// # Errors
    ///
    /// Fails when a logger has already been installed.
    pub fn init_logger(options: &LogOptions) -> CwResult<()> {
        let env = env_logger::Env::new()
            .filter_or("CW_LOG", "info")
            .write_style("CW_LOG_STYLE");

        let mut builder = env_logger::Builder::from_env(env);
        if options.verbose {
            builder.filter_level(log::LevelFilter::Trace);
        } else if options.debug {
            builder.filter_level(log::LevelFilter::Debug);
        }
        if options.ecs {
            builder.format(ecs_logger::format);
        }
        builder.try_init()?;
        Ok(())
    }
}
