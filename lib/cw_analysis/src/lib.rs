//! This crate provides the whole-program call graph construction algorithms
//! of the `ClassWorks` project: invocation resolution, dominators and call
//! resolution over a repository of JVM classes.

pub mod call;
pub mod callgraph;
pub mod config;
pub mod controlflow;
pub mod dominators;
pub mod errors;
pub mod evaluation;
pub mod hierarchy;
pub mod metrics;
pub mod repo;
pub mod resolution;
pub mod resolver;
pub mod signature;

