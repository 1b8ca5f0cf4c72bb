//! JVM class files data structures definitions, and builders to assemble
//! them in memory.

mod addr;

pub mod builder;
pub mod classes;
pub mod code;
pub mod constants;
pub mod errors;
pub mod flags;
pub mod instrs;
pub mod types;

pub use crate::addr::Addr;
pub use crate::builder::{ClassBuilder, CodeBuilder, Label};
pub use crate::classes::{ClassFile, MethodInfo};
