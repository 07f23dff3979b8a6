//! jthunk runtime: compiled-module model, compile options, and the
//! dynamic (marshalling) invoker.
//!
//! This crate knows nothing about signatures, mangling, or thunk text.
//! It models what comes back from a compiler, a [`NativeModule`] with a
//! symbol table and diagnostics, and how to call into it before a thunk
//! exists.

pub mod errors;
pub mod invoke;
pub mod module;
pub mod options;

pub use errors::{BindError, BindErrorKind, BindResult};
pub use invoke::{invoke, EnvHandle, ObjectRef, Value};
pub use module::{CompilerService, NativeFunction, NativeModule, NativeSignature, NativeType};
pub use options::{jni_include_flags, CompileOptions};
