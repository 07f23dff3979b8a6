//! Dynamic native-method binding through generated thunks.
//!
//! Given the declared native methods of a managed type, this crate
//! generates a native forwarding layer (one thunk per method, reading its
//! implementation address from a per-instance function-pointer table),
//! mangles the decorated symbol each implementation must export, and
//! resolves implementation modules into ordinal-ordered address tables.
//!
//! The compiled-module model and the dynamic invoker live in the
//! `jthunk-runtime` crate, re-exported here.

pub mod bindings;
pub mod descriptor;
pub mod encode;
pub mod mangle;
pub mod thunk;

pub use bindings::{BindingTable, NativeBindings, SymbolMode};
pub use descriptor::{
    assign_ordinals, DescriptorSource, JavaType, MethodDescriptor, ThunkSpec,
};
pub use mangle::mangle;

pub use jthunk_runtime::{
    invoke, jni_include_flags, BindError, BindErrorKind, BindResult, CompileOptions,
    CompilerService, EnvHandle, NativeFunction, NativeModule, NativeSignature, NativeType,
    ObjectRef, Value,
};
