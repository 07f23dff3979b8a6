//! Compiled native modules and their exported functions.
//!
//! A [`NativeModule`] is the atomic output of one compilation: either a
//! complete symbol table with empty diagnostics, or no usable symbols plus
//! the compiler's diagnostics passed through verbatim. Function addresses
//! are plain 64-bit words until a call site casts them; the module keeps
//! the compiled code alive, so anything holding derived addresses must
//! also hold the module (typically through an `Arc`).

use rustc_hash::FxHashMap;
use std::fmt;

use crate::errors::BindResult;
use crate::options::CompileOptions;

/// Type vocabulary for native function signatures, as seen by the
/// dynamic invoker. This is the small fixed set of shapes the binding
/// layer produces; it is not a general native type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// Pointer to the calling environment, filled in by the invoker.
    Env,
    /// Generic object reference.
    Object,
    /// String reference.
    String,
    /// Type (class) reference.
    Class,
    /// Object array reference; nested arrays are object arrays too.
    ObjectArray,
}

impl NativeType {
    /// True for types the invoker widens to a 64-bit integer word.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            NativeType::Boolean
                | NativeType::Byte
                | NativeType::Char
                | NativeType::Short
                | NativeType::Int
                | NativeType::Long
        )
    }

    /// True for reference-shaped types passed through as opaque words.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            NativeType::Object | NativeType::String | NativeType::Class | NativeType::ObjectArray
        )
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            NativeType::Void => "void",
            NativeType::Boolean => "jboolean",
            NativeType::Byte => "jbyte",
            NativeType::Char => "jchar",
            NativeType::Short => "jshort",
            NativeType::Int => "jint",
            NativeType::Long => "jlong",
            NativeType::Float => "jfloat",
            NativeType::Double => "jdouble",
            NativeType::Env => "JNIEnv*",
            NativeType::Object => "jobject",
            NativeType::String => "jstring",
            NativeType::Class => "jclass",
            NativeType::ObjectArray => "jobjectArray",
        };
        f.write_str(token)
    }
}

/// Signature of a native function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSignature {
    pub params: Vec<NativeType>,
    pub return_type: NativeType,
}

impl NativeSignature {
    pub fn new(params: Vec<NativeType>, return_type: NativeType) -> Self {
        Self {
            params,
            return_type,
        }
    }
}

/// A compiled native function exported under its decorated name.
#[derive(Debug, Clone)]
pub struct NativeFunction {
    name: String,
    address: u64,
    signature: NativeSignature,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>, address: u64, signature: NativeSignature) -> Self {
        Self {
            name: name.into(),
            address,
            signature,
        }
    }

    /// The function's decorated (linker-visible) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry point address. May be zero for intrinsics.
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn signature(&self) -> &NativeSignature {
        &self.signature
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction '{}' <0x{:x}>", self.name, self.address)
    }
}

/// A compiled native module: exported functions indexed by decorated name,
/// plus any compiler diagnostics.
#[derive(Debug, Default)]
pub struct NativeModule {
    /// Exported functions in the order the compiler listed them.
    functions: Vec<NativeFunction>,
    /// Index into `functions` by decorated name.
    name_index: FxHashMap<String, usize>,
    /// Raw compiler diagnostics; empty on success.
    diagnostics: String,
}

impl NativeModule {
    /// A successfully compiled module with the given exports.
    pub fn compiled(functions: Vec<NativeFunction>) -> Self {
        let mut name_index = FxHashMap::default();
        for (i, function) in functions.iter().enumerate() {
            name_index.insert(function.name().to_string(), i);
        }
        Self {
            functions,
            name_index,
            diagnostics: String::new(),
        }
    }

    /// A failed compilation: no usable symbols, diagnostics preserved verbatim.
    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            functions: Vec::new(),
            name_index: FxHashMap::default(),
            diagnostics: diagnostics.into(),
        }
    }

    /// All functions exported by this module. Might be empty.
    pub fn functions(&self) -> &[NativeFunction] {
        &self.functions
    }

    /// Looks up a function by its decorated name.
    pub fn function_by_name(&self, name: &str) -> Option<&NativeFunction> {
        self.name_index.get(name).map(|&i| &self.functions[i])
    }

    /// Finds the first exported symbol whose text contains `simple_name`.
    /// Diagnostic aid for resolution failures, never used for lookup.
    pub fn find_similar(&self, simple_name: &str) -> Option<&str> {
        self.functions
            .iter()
            .map(|f| f.name())
            .find(|name| name.contains(simple_name))
    }

    /// True if compilation produced any diagnostics.
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Raw compiler diagnostics, unmodified.
    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }
}

impl fmt::Display for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeModule <{} functions>", self.functions.len())
    }
}

/// Compiles generated source text into a [`NativeModule`].
///
/// Compilation is atomic: implementations either return a module whose
/// symbol table is complete (empty diagnostics) or one with
/// [`NativeModule::has_errors`] set and the raw diagnostics attached.
/// Implementations must honor [`CompileOptions::validate`] before doing
/// any work; a rejected flag is a configuration error, not something to
/// drop silently. Calls may race from independent threads; no mutable
/// state may be shared across them.
pub trait CompilerService {
    fn compile(&self, source: &str, options: &CompileOptions) -> BindResult<NativeModule>;
}
