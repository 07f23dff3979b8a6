//! Binding orchestration: from a declared-method source to a resolved
//! function-pointer table.
//!
//! [`NativeBindings::initialize`] runs once per declaring type: it
//! validates the type, assigns ordinals, generates the thunk unit, and
//! compiles it. The resulting thunk module is immutable and shared.
//! [`NativeBindings::function_pointers`] then runs once per
//! implementation module, resolving every declared method into a
//! [`BindingTable`] whose slot order matches the thunk ordinals.
//!
//! Resolution is all or nothing. A single missing symbol fails the whole
//! table, naming the method, the exact symbol text searched, and the
//! closest exported symbol when one exists. There is no partial binding
//! and no fallback to another symbol.

use std::sync::Arc;

use tracing::debug;

use jthunk_runtime::{
    invoke, BindError, BindResult, CompileOptions, CompilerService, EnvHandle, NativeModule,
    ObjectRef, Value,
};

use crate::descriptor::{assign_ordinals, DescriptorSource, ThunkSpec};
use crate::mangle;
use crate::thunk;

/// How a declared method maps to a linker symbol in an implementation
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolMode {
    /// The symbol is the plain method name, for implementations compiled
    /// with unmangled linkage.
    Literal,
    /// The symbol is the decorated thunk name, for implementations that
    /// define the functions with native linkage under the same
    /// signatures the thunks carry.
    Mangled,
}

/// The per-type binding state: ordinal-ordered thunk specs and the
/// compiled thunk module that owns the thunk entry points.
#[derive(Debug)]
pub struct NativeBindings {
    thunks: Vec<ThunkSpec>,
    thunk_module: Arc<NativeModule>,
}

impl NativeBindings {
    /// Builds the bindings for one declaring type with default compile
    /// options.
    pub fn initialize(
        source: &dyn DescriptorSource,
        compiler: &dyn CompilerService,
    ) -> BindResult<Self> {
        Self::initialize_with_options(source, compiler, &CompileOptions::default())
    }

    /// Builds the bindings for one declaring type.
    ///
    /// Fails with a configuration error if the type lacks the
    /// function-table field, a precondition violation if any declared
    /// method is static, and a compilation error (raw diagnostics
    /// attached) if the generated thunk unit does not compile.
    pub fn initialize_with_options(
        source: &dyn DescriptorSource,
        compiler: &dyn CompilerService,
        options: &CompileOptions,
    ) -> BindResult<Self> {
        if !source.has_function_table_field() {
            return Err(BindError::configuration(format!(
                "declaring type has no `{}` instance field of descriptor `{}`",
                thunk::FUNCTIONS_FIELD,
                thunk::FUNCTIONS_FIELD_DESCRIPTOR
            )));
        }

        let methods = source.declared_methods();
        if let Some(method) = methods.iter().find(|m| m.is_static()) {
            return Err(BindError::precondition(format!(
                "{} is static; only native instance methods can be bound through thunks",
                method
            )));
        }

        options.validate()?;
        let thunks = assign_ordinals(methods);
        let unit = thunk::generate(&thunks);

        debug!(
            methods = thunks.len(),
            unit_bytes = unit.len(),
            "compiling thunk unit"
        );
        let module = compiler.compile(&unit, options)?;
        if module.has_errors() {
            return Err(BindError::compilation(module.diagnostics().to_string()));
        }

        Ok(Self {
            thunks,
            thunk_module: Arc::new(module),
        })
    }

    /// Ordinal-ordered thunk specs. Slot `i` of every table built by
    /// [`Self::function_pointers`] belongs to `thunks()[i]`.
    pub fn thunks(&self) -> &[ThunkSpec] {
        &self.thunks
    }

    /// The compiled thunk module.
    pub fn thunk_module(&self) -> &Arc<NativeModule> {
        &self.thunk_module
    }

    /// Registers the compiled thunks with the runtime's dispatch table
    /// for `target_class`, through the module's registration entry
    /// point.
    pub fn register(&self, env: EnvHandle, target_class: ObjectRef) -> BindResult<()> {
        let entry = self
            .thunk_module
            .function_by_name(thunk::REGISTER_ENTRY_POINT)
            .ok_or_else(|| {
                BindError::resolution(
                    thunk::REGISTER_ENTRY_POINT,
                    thunk::REGISTER_ENTRY_POINT,
                    self.thunk_module
                        .find_similar(thunk::REGISTER_ENTRY_POINT)
                        .map(str::to_string),
                )
            })?;
        invoke(entry, env, &[Value::Env, Value::Class(target_class)])?;
        Ok(())
    }

    /// Resolves every declared method against `implementation` and
    /// returns the ordinal-ordered address table.
    ///
    /// All or nothing: the first unresolvable method fails the call and
    /// no table is produced. A symbol that resolves to a null address is
    /// a resolution failure too; null slots must never reach a thunk.
    pub fn function_pointers(
        &self,
        implementation: &Arc<NativeModule>,
        mode: SymbolMode,
    ) -> BindResult<BindingTable> {
        if implementation.has_errors() {
            return Err(BindError::compilation(
                implementation.diagnostics().to_string(),
            ));
        }

        let mut addresses = Vec::with_capacity(self.thunks.len());
        for spec in &self.thunks {
            let method = spec.method();
            let symbol = match mode {
                SymbolMode::Literal => method.name().to_string(),
                SymbolMode::Mangled => mangle::mangle(method)?,
            };
            let resolved = implementation
                .function_by_name(&symbol)
                .filter(|f| f.address() != 0)
                .ok_or_else(|| {
                    BindError::resolution(
                        method.to_string(),
                        symbol.clone(),
                        implementation.find_similar(method.name()).map(str::to_string),
                    )
                })?;
            debug!(
                ordinal = spec.ordinal(),
                method = %method,
                symbol = %symbol,
                address = format_args!("0x{:x}", resolved.address()),
                "resolved binding slot"
            );
            addresses.push(resolved.address());
        }

        Ok(BindingTable {
            module: Arc::clone(implementation),
            addresses,
        })
    }
}

/// An ordinal-ordered table of raw implementation addresses.
///
/// The table holds the implementation module it was resolved from, so the
/// addresses cannot outlive the compiled code backing them. Slot `i`
/// corresponds to the thunk with ordinal `i`.
#[derive(Debug, Clone)]
pub struct BindingTable {
    module: Arc<NativeModule>,
    addresses: Vec<u64>,
}

impl BindingTable {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// The address bound at `ordinal`, if the table has such a slot.
    /// Every present slot is non-null.
    pub fn address(&self, ordinal: usize) -> Option<u64> {
        self.addresses.get(ordinal).copied()
    }

    /// All addresses in ordinal order, e.g. for writing into an
    /// instance's function-table field.
    pub fn addresses(&self) -> &[u64] {
        &self.addresses
    }

    /// The implementation module this table keeps alive.
    pub fn module(&self) -> &Arc<NativeModule> {
        &self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{JavaType, MethodDescriptor};
    use jthunk_runtime::{NativeFunction, NativeSignature, NativeType};
    use std::sync::Mutex;

    extern "C" fn register_stub(_env: u64, _class: u64) -> u64 {
        0
    }

    /// Compiler test double: returns a fixed symbol table and records
    /// the source it was handed.
    struct FixedCompiler {
        exports: Vec<NativeFunction>,
        last_source: Mutex<String>,
    }

    impl FixedCompiler {
        fn new(exports: Vec<NativeFunction>) -> Self {
            Self {
                exports,
                last_source: Mutex::new(String::new()),
            }
        }

        fn thunk_exports() -> Vec<NativeFunction> {
            vec![NativeFunction::new(
                thunk::REGISTER_ENTRY_POINT,
                register_stub as usize as u64,
                NativeSignature::new(
                    vec![NativeType::Env, NativeType::Class],
                    NativeType::Void,
                ),
            )]
        }
    }

    impl CompilerService for FixedCompiler {
        fn compile(&self, source: &str, options: &CompileOptions) -> BindResult<NativeModule> {
            options.validate()?;
            *self.last_source.lock().unwrap() = source.to_string();
            Ok(NativeModule::compiled(self.exports.clone()))
        }
    }

    struct FailingCompiler;

    impl CompilerService for FailingCompiler {
        fn compile(&self, _source: &str, _options: &CompileOptions) -> BindResult<NativeModule> {
            Ok(NativeModule::failed(
                "code.cpp:1:1: error: expected expression\n",
            ))
        }
    }

    fn methods() -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::instance("square", vec![JavaType::Int], JavaType::Int),
            MethodDescriptor::instance("reset", vec![], JavaType::Void),
        ]
    }

    fn void_sig() -> NativeSignature {
        NativeSignature::new(vec![], NativeType::Void)
    }

    #[test]
    fn initialize_compiles_generated_unit() {
        let compiler = FixedCompiler::new(FixedCompiler::thunk_exports());
        let bindings =
            NativeBindings::initialize(&methods(), &compiler).expect("initialize succeeds");
        assert_eq!(bindings.thunks().len(), 2);
        assert_eq!(bindings.thunks()[0].method().name(), "square");
        assert_eq!(bindings.thunks()[1].ordinal(), 1);

        let source = compiler.last_source.lock().unwrap();
        assert!(source.contains("jint square(JNIEnv* env, jobject self, jint arg0)"));
        assert!(source.contains("void registerNative(JNIEnv* env, jclass targetClass)"));
    }

    #[test]
    fn initialize_rejects_static_methods() {
        let compiler = FixedCompiler::new(vec![]);
        let declared = vec![MethodDescriptor::static_method(
            "square",
            vec![JavaType::Int],
            JavaType::Int,
        )];
        let err = NativeBindings::initialize(&declared, &compiler)
            .expect_err("static methods are not bindable");
        assert!(err.to_string().contains("square(I)I is static"));
    }

    #[test]
    fn initialize_requires_function_table_field() {
        struct NoField;
        impl DescriptorSource for NoField {
            fn declared_methods(&self) -> Vec<MethodDescriptor> {
                vec![]
            }
            fn has_function_table_field(&self) -> bool {
                false
            }
        }
        let compiler = FixedCompiler::new(vec![]);
        let err = NativeBindings::initialize(&NoField, &compiler)
            .expect_err("field is mandatory");
        assert!(err.to_string().contains("`functions` instance field"));
    }

    #[test]
    fn initialize_surfaces_compiler_diagnostics() {
        let err = NativeBindings::initialize(&methods(), &FailingCompiler)
            .expect_err("diagnostics fail initialization");
        assert!(err.to_string().contains("expected expression"));
    }

    #[test]
    fn function_pointers_resolve_in_ordinal_order() {
        let compiler = FixedCompiler::new(FixedCompiler::thunk_exports());
        let bindings = NativeBindings::initialize(&methods(), &compiler).expect("initialize");

        let implementation = Arc::new(NativeModule::compiled(vec![
            NativeFunction::new("reset", 0x2000, void_sig()),
            NativeFunction::new("square", 0x1000, void_sig()),
        ]));
        let table = bindings
            .function_pointers(&implementation, SymbolMode::Literal)
            .expect("all symbols present");
        assert_eq!(table.len(), 2);
        assert_eq!(table.address(0), Some(0x1000), "square is ordinal 0");
        assert_eq!(table.address(1), Some(0x2000), "reset is ordinal 1");
        assert_eq!(table.addresses(), &[0x1000, 0x2000]);
        assert_eq!(table.address(2), None);
    }

    #[test]
    fn mangled_mode_searches_decorated_names() {
        let compiler = FixedCompiler::new(FixedCompiler::thunk_exports());
        let bindings = NativeBindings::initialize(&methods(), &compiler).expect("initialize");

        let implementation = Arc::new(NativeModule::compiled(vec![
            NativeFunction::new("_Z6squareP7JNIEnv_P8_jobjecti", 0x1000, void_sig()),
            NativeFunction::new("_Z5resetP7JNIEnv_P8_jobject", 0x2000, void_sig()),
        ]));
        let table = bindings
            .function_pointers(&implementation, SymbolMode::Mangled)
            .expect("decorated symbols present");
        assert_eq!(table.addresses(), &[0x1000, 0x2000]);

        // The same module does not resolve literally.
        let err = bindings
            .function_pointers(&implementation, SymbolMode::Literal)
            .expect_err("plain names are absent");
        assert!(err
            .to_string()
            .contains("searched for symbol `square`"));
    }

    #[test]
    fn missing_symbol_names_method_and_suggests_similar() {
        let compiler = FixedCompiler::new(FixedCompiler::thunk_exports());
        let bindings = NativeBindings::initialize(&methods(), &compiler).expect("initialize");

        let implementation = Arc::new(NativeModule::compiled(vec![NativeFunction::new(
            "_Z6squarePv",
            0x1000,
            void_sig(),
        )]));
        let err = bindings
            .function_pointers(&implementation, SymbolMode::Mangled)
            .expect_err("symbol differs");
        let text = err.to_string();
        assert!(text.contains("missing implementation for square(I)I"));
        assert!(text.contains("searched for symbol `_Z6squareP7JNIEnv_P8_jobjecti`"));
        assert!(text.contains("maybe you meant: _Z6squarePv"));
    }

    #[test]
    fn null_addresses_do_not_resolve() {
        let compiler = FixedCompiler::new(FixedCompiler::thunk_exports());
        let bindings = NativeBindings::initialize(&methods(), &compiler).expect("initialize");

        let implementation = Arc::new(NativeModule::compiled(vec![
            NativeFunction::new("square", 0, void_sig()),
            NativeFunction::new("reset", 0x2000, void_sig()),
        ]));
        let err = bindings
            .function_pointers(&implementation, SymbolMode::Literal)
            .expect_err("null slot is a resolution failure");
        assert!(err.to_string().contains("missing implementation for square(I)I"));
    }

    #[test]
    fn failed_implementation_module_is_rejected_before_resolution() {
        let compiler = FixedCompiler::new(FixedCompiler::thunk_exports());
        let bindings = NativeBindings::initialize(&methods(), &compiler).expect("initialize");

        let implementation = Arc::new(NativeModule::failed("code.cpp:7:1: error: oops\n"));
        let err = bindings
            .function_pointers(&implementation, SymbolMode::Literal)
            .expect_err("broken module cannot resolve");
        assert!(err.to_string().contains("error: oops"));
    }

    #[test]
    fn table_keeps_implementation_module_alive() {
        let compiler = FixedCompiler::new(FixedCompiler::thunk_exports());
        let bindings = NativeBindings::initialize(&methods(), &compiler).expect("initialize");

        let implementation = Arc::new(NativeModule::compiled(vec![
            NativeFunction::new("square", 0x1000, void_sig()),
            NativeFunction::new("reset", 0x2000, void_sig()),
        ]));
        let table = bindings
            .function_pointers(&implementation, SymbolMode::Literal)
            .expect("resolve");
        drop(implementation);
        // The table's Arc is the remaining owner; the addresses stay valid.
        assert_eq!(Arc::strong_count(table.module()), 1);
        assert_eq!(table.addresses(), &[0x1000, 0x2000]);
    }

    #[test]
    fn register_invokes_entry_point() {
        let compiler = FixedCompiler::new(FixedCompiler::thunk_exports());
        let bindings = NativeBindings::initialize(&methods(), &compiler).expect("initialize");
        bindings
            .register(EnvHandle::NULL, 0x40)
            .expect("registration entry point is exported");
    }

    #[test]
    fn register_fails_without_entry_point() {
        let compiler = FixedCompiler::new(vec![]);
        let bindings = NativeBindings::initialize(&methods(), &compiler).expect("initialize");
        let err = bindings
            .register(EnvHandle::NULL, 0x40)
            .expect_err("no entry point exported");
        assert!(err.to_string().contains("registerNative"));
    }
}
