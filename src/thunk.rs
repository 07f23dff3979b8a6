//! Generation of the thunk compilation unit.
//!
//! For an ordered list of declared native methods this emits one native
//! source file containing, in order:
//!
//! 1. a module-level field handle for the instance's function-pointer
//!    array, resolved once at registration time;
//! 2. an inline helper that reads element `i` of that array as a raw
//!    address;
//! 3. one forwarding function per method, whose body casts the looked-up
//!    address to a function-pointer type matching its own signature and
//!    tail-invokes it with every argument forwarded unchanged;
//! 4. a registration entry point that resolves the field handle, builds
//!    the {name, descriptor, thunk} table, and registers it with the
//!    runtime's native-dispatch table.
//!
//! The lookup index baked into each forwarding function is the ordinal
//! of its [`ThunkSpec`], the same ordinal the binding-table builder
//! fills; see [`crate::descriptor::assign_ordinals`].
//!
//! This is pure text generation with no failure modes of its own;
//! downstream compilation or resolution surfaces any inconsistency.

use std::fmt::Write;

use crate::descriptor::{JavaType, ThunkSpec};
use crate::encode;

/// Name of the instance field holding the function-pointer array.
/// Declaring types must expose it as an instance `long[]`.
pub const FUNCTIONS_FIELD: &str = "functions";

/// Managed descriptor of the function-pointer array field.
pub const FUNCTIONS_FIELD_DESCRIPTOR: &str = "[J";

/// Name of the generated registration entry point. Exported unmangled,
/// so it is always resolved literally.
pub const REGISTER_ENTRY_POINT: &str = "registerNative";

/// Generates the thunk compilation unit for the given specs.
pub fn generate(thunks: &[ThunkSpec]) -> String {
    let mut w = SourceWriter::new();

    w.line("#include <jni.h>");
    w.line("jfieldID functionsFldId;");
    w.line("extern \"C\" {");
    w.blank();
    generate_get_function_helper(&mut w);

    for spec in thunks {
        w.blank();
        generate_thunk(&mut w, spec);
    }

    w.blank();
    generate_register_native(&mut w, thunks);
    w.line("}");

    w.finish()
}

/// The helper reading one function pointer out of the receiver's table.
fn generate_get_function_helper(w: &mut SourceWriter) {
    w.line("inline jlong _getFunction(JNIEnv* env, jobject self, jint index) {");
    w.indent();
    w.line("jlong functionPtr;");
    w.line("env->GetLongArrayRegion((jlongArray) env->GetObjectField(self, functionsFldId), index, 1, &functionPtr);");
    w.line("return functionPtr;");
    w.dedent();
    w.line("}");
}

/// One forwarding function. Signature is `(environment, receiver,
/// declared parameters...) -> declared return`; the body forwards every
/// argument to the address at this spec's ordinal.
fn generate_thunk(w: &mut SourceWriter, spec: &ThunkSpec) {
    let method = spec.method();
    let return_token = encode::native_token(method.return_type());

    let mut head = format!("{} {}(JNIEnv* env, jobject self", return_token, method.name());
    for (i, param) in method.params().iter().enumerate() {
        let _ = write!(head, ", {} arg{}", encode::native_token(param), i);
    }
    head.push_str(") {");
    w.line(&head);
    w.indent();

    let mut body = String::new();
    if method.return_type() != &JavaType::Void {
        body.push_str("return ");
    }

    // Cast the looked-up address to this exact signature, then call it.
    let _ = write!(body, "(({}(*)(JNIEnv*, jobject", return_token);
    for param in method.params() {
        let _ = write!(body, ", {}", encode::native_token(param));
    }
    let _ = write!(body, "))_getFunction(env, self, {}))", spec.ordinal());

    body.push_str("(env, self");
    for i in 0..method.params().len() {
        let _ = write!(body, ", arg{}", i);
    }
    body.push_str(");");
    w.line(&body);

    w.dedent();
    w.line("}");
}

/// The registration entry point: resolves the field handle and hands the
/// {name, descriptor, address} table to the runtime.
fn generate_register_native(w: &mut SourceWriter, thunks: &[ThunkSpec]) {
    w.line(&format!(
        "void {}(JNIEnv* env, jclass targetClass) {{",
        REGISTER_ENTRY_POINT
    ));
    w.indent();
    w.line(&format!(
        "functionsFldId = env->GetFieldID(targetClass, \"{}\", \"{}\");",
        FUNCTIONS_FIELD, FUNCTIONS_FIELD_DESCRIPTOR
    ));
    w.line("JNINativeMethod methods[] = {");
    w.indent();
    for spec in thunks {
        let method = spec.method();
        w.line(&format!(
            "{{ (char*)\"{}\", (char*)\"{}\", (void*){} }},",
            method.name(),
            encode::method_descriptor(method),
            method.name()
        ));
    }
    w.dedent();
    w.line("};");
    w.line(&format!(
        "env->RegisterNatives(targetClass, methods, {});",
        thunks.len()
    ));
    w.dedent();
    w.line("}");
}

/// Line-oriented writer with indentation, for emitting native source.
struct SourceWriter {
    out: String,
    depth: usize,
}

const INDENT: &str = "    ";

impl SourceWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        debug_assert!(self.depth > 0, "unbalanced dedent");
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish(self) -> String {
        self.out
    }
}
