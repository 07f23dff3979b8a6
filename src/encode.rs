//! Encoding of semantic types into the two vocabularies native binding
//! needs: managed type-descriptor tokens (for registration with the
//! runtime's dispatch table) and native type tokens (for generated
//! source text).
//!
//! All functions here are total, pure lookups over the closed
//! [`JavaType`] union. There is no global state and no failure mode.

use jthunk_runtime::NativeType;

use crate::descriptor::{JavaType, MethodDescriptor};

/// Managed type-descriptor token, e.g. `I` for `Int` and
/// `Ljava/lang/String;` for a string reference. Arrays prefix `[`.
pub fn descriptor(ty: &JavaType) -> String {
    match ty {
        JavaType::Void => "V".to_string(),
        JavaType::Boolean => "Z".to_string(),
        JavaType::Byte => "B".to_string(),
        JavaType::Char => "C".to_string(),
        JavaType::Short => "S".to_string(),
        JavaType::Int => "I".to_string(),
        JavaType::Long => "J".to_string(),
        JavaType::Float => "F".to_string(),
        JavaType::Double => "D".to_string(),
        JavaType::Array(element) => format!("[{}", descriptor(element)),
        JavaType::String => "Ljava/lang/String;".to_string(),
        JavaType::Class => "Ljava/lang/Class;".to_string(),
        JavaType::Object(name) => format!("L{};", name.replace('.', "/")),
    }
}

/// Native type token as it appears in generated source, e.g. `jint`,
/// `jintArray`, `jobject`. Arrays of primitives get the element token
/// with an `Array` suffix; arrays of references (and of arrays) are all
/// `jobjectArray` at the native level.
pub fn native_token(ty: &JavaType) -> String {
    match ty {
        JavaType::Void => "void".to_string(),
        JavaType::Boolean => "jboolean".to_string(),
        JavaType::Byte => "jbyte".to_string(),
        JavaType::Char => "jchar".to_string(),
        JavaType::Short => "jshort".to_string(),
        JavaType::Int => "jint".to_string(),
        JavaType::Long => "jlong".to_string(),
        JavaType::Float => "jfloat".to_string(),
        JavaType::Double => "jdouble".to_string(),
        JavaType::Array(element) if element.is_primitive() => {
            format!("{}Array", native_token(element))
        }
        JavaType::Array(_) => "jobjectArray".to_string(),
        JavaType::String => "jstring".to_string(),
        JavaType::Class => "jclass".to_string(),
        JavaType::Object(_) => "jobject".to_string(),
    }
}

/// Full managed method signature, e.g. `(I)I` for `int -> int`.
pub fn method_descriptor(method: &MethodDescriptor) -> String {
    let mut out = String::from("(");
    for param in method.params() {
        out.push_str(&descriptor(param));
    }
    out.push(')');
    out.push_str(&descriptor(method.return_type()));
    out
}

/// The invoker-level type for a semantic type: integrals stay integral,
/// every array is an object array, references keep their kind.
pub fn native_type(ty: &JavaType) -> NativeType {
    match ty {
        JavaType::Void => NativeType::Void,
        JavaType::Boolean => NativeType::Boolean,
        JavaType::Byte => NativeType::Byte,
        JavaType::Char => NativeType::Char,
        JavaType::Short => NativeType::Short,
        JavaType::Int => NativeType::Int,
        JavaType::Long => NativeType::Long,
        JavaType::Float => NativeType::Float,
        JavaType::Double => NativeType::Double,
        JavaType::Array(_) => NativeType::ObjectArray,
        JavaType::String => NativeType::String,
        JavaType::Class => NativeType::Class,
        JavaType::Object(_) => NativeType::Object,
    }
}
