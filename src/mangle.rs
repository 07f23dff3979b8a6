//! ABI name mangling for generated thunk functions.
//!
//! Implements the Itanium C++ ABI scheme for exactly the signature shapes
//! the thunk generator produces: a length-prefixed function name followed
//! by the two implicit parameters (environment pointer, receiver) and the
//! declared parameters. Compound pointer-to-struct tokens participate in
//! substitution compression; primitive tokens never do.
//!
//! The substitution bookkeeping is deliberately simplified. A conforming
//! mangler registers both the struct name and the pointer to it as
//! substitution candidates; since every compound token here has the shape
//! `P<len><struct>` and the bare struct never recurs on its own, the
//! candidate at table position `k` always carries sequence id `2k + 1`,
//! which the ABI spells `S<base36(2k)>_`. Emitting `S` + base-36(2·k),
//! uppercased, + `_` therefore reproduces the conforming encoding for
//! this vocabulary without tracking the struct-name candidates at all.
//! It is not a general mangler and must not be fed anything outside the
//! signature shapes produced by the signature encoder.

use rustc_hash::FxHashMap;

use jthunk_runtime::{BindError, BindResult};

use crate::descriptor::{JavaType, MethodDescriptor};
use crate::encode;

/// Computes the mangled linker symbol for the thunk of one declared
/// instance method.
///
/// Fails with a precondition violation for static descriptors: the thunk
/// calling convention always carries a receiver, so only instance
/// methods are eligible.
pub fn mangle(method: &MethodDescriptor) -> BindResult<String> {
    if method.is_static() {
        return Err(BindError::precondition(format!(
            "{} is static; only native instance methods can be bound through thunks",
            method
        )));
    }

    let mut mangler = Mangler::new(method.name());

    // Every thunk receives the environment pointer and the receiver
    // before its declared parameters; these occupy substitution table
    // positions 0 and 1 on every mangle.
    mangler.pointer_to_struct("JNIEnv_");
    mangler.pointer_to_struct("_jobject");

    for param in method.params() {
        match param {
            p @ (JavaType::Void
            | JavaType::Boolean
            | JavaType::Byte
            | JavaType::Char
            | JavaType::Short
            | JavaType::Int
            | JavaType::Long
            | JavaType::Float
            | JavaType::Double) => mangler.primitive(abi_token(p)),
            JavaType::Array(element) if element.is_primitive() => {
                let struct_name = format!("_{}Array", encode::native_token(element));
                mangler.pointer_to_struct(&struct_name);
            }
            JavaType::Array(_) => mangler.pointer_to_struct("_jobjectArray"),
            JavaType::String => mangler.pointer_to_struct("_jstring"),
            JavaType::Class => mangler.pointer_to_struct("_jclass"),
            JavaType::Object(_) => mangler.pointer_to_struct("_jobject"),
        }
    }

    Ok(mangler.finish())
}

/// One-character Itanium tokens for the primitive types, assuming an
/// LP64 target (long maps to `l`, not `x`).
fn abi_token(ty: &JavaType) -> char {
    match ty {
        JavaType::Void => 'v',
        JavaType::Boolean => 'h',
        JavaType::Byte => 'a',
        JavaType::Char => 't',
        JavaType::Short => 's',
        JavaType::Int => 'i',
        JavaType::Long => 'l',
        JavaType::Float => 'f',
        JavaType::Double => 'd',
        // The match above only reaches here through is_primitive().
        other => unreachable!("not a primitive type: {:?}", other),
    }
}

/// Substitution-aware symbol assembler. Each [`mangle`] call gets a
/// fresh table; no state crosses calls.
struct Mangler {
    out: String,
    substitutions: FxHashMap<String, usize>,
    next_position: usize,
}

impl Mangler {
    fn new(function_name: &str) -> Self {
        let mut out = String::from("_Z");
        out.push_str(&length_prefixed(function_name));
        Self {
            out,
            substitutions: FxHashMap::default(),
            next_position: 0,
        }
    }

    /// Primitive tokens are emitted verbatim and never substituted.
    fn primitive(&mut self, token: char) {
        self.out.push(token);
    }

    /// Emits a `P<len><struct>` compound token, or a back-reference if
    /// the identical token was emitted before in this mangle.
    fn pointer_to_struct(&mut self, struct_name: &str) {
        let token = format!("P{}", length_prefixed(struct_name));
        if let Some(&position) = self.substitutions.get(&token) {
            self.out.push('S');
            self.out.push_str(&base36_upper(position * 2));
            self.out.push('_');
        } else {
            self.substitutions.insert(token.clone(), self.next_position);
            self.next_position += 1;
            self.out.push_str(&token);
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn length_prefixed(name: &str) -> String {
    format!("{}{}", name.len(), name)
}

/// Base-36 with uppercase digits, as substitution sequence ids use.
fn base36_upper(mut n: usize) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[n % 36]);
        n /= 36;
    }
    buf.iter().rev().map(|&b| b as char).collect()
}
