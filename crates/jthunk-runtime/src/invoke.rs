//! Dynamic (marshalling) invocation of compiled native functions.
//!
//! This is the slow fallback path used before a thunk exists: every
//! argument is converted to a 64-bit word according to a small fixed set
//! of rules, the entry point is called through an arity-matched cast, and
//! the returned word is converted back by the declared return type. A
//! thunk call is roughly three orders of magnitude faster; this path
//! exists for correctness and for bootstrapping (e.g. calling a thunk
//! module's registration entry point).
//!
//! Conversion rules, per argument:
//! - integral types are widened to a 64-bit word
//! - an `Env` parameter consumes a [`Value::Env`] sentinel, which is
//!   replaced by the caller's environment handle
//! - string, class, and array references are passed through verbatim,
//!   with a type-check that fails on mismatch
//! - a generic object parameter accepts any reference value
//! - `Absent` is passed as a null reference
//!
//! Return values convert back by the same rules; any native type with no
//! defined reverse conversion (including floating point) becomes
//! [`Value::Absent`].

use smallvec::SmallVec;
use tracing::debug;

use crate::errors::{BindError, BindResult};
use crate::module::{NativeFunction, NativeType};

/// Opaque handle to the calling environment, substituted for
/// [`Value::Env`] sentinel arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvHandle(pub u64);

impl EnvHandle {
    pub const NULL: EnvHandle = EnvHandle(0);
}

/// Opaque managed reference, passed through marshalling untouched.
pub type ObjectRef = u64;

/// Argument and return vocabulary for dynamic invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Null reference as an argument; "no defined conversion" as a result.
    Absent,
    /// Any integral value, widened.
    Long(i64),
    /// Sentinel replaced by the current environment handle.
    Env,
    /// Generic object reference.
    Object(ObjectRef),
    /// String reference.
    Str(ObjectRef),
    /// Class reference.
    Class(ObjectRef),
    /// Object array reference.
    ObjectArray(ObjectRef),
}

impl Value {
    fn kind_name(&self) -> &'static str {
        match self {
            Value::Absent => "Absent",
            Value::Long(_) => "Long",
            Value::Env => "Env",
            Value::Object(_) => "Object",
            Value::Str(_) => "Str",
            Value::Class(_) => "Class",
            Value::ObjectArray(_) => "ObjectArray",
        }
    }
}

/// Most signatures in this subsystem have <= 8 parameters.
type WordVec = SmallVec<[u64; 8]>;

/// Largest arity the word-based dispatch supports.
const MAX_ARITY: usize = 10;

/// Invokes a compiled function through the marshalling path.
///
/// The argument list must match the function's declared parameter list
/// exactly, including the leading `Env` parameter when the function
/// expects one. Fails with an invalid-argument error on any count,
/// conversion, or arity mismatch; never calls with misconverted words.
pub fn invoke(function: &NativeFunction, env: EnvHandle, args: &[Value]) -> BindResult<Value> {
    let signature = function.signature();
    if args.len() != signature.params.len() {
        return Err(BindError::invalid_argument(
            format!("invoking {}", function.name()),
            format!("{} argument(s)", signature.params.len()),
            format!("{}", args.len()),
        ));
    }
    if signature.params.len() > MAX_ARITY {
        return Err(BindError::invalid_argument(
            format!("invoking {}", function.name()),
            format!("at most {} arguments", MAX_ARITY),
            format!("{}", signature.params.len()),
        ));
    }
    if function.address() == 0 {
        return Err(BindError::invalid_argument(
            format!("invoking {}", function.name()),
            "a non-null entry point",
            "a null address (intrinsic?)",
        ));
    }

    let mut words = WordVec::new();
    for (position, (arg, param)) in args.iter().zip(signature.params.iter()).enumerate() {
        words.push(marshal(arg, *param, env, position)?);
    }

    debug!(
        function = %function.name(),
        arity = words.len(),
        "dynamic invoke"
    );

    let word = unsafe { call_by_arity(function.address(), &words) };
    Ok(unmarshal(word, signature.return_type))
}

/// Converts one argument to its 64-bit word representation.
fn marshal(arg: &Value, param: NativeType, env: EnvHandle, position: usize) -> BindResult<u64> {
    let mismatch = |found: &Value| {
        BindError::invalid_argument(
            format!("argument {}", position),
            param.to_string(),
            found.kind_name(),
        )
    };
    match param {
        NativeType::Env => match arg {
            // The sentinel's payload, if any, is ignored: the current
            // environment handle is substituted unconditionally.
            Value::Env | Value::Absent => Ok(env.0),
            other => Err(mismatch(other)),
        },
        p if p.is_integral() => match arg {
            Value::Long(v) => Ok(*v as u64),
            other => Err(mismatch(other)),
        },
        NativeType::String => match arg {
            Value::Str(w) => Ok(*w),
            Value::Absent => Ok(0),
            other => Err(mismatch(other)),
        },
        NativeType::Class => match arg {
            Value::Class(w) => Ok(*w),
            Value::Absent => Ok(0),
            other => Err(mismatch(other)),
        },
        NativeType::ObjectArray => match arg {
            Value::ObjectArray(w) => Ok(*w),
            Value::Absent => Ok(0),
            other => Err(mismatch(other)),
        },
        NativeType::Object => match arg {
            Value::Object(w) | Value::Str(w) | Value::Class(w) | Value::ObjectArray(w) => Ok(*w),
            Value::Absent => Ok(0),
            other => Err(mismatch(other)),
        },
        // Floating point and void parameters have no defined conversion.
        other => Err(BindError::invalid_argument(
            format!("argument {}", position),
            "a convertible parameter type",
            other.to_string(),
        )),
    }
}

/// Converts the returned word back by the declared native return type.
fn unmarshal(word: u64, return_type: NativeType) -> Value {
    match return_type {
        NativeType::Boolean => Value::Long((word as u8 != 0) as i64),
        NativeType::Byte => Value::Long(word as u8 as i8 as i64),
        NativeType::Char => Value::Long(word as u16 as i64),
        NativeType::Short => Value::Long(word as u16 as i16 as i64),
        NativeType::Int => Value::Long(word as u32 as i32 as i64),
        NativeType::Long => Value::Long(word as i64),
        NativeType::Object => Value::Object(word),
        NativeType::String => Value::Str(word),
        NativeType::Class => Value::Class(word),
        NativeType::ObjectArray => Value::ObjectArray(word),
        // Void, floating point, and Env results have no reverse conversion.
        _ => Value::Absent,
    }
}

/// Calls `address` with the marshalled words through an arity-matched cast.
///
/// # Safety
///
/// `address` must be the entry point of a live `extern "C"` function whose
/// parameters are all register-sized integral or pointer values matching
/// `words` in count. The caller (via [`invoke`]) guarantees count and
/// conversion; liveness is guaranteed by the owning module.
unsafe fn call_by_arity(address: u64, words: &[u64]) -> u64 {
    use std::mem::transmute;
    let a = address as usize;
    let w = words;
    match w.len() {
        0 => transmute::<usize, extern "C" fn() -> u64>(a)(),
        1 => transmute::<usize, extern "C" fn(u64) -> u64>(a)(w[0]),
        2 => transmute::<usize, extern "C" fn(u64, u64) -> u64>(a)(w[0], w[1]),
        3 => transmute::<usize, extern "C" fn(u64, u64, u64) -> u64>(a)(w[0], w[1], w[2]),
        4 => transmute::<usize, extern "C" fn(u64, u64, u64, u64) -> u64>(a)(w[0], w[1], w[2], w[3]),
        5 => transmute::<usize, extern "C" fn(u64, u64, u64, u64, u64) -> u64>(a)(
            w[0], w[1], w[2], w[3], w[4],
        ),
        6 => transmute::<usize, extern "C" fn(u64, u64, u64, u64, u64, u64) -> u64>(a)(
            w[0], w[1], w[2], w[3], w[4], w[5],
        ),
        7 => transmute::<usize, extern "C" fn(u64, u64, u64, u64, u64, u64, u64) -> u64>(a)(
            w[0], w[1], w[2], w[3], w[4], w[5], w[6],
        ),
        8 => transmute::<usize, extern "C" fn(u64, u64, u64, u64, u64, u64, u64, u64) -> u64>(a)(
            w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7],
        ),
        9 => transmute::<usize, extern "C" fn(u64, u64, u64, u64, u64, u64, u64, u64, u64) -> u64>(
            a,
        )(w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7], w[8]),
        _ => transmute::<
            usize,
            extern "C" fn(u64, u64, u64, u64, u64, u64, u64, u64, u64, u64) -> u64,
        >(a)(
            w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7], w[8], w[9],
        ),
    }
}
