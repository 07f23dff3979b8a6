//! Declared-method model: semantic types, method descriptors, and the
//! shared ordinal assignment that thunk generation and binding-table
//! construction both consume.

use std::fmt;

use crate::encode;

/// Semantic type of a parameter or return value, as declared by the
/// managed type model. This union is closed: every variant has a defined
/// managed descriptor token and a defined native token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaType {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// Array of any element type; arrays nest arbitrarily.
    Array(Box<JavaType>),
    /// String reference.
    String,
    /// Type (class) reference.
    Class,
    /// Any other object reference, carrying its fully qualified name
    /// (dot- or slash-separated).
    Object(std::string::String),
}

impl JavaType {
    /// True for the non-reference kinds, `Void` included.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            JavaType::Void
                | JavaType::Boolean
                | JavaType::Byte
                | JavaType::Char
                | JavaType::Short
                | JavaType::Int
                | JavaType::Long
                | JavaType::Float
                | JavaType::Double
        )
    }

    /// Convenience constructor for arrays.
    pub fn array_of(element: JavaType) -> JavaType {
        JavaType::Array(Box::new(element))
    }
}

/// An immutable record of one declared native method.
///
/// Produced once per declaring type by a [`DescriptorSource`]; its
/// position within the declared-method list is significant and fixed for
/// the type's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: String,
    params: Vec<JavaType>,
    ret: JavaType,
    is_static: bool,
}

impl MethodDescriptor {
    /// An instance method, eligible for native binding.
    pub fn instance(name: impl Into<String>, params: Vec<JavaType>, ret: JavaType) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            is_static: false,
        }
    }

    /// A static method. Not eligible for thunk binding; kept so sources
    /// can report them and the mangler can reject them precisely.
    pub fn static_method(name: impl Into<String>, params: Vec<JavaType>, ret: JavaType) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            is_static: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[JavaType] {
        &self.params
    }

    pub fn return_type(&self) -> &JavaType {
        &self.ret
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, encode::method_descriptor(self))
    }
}

/// Source of the declared native methods of one type.
///
/// Decouples the binding core from any particular introspection
/// mechanism: reflection, a compile-time macro, or a hand-written list
/// all look the same from here.
pub trait DescriptorSource {
    /// Declared native methods, in declaration order. The order is part
    /// of the type's binding contract.
    fn declared_methods(&self) -> Vec<MethodDescriptor>;

    /// Whether the declaring type exposes the instance field holding the
    /// function-pointer table (`long[] functions`). Thunks read their
    /// implementation addresses through that field.
    fn has_function_table_field(&self) -> bool {
        true
    }
}

impl DescriptorSource for Vec<MethodDescriptor> {
    fn declared_methods(&self) -> Vec<MethodDescriptor> {
        self.clone()
    }
}

impl DescriptorSource for [MethodDescriptor] {
    fn declared_methods(&self) -> Vec<MethodDescriptor> {
        self.to_vec()
    }
}

/// A method descriptor plus the ordinal of its function-pointer slot.
///
/// Ordinals are assigned exactly once, by [`assign_ordinals`]; both the
/// thunk generator and the binding-table builder consume the same
/// `ThunkSpec` list, so the generated lookup index and the resolved slot
/// index can never drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThunkSpec {
    method: MethodDescriptor,
    ordinal: usize,
}

impl ThunkSpec {
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// The single shared ordinal-assignment step: input order is slot order.
pub fn assign_ordinals(methods: Vec<MethodDescriptor>) -> Vec<ThunkSpec> {
    methods
        .into_iter()
        .enumerate()
        .map(|(ordinal, method)| ThunkSpec { method, ordinal })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_input_order() {
        let specs = assign_ordinals(vec![
            MethodDescriptor::instance("first", vec![], JavaType::Void),
            MethodDescriptor::instance("second", vec![JavaType::Int], JavaType::Int),
        ]);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].ordinal(), 0);
        assert_eq!(specs[0].method().name(), "first");
        assert_eq!(specs[1].ordinal(), 1);
        assert_eq!(specs[1].method().name(), "second");
    }

    #[test]
    fn display_shows_name_and_descriptor() {
        let method = MethodDescriptor::instance("square", vec![JavaType::Int], JavaType::Int);
        assert_eq!(method.to_string(), "square(I)I");
    }

    #[test]
    fn slice_source_yields_declaration_order() {
        let methods = vec![
            MethodDescriptor::instance("a", vec![], JavaType::Void),
            MethodDescriptor::instance("b", vec![], JavaType::Void),
        ];
        let source: &[MethodDescriptor] = &methods;
        let declared = source.declared_methods();
        assert_eq!(declared, methods);
        assert!(source.has_function_table_field());
    }
}
