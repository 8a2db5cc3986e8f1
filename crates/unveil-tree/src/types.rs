//! C++ type representation.
//!
//! Types are immutable once the front end has produced them and are cloned
//! freely; value semantics stand in for shared ownership of type nodes.

use serde::{Deserialize, Serialize};

/// Identifies a lambda expression within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LambdaId(pub u32);

/// A resolved C++ type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CppType {
    /// void
    Void,
    /// bool
    Bool,
    /// char
    Char,
    /// short, unsigned short
    Short { signed: bool },
    /// int, unsigned int
    Int { signed: bool },
    /// long, unsigned long
    Long { signed: bool },
    /// long long, unsigned long long
    LongLong { signed: bool },
    /// float
    Float,
    /// double
    Double,
    /// long double
    LongDouble,
    /// std::nullptr_t
    NullPtr,
    /// Pointer type: T*
    Pointer(Box<CppType>),
    /// Reference type: T& (lvalue) or T&& (rvalue)
    Reference {
        referent: Box<CppType>,
        /// Whether this is an rvalue reference (T&&) vs lvalue reference (T&)
        is_rvalue: bool,
    },
    /// Array type: T[N]
    Array {
        element: Box<CppType>,
        size: Option<u64>,
    },
    /// Function type: R(Args...)
    Function {
        return_type: Box<CppType>,
        params: Vec<CppType>,
        #[serde(default)]
        is_variadic: bool,
        #[serde(default)]
        is_noexcept: bool,
    },
    /// const-qualified type
    Const(Box<CppType>),
    /// Named class, union, enum or typedef, spelled as the front end qualified it.
    Named(String),
    /// Class-template specialization: `template<args>`.
    Instantiation {
        template: String,
        args: Vec<TemplateArg>,
    },
    /// Closure type of a lambda expression.
    Closure(LambdaId),
}

/// A template argument as the front end resolved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateArg {
    Type(CppType),
    /// Non-type argument, including class-type values.
    Value(ConstValue),
    Pack(Vec<TemplateArg>),
    /// Template template argument.
    Template(String),
}

/// A value computed by the front end's constant evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Char(char),
    Float(f64),
    NullPtr,
    Str(String),
    /// Qualified enumerator name.
    Enumerator(String),
    /// Class-type value with its field values in declaration order.
    Aggregate { ty: CppType, fields: Vec<ConstValue> },
    Array(Vec<ConstValue>),
}

impl CppType {
    /// Create a signed int type.
    pub fn int() -> Self {
        CppType::Int { signed: true }
    }

    /// Create an unsigned int type.
    pub fn uint() -> Self {
        CppType::Int { signed: false }
    }

    /// `unsigned long`, the type used for synthesized array indices.
    pub fn size_type() -> Self {
        CppType::Long { signed: false }
    }

    pub fn named(name: impl Into<String>) -> Self {
        CppType::Named(name.into())
    }

    pub fn instantiation(template: impl Into<String>, args: Vec<TemplateArg>) -> Self {
        CppType::Instantiation {
            template: template.into(),
            args,
        }
    }

    pub fn array(self, size: u64) -> Self {
        CppType::Array {
            element: Box::new(self),
            size: Some(size),
        }
    }

    pub fn ptr(self) -> Self {
        CppType::Pointer(Box::new(self))
    }

    pub fn const_(self) -> Self {
        match self {
            CppType::Const(_) => self,
            other => CppType::Const(Box::new(other)),
        }
    }

    pub fn ref_(self) -> Self {
        CppType::Reference {
            referent: Box::new(self),
            is_rvalue: false,
        }
    }

    pub fn const_ref(self) -> Self {
        self.const_().ref_()
    }

    pub fn rvalue_ref(self) -> Self {
        CppType::Reference {
            referent: Box::new(self),
            is_rvalue: true,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, CppType::Reference { .. })
    }

    pub fn is_lvalue_reference(&self) -> bool {
        matches!(self, CppType::Reference { is_rvalue: false, .. })
    }

    pub fn is_rvalue_reference(&self) -> bool {
        matches!(self, CppType::Reference { is_rvalue: true, .. })
    }

    pub fn is_const(&self) -> bool {
        matches!(self, CppType::Const(_))
    }

    /// Drop one level of reference, if any.
    pub fn non_reference(&self) -> &CppType {
        match self {
            CppType::Reference { referent, .. } => referent,
            other => other,
        }
    }

    /// Drop top-level const, if any.
    pub fn unqualified(&self) -> &CppType {
        match self {
            CppType::Const(inner) => inner,
            other => other,
        }
    }

    /// The type with references and top-level const removed.
    pub fn decayed(&self) -> &CppType {
        self.non_reference().unqualified()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.decayed(), CppType::Array { .. })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self.decayed(),
            CppType::Bool
                | CppType::Char
                | CppType::Short { .. }
                | CppType::Int { .. }
                | CppType::Long { .. }
                | CppType::LongLong { .. }
                | CppType::Float
                | CppType::Double
                | CppType::LongDouble
                | CppType::NullPtr
                | CppType::Pointer(_)
        )
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(
            self.decayed(),
            CppType::Float | CppType::Double | CppType::LongDouble
        )
    }

    /// True for named class types, template specializations and closures.
    pub fn is_class_like(&self) -> bool {
        matches!(
            self.decayed(),
            CppType::Named(_) | CppType::Instantiation { .. } | CppType::Closure(_)
        )
    }

    /// Whether any closure type appears inside this type.
    pub fn mentions_closure(&self) -> bool {
        match self {
            CppType::Closure(_) => true,
            CppType::Pointer(inner) | CppType::Const(inner) => inner.mentions_closure(),
            CppType::Reference { referent, .. } => referent.mentions_closure(),
            CppType::Array { element, .. } => element.mentions_closure(),
            CppType::Function {
                return_type,
                params,
                ..
            } => return_type.mentions_closure() || params.iter().any(|p| p.mentions_closure()),
            CppType::Instantiation { args, .. } => args.iter().any(|a| match a {
                TemplateArg::Type(t) => t.mentions_closure(),
                _ => false,
            }),
            _ => false,
        }
    }

    /// Last component of a qualified class name, used to spell destructors.
    pub fn simple_name(&self) -> Option<&str> {
        match self.decayed() {
            CppType::Named(name) => Some(last_component(name)),
            CppType::Instantiation { template, .. } => Some(last_component(template)),
            _ => None,
        }
    }
}

/// Strip the namespace qualification from `a::b::C`.
pub fn last_component(name: &str) -> &str {
    // Ignore `::` inside template argument lists.
    let mut depth = 0i32;
    let bytes = name.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b':' if depth == 0 && i + 1 < bytes.len() && bytes[i + 1] == b':' => {
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    &name[start..]
}

impl ConstValue {
    /// True for values of class type, which become template parameter objects.
    pub fn is_class_value(&self) -> bool {
        matches!(self, ConstValue::Aggregate { .. })
    }
}
