//! Resolved expressions.
//!
//! Every expression carries the type and value category the front end
//! computed for it, so the engine never has to re-derive them.

use crate::decl::{DeclId, ParamDecl};
use crate::stmt::Stmt;
use crate::types::{ConstValue, CppType, LambdaId, TemplateArg};
use serde::{Deserialize, Serialize};
use unveil_common::SourceLocation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueCategory {
    LValue,
    XValue,
    #[default]
    PRValue,
}

/// A use of a template specialization: the template's qualified name and
/// the arguments it was instantiated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateUse {
    pub template: String,
    pub args: Vec<TemplateArg>,
}

impl TemplateUse {
    pub fn new(template: impl Into<String>, args: Vec<TemplateArg>) -> Self {
        Self {
            template: template.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: CppType,
    #[serde(default)]
    pub category: ValueCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Literal(ConstValue),
    /// Reference to a variable, function or enumerator.
    NameRef {
        name: String,
        #[serde(default)]
        decl: Option<DeclId>,
        #[serde(default)]
        template: Option<TemplateUse>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    MemberCall {
        object: Box<Expr>,
        #[serde(default)]
        arrow: bool,
        method: String,
        #[serde(default)]
        template: Option<TemplateUse>,
        args: Vec<Expr>,
        /// Present when the call goes through the vtable.
        #[serde(default)]
        dispatch: Option<Dispatch>,
    },
    Member {
        object: Box<Expr>,
        #[serde(default)]
        arrow: bool,
        member: String,
    },
    /// Call to an overloaded operator. For member operators the first
    /// argument is the object.
    OperatorCall {
        op: String,
        #[serde(default)]
        member: bool,
        args: Vec<Expr>,
    },
    /// User-defined literal such as `12_km`.
    UserLiteral {
        suffix: String,
        literal: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Paren(Box<Expr>),
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        #[serde(rename = "else")]
        else_: Box<Expr>,
    },
    ImplicitCast {
        kind: CastKind,
        operand: Box<Expr>,
        /// Conversion function for user-defined conversions, e.g. `operator bool`.
        #[serde(default)]
        conversion: Option<String>,
    },
    ExplicitCast {
        style: CastStyle,
        operand: Box<Expr>,
    },
    MaterializeTemporary {
        operand: Box<Expr>,
        /// Bound to a reference that extends the temporary's lifetime.
        #[serde(default)]
        extended: bool,
    },
    Construct {
        ctor: ConstructorKind,
        args: Vec<Expr>,
        #[serde(default)]
        list_init: bool,
    },
    Lambda(Box<LambdaExpr>),
    InitList(Vec<Expr>),
    /// Backing array of a `std::initializer_list`.
    StdInitializerList(Vec<Expr>),
    This,
    /// Expression the front end evaluated at compile time.
    ConstantExpr {
        value: ConstValue,
        operand: Box<Expr>,
    },
    ArraySubscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Unsupported {
        kind: String,
    },
}

/// Static and (when known) dynamic class of a virtual call's object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub static_class: String,
    #[serde(default)]
    pub dynamic_class: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Spaceship,
    LAnd,
    LOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    Comma,
}

impl BinaryOp {
    pub fn spelling(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Spaceship => "<=>",
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::RemAssign => "%=",
            BinaryOp::Comma => ",",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    LNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn spelling(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "~",
            UnaryOp::LNot => "!",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

/// Implicit conversion kinds, following the front end's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastKind {
    LValueToRValue,
    NoOp,
    ArrayToPointerDecay,
    FunctionToPointerDecay,
    IntegralCast,
    IntegralToFloating,
    FloatingToIntegral,
    FloatingCast,
    IntegralToBoolean,
    FloatingToBoolean,
    PointerToBoolean,
    NullToPointer,
    DerivedToBase,
    BaseToDerived,
    UserDefinedConversion,
    ConstructorConversion,
    ToVoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastStyle {
    CStyle,
    Functional,
    Static,
    Const,
    Reinterpret,
    Dynamic,
}

/// Type of constructor call (for special handling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructorKind {
    Default,
    Copy,
    Move,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    ByCopy,
    ByRef,
    This,
    StarThis,
    Init,
    /// A capture form this model has no representation for.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub kind: CaptureKind,
    pub name: String,
    /// The captured variable, for by-copy and by-reference captures.
    #[serde(default)]
    pub var: Option<DeclId>,
    /// Declared type of the captured entity (or of the init-capture).
    pub ty: CppType,
    #[serde(default)]
    pub init: Option<Expr>,
}

/// One call-operator specialization of a generic lambda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaSpecialization {
    pub param_types: Vec<CppType>,
    pub return_type: CppType,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub id: LambdaId,
    #[serde(default)]
    pub location: SourceLocation,
    #[serde(default)]
    pub captures: Vec<Capture>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    pub return_type: CppType,
    pub body: Stmt,
    #[serde(default)]
    pub is_mutable: bool,
    /// Call-operator specializations, one per call site, for generic lambdas.
    #[serde(default)]
    pub generic: Option<Vec<LambdaSpecialization>>,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: CppType) -> Self {
        Self {
            kind,
            ty,
            category: ValueCategory::PRValue,
        }
    }

    pub fn with_category(mut self, category: ValueCategory) -> Self {
        self.category = category;
        self
    }

    pub fn is_lvalue(&self) -> bool {
        self.category == ValueCategory::LValue
    }

    pub fn literal(value: ConstValue, ty: CppType) -> Self {
        Self::new(ExprKind::Literal(value), ty)
    }

    pub fn int(value: i64) -> Self {
        Self::literal(ConstValue::Int(value), CppType::int())
    }

    pub fn bool_(value: bool) -> Self {
        Self::literal(ConstValue::Bool(value), CppType::Bool)
    }

    /// An lvalue naming a declared entity.
    pub fn name(name: impl Into<String>, decl: DeclId, ty: CppType) -> Self {
        Self::new(
            ExprKind::NameRef {
                name: name.into(),
                decl: Some(decl),
                template: None,
            },
            ty,
        )
        .with_category(ValueCategory::LValue)
    }

    /// A reference to a function template specialization.
    pub fn template_name(name: impl Into<String>, used: TemplateUse, ty: CppType) -> Self {
        Self::new(
            ExprKind::NameRef {
                name: name.into(),
                decl: None,
                template: Some(used),
            },
            ty,
        )
        .with_category(ValueCategory::LValue)
    }

    pub fn implicit_cast(kind: CastKind, operand: Expr, ty: CppType) -> Self {
        Self::new(
            ExprKind::ImplicitCast {
                kind,
                operand: Box::new(operand),
                conversion: None,
            },
            ty,
        )
    }

    /// Wrap an lvalue in the lvalue-to-rvalue conversion.
    pub fn load(operand: Expr) -> Self {
        let ty = operand.ty.non_reference().unqualified().clone();
        Self::implicit_cast(CastKind::LValueToRValue, operand, ty)
    }

    pub fn call(callee: Expr, args: Vec<Expr>, ty: CppType) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            ty,
        )
    }

    pub fn member(object: Expr, member: impl Into<String>, ty: CppType) -> Self {
        let category = object.category;
        Self::new(
            ExprKind::Member {
                object: Box::new(object),
                arrow: false,
                member: member.into(),
            },
            ty,
        )
        .with_category(if category == ValueCategory::PRValue {
            ValueCategory::XValue
        } else {
            category
        })
    }

    pub fn member_call(object: Expr, method: impl Into<String>, args: Vec<Expr>, ty: CppType) -> Self {
        Self::new(
            ExprKind::MemberCall {
                object: Box::new(object),
                arrow: false,
                method: method.into(),
                template: None,
                args,
                dispatch: None,
            },
            ty,
        )
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, ty: CppType) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr, ty: CppType) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn construct(ctor: ConstructorKind, args: Vec<Expr>, ty: CppType) -> Self {
        Self::new(
            ExprKind::Construct {
                ctor,
                args,
                list_init: false,
            },
            ty,
        )
    }

    pub fn lambda(lambda: LambdaExpr) -> Self {
        let ty = CppType::Closure(lambda.id);
        Self::new(ExprKind::Lambda(Box::new(lambda)), ty)
    }

    pub fn this(ty: CppType) -> Self {
        Self::new(ExprKind::This, ty)
    }

    /// Strip parentheses and conversions that do not change the value.
    pub fn ignore_implicit(&self) -> &Expr {
        match &self.kind {
            ExprKind::ImplicitCast {
                kind: CastKind::LValueToRValue | CastKind::NoOp,
                operand,
                ..
            }
            | ExprKind::MaterializeTemporary { operand, .. } => operand.ignore_implicit(),
            ExprKind::Paren(inner) => inner.ignore_implicit(),
            _ => self,
        }
    }

    /// Name of the variable this expression refers to, if it is a plain name.
    pub fn as_variable_name(&self) -> Option<&str> {
        match &self.ignore_implicit().kind {
            ExprKind::NameRef {
                name,
                template: None,
                ..
            } => Some(name),
            _ => None,
        }
    }
}

impl LambdaExpr {
    pub fn new(id: LambdaId, return_type: CppType, body: Stmt) -> Self {
        Self {
            id,
            location: SourceLocation::default(),
            captures: Vec::new(),
            params: Vec::new(),
            return_type,
            body,
            is_mutable: false,
            generic: None,
        }
    }

    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.captures.push(capture);
        self
    }

    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn is_generic(&self) -> bool {
        self.generic.is_some()
    }
}

impl Capture {
    pub fn by_copy(name: impl Into<String>, var: DeclId, ty: CppType) -> Self {
        Self {
            kind: CaptureKind::ByCopy,
            name: name.into(),
            var: Some(var),
            ty,
            init: None,
        }
    }

    pub fn by_ref(name: impl Into<String>, var: DeclId, ty: CppType) -> Self {
        Self {
            kind: CaptureKind::ByRef,
            name: name.into(),
            var: Some(var),
            ty,
            init: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_implicit_sees_through_loads() {
        let x = Expr::name("x", DeclId(1), CppType::int());
        let loaded = Expr::load(Expr::new(ExprKind::Paren(Box::new(x.clone())), CppType::int()));
        assert_eq!(loaded.ignore_implicit(), &x);
        assert_eq!(loaded.as_variable_name(), Some("x"));
    }

    #[test]
    fn test_member_of_prvalue_is_xvalue() {
        let temp = Expr::construct(ConstructorKind::Default, vec![], CppType::named("Point"));
        let member = Expr::member(temp, "x", CppType::int());
        assert_eq!(member.category, ValueCategory::XValue);
    }

    #[test]
    fn test_unknown_capture_kind_deserializes() {
        let kind: CaptureKind = serde_json::from_str("\"by_pack_expansion\"").expect("capture kind");
        assert_eq!(kind, CaptureKind::Unknown);
        let kind: CaptureKind = serde_json::from_str("\"star_this\"").expect("capture kind");
        assert_eq!(kind, CaptureKind::StarThis);
    }

    #[test]
    fn test_operator_spellings() {
        assert_eq!(BinaryOp::Spaceship.spelling(), "<=>");
        assert_eq!(UnaryOp::PostInc.spelling(), "++");
        assert!(UnaryOp::PostInc.is_postfix());
        assert!(!UnaryOp::Deref.is_postfix());
    }
}
