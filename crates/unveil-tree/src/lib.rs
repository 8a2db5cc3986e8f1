//! Resolved C++ program tree.
//!
//! This crate provides:
//! - The data model a C++ front end hands to the desugaring engine
//!   (declarations, statements, expressions, types, constant values)
//! - `ResolvedUnit` loading from the front end's JSON export
//! - The `ResolvedTree` query interface and its `UnitAdapter` implementation
//!
//! Parsing, name lookup, overload resolution, template instantiation and
//! constant evaluation have all happened by the time a unit exists.

mod adapter;
mod decl;
mod error;
mod expr;
mod stmt;
mod types;
mod unit;

pub use adapter::{qualify, RecordInfo, ResolvedTree, SpecializationInfo, TemplateInfo, UnitAdapter};
pub use decl::{
    AccessSpecifier, BaseSpec, Binding, BindingAccess, CtorInit, Decl, DeclId, DeclKind,
    DecompositionDecl, EnumDecl, Enumerator, FieldDecl, FunctionDecl, FunctionKind,
    FunctionSpecifiers, InitStyle, Instantiation, MemberState, NamespaceDecl, ParamDecl,
    RecordDecl, RecordTag, SpecialKind, SpecialMember, SpecialMemberSet, SpecializationDecl,
    StaticAssertDecl, TemplateDecl, TemplateKind, TupleGetter, UsingKind, VarDecl,
};
pub use error::{Result, TreeError};
pub use expr::{
    BinaryOp, Capture, CaptureKind, CastKind, CastStyle, ConstructorKind, Dispatch, Expr,
    ExprKind, LambdaExpr, LambdaSpecialization, TemplateUse, UnaryOp, ValueCategory,
};
pub use stmt::{IfKind, IfStmt, RangeForStmt, RangeIteration, Stmt};
pub use types::{last_component, ConstValue, CppType, LambdaId, TemplateArg};
pub use unit::ResolvedUnit;
