//! Resolved statements.

use crate::decl::Decl;
use crate::expr::Expr;
use crate::types::CppType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Compound(Vec<Stmt>),
    Decl(Vec<Decl>),
    Expr(Expr),
    Return {
        #[serde(default)]
        value: Option<Expr>,
        /// The returned variable is constructed in the return slot.
        #[serde(default)]
        nrvo: bool,
    },
    If(Box<IfStmt>),
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        #[serde(default)]
        init: Option<Box<Stmt>>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        inc: Option<Expr>,
        body: Box<Stmt>,
    },
    RangeFor(Box<RangeForStmt>),
    Break,
    Continue,
    Null,
    Unsupported {
        kind: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfKind {
    #[default]
    Normal,
    Constexpr,
    /// `if consteval` / `if !consteval`
    Consteval {
        #[serde(default)]
        negated: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    #[serde(default)]
    pub kind: IfKind,
    #[serde(default)]
    pub init: Option<Stmt>,
    /// Absent for `if consteval`.
    #[serde(default)]
    pub cond: Option<Expr>,
    pub then: Stmt,
    #[serde(default, rename = "else")]
    pub else_: Option<Stmt>,
}

/// `for (init; var : range) body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeForStmt {
    /// C++20 init-statement.
    #[serde(default)]
    pub init: Option<Stmt>,
    /// The loop variable; its initializer is synthesized from the iterator.
    pub var: Decl,
    pub range: Expr,
    /// Deduced type of the hidden range reference, e.g. `std::vector<int> &`.
    pub range_ty: CppType,
    pub iteration: RangeIteration,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeIteration {
    /// Built-in array of known bound.
    Array { size: u64 },
    /// `range.begin()` / `range.end()`
    Member { iterator: CppType },
    /// `begin(range)` / `end(range)` found by argument-dependent lookup.
    Free { iterator: CppType },
}

impl Stmt {
    pub fn compound(stmts: Vec<Stmt>) -> Self {
        Stmt::Compound(stmts)
    }

    pub fn decl(decl: Decl) -> Self {
        Stmt::Decl(vec![decl])
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return { value, nrvo: false }
    }

    pub fn if_(cond: Expr, then: Stmt, else_: Option<Stmt>) -> Self {
        Stmt::If(Box::new(IfStmt {
            kind: IfKind::Normal,
            init: None,
            cond: Some(cond),
            then,
            else_,
        }))
    }

    pub fn if_consteval(negated: bool, then: Stmt, else_: Option<Stmt>) -> Self {
        Stmt::If(Box::new(IfStmt {
            kind: IfKind::Consteval { negated },
            init: None,
            cond: None,
            then,
            else_,
        }))
    }
}
