//! Integration tests for expression rewriting: overloaded operators,
//! literals, constant values and enumerators.

use unveil_config::TransformOptions;
use unveil_engine::{TransformOutput, Transformer};
use unveil_tree::{
    BinaryOp, ConstValue, CppType, Decl, DeclId, DeclKind, EnumDecl, Enumerator, Expr, ExprKind,
    FunctionDecl, FunctionKind, FunctionSpecifiers, MemberState, ParamDecl, RecordDecl, RecordTag,
    ResolvedUnit, SpecialMemberSet, Stmt, UnaryOp,
};

fn run(decls: Vec<Decl>) -> TransformOutput {
    Transformer::with_options(TransformOptions::default())
        .run(&ResolvedUnit::new(decls))
        .expect("Failed to transform unit")
}

fn function(id: u32, name: &str, params: Vec<ParamDecl>, body: Vec<Stmt>) -> Decl {
    Decl::function(
        DeclId(id),
        name,
        FunctionDecl::new(CppType::Void, params, Some(Stmt::compound(body))),
    )
}

fn var(id: u32, name: &str, ty: CppType, init: Expr) -> Stmt {
    Stmt::decl(Decl::var(DeclId(id), name, ty, Some(init)))
}

/// Test overloaded operators are written as calls to the operator function.
#[test]
fn test_operator_calls() {
    let vec2 = CppType::named("Vec2");
    let a = || Expr::name("a", DeclId(2), CppType::named("Vec2"));
    let b = || Expr::name("b", DeclId(3), CppType::named("Vec2"));
    let member_plus = Expr::new(
        ExprKind::OperatorCall {
            op: "+".to_string(),
            member: true,
            args: vec![a(), b()],
        },
        vec2.clone(),
    );
    let free_eq = Expr::new(
        ExprKind::OperatorCall {
            op: "==".to_string(),
            member: false,
            args: vec![a(), b()],
        },
        CppType::Bool,
    );
    let f = function(
        1,
        "f",
        vec![
            ParamDecl::new(DeclId(2), "a", vec2.clone()),
            ParamDecl::new(DeclId(3), "b", vec2.clone()),
        ],
        vec![
            var(4, "c", vec2, member_plus),
            var(5, "same", CppType::Bool, free_eq),
        ],
    );
    let code = run(vec![f]).text;

    assert!(code.contains("Vec2 c = a.operator+(b);"));
    assert!(code.contains("bool same = operator==(a, b);"));
}

/// Test user-defined literals call their literal operator.
#[test]
fn test_user_defined_literals() {
    let distance = CppType::named("Distance");
    let numeric = Expr::new(
        ExprKind::UserLiteral {
            suffix: "_km".to_string(),
            literal: Box::new(Expr::int(12)),
        },
        distance.clone(),
    );
    let text = Expr::new(
        ExprKind::UserLiteral {
            suffix: "_s".to_string(),
            literal: Box::new(Expr::literal(
                ConstValue::Str("abc".to_string()),
                CppType::Char.const_().ptr(),
            )),
        },
        CppType::named("Name"),
    );
    let f = function(
        1,
        "f",
        vec![],
        vec![var(2, "d", distance, numeric), var(3, "n", CppType::named("Name"), text)],
    );
    let code = run(vec![f]).text;

    assert!(code.contains("Distance d = operator\"\"_km(12);"));
    assert!(code.contains("Name n = operator\"\"_s(\"abc\", 3UL);"));
}

/// Test the array behind a `std::initializer_list` is spelled out.
#[test]
fn test_initializer_list() {
    let list = CppType::named("std::initializer_list<int>");
    let init = Expr::new(
        ExprKind::StdInitializerList(vec![Expr::int(1), Expr::int(2), Expr::int(3)]),
        list.clone(),
    );
    let f = function(1, "f", vec![], vec![var(2, "il", list, init)]);
    let code = run(vec![f]).text;

    assert!(code.contains("std::initializer_list<int> il = std::initializer_list<int>{1, 2, 3};"));
}

/// Test a constant expression shows its value next to what was written.
#[test]
fn test_constant_expression_value() {
    let product = Expr::binary(BinaryOp::Mul, Expr::int(6), Expr::int(7), CppType::int());
    let constant = Expr::new(
        ExprKind::ConstantExpr {
            value: ConstValue::Int(42),
            operand: Box::new(product),
        },
        CppType::int(),
    );
    let f = function(1, "f", vec![], vec![var(2, "n", CppType::int(), constant)]);
    let code = run(vec![f]).text;

    assert!(code.contains("int n = 42 /* 6 * 7 */;"));
}

/// Test enumerators are printed with their values.
#[test]
fn test_enumerator_values() {
    let color = Decl::new(
        DeclId(1),
        "Color",
        DeclKind::Enum(EnumDecl {
            is_scoped: true,
            underlying: None,
            enumerators: vec![
                Enumerator {
                    name: "Red".to_string(),
                    value: 0,
                },
                Enumerator {
                    name: "Green".to_string(),
                    value: 5,
                },
            ],
        }),
    );
    let code = run(vec![color]).text;

    assert!(code.contains("enum class Color\n{\n  Red = 0,\n  Green = 5,\n};"));
}

/// Test an implicitly declared destructor takes over the inherited vtable slot.
#[test]
fn test_destructor_slot_is_overridden() {
    let dtor = Decl::function(
        DeclId(2),
        "~Base",
        FunctionDecl::new(CppType::Void, vec![], Some(Stmt::compound(vec![])))
            .with_kind(FunctionKind::Destructor)
            .with_specifiers(FunctionSpecifiers {
                is_virtual: true,
                ..FunctionSpecifiers::default()
            }),
    );
    let base = Decl::record(
        DeclId(1),
        "Base",
        RecordDecl::new(RecordTag::Struct, vec![dtor])
            .with_special_members(SpecialMemberSet::all(MemberState::UserProvided)),
    );
    let derived = Decl::record(
        DeclId(3),
        "Derived",
        RecordDecl::new(RecordTag::Struct, vec![])
            .with_base(CppType::named("Base"))
            .with_special_members(SpecialMemberSet::all(MemberState::ImplicitlyDefaulted)),
    );
    let output = run(vec![base, derived]);

    assert!(output.diagnostics.is_empty());
    assert!(output.text.contains("/* vtable for Base: [0] Base::~Base */"));
    assert!(output.text.contains("/* vtable for Derived: [0] Derived::~Derived */"));
}

/// Test nested prefix operators do not run together into `--` or `++`.
#[test]
fn test_nested_negation_stays_separate() {
    let x = || Expr::name("x", DeclId(2), CppType::int());
    let minus = |operand: Expr| Expr::unary(UnaryOp::Minus, operand, CppType::int());
    let plus = |operand: Expr| Expr::unary(UnaryOp::Plus, operand, CppType::int());
    let f = function(
        1,
        "f",
        vec![ParamDecl::new(DeclId(2), "x", CppType::int())],
        vec![
            var(3, "y", CppType::int(), minus(minus(x()))),
            var(4, "z", CppType::int(), minus(Expr::int(-5))),
            var(5, "w", CppType::int(), plus(plus(x()))),
            var(6, "v", CppType::int(), Expr::unary(UnaryOp::LNot, minus(x()), CppType::Bool)),
        ],
    );
    let code = run(vec![f]).text;

    assert!(code.contains("int y = -(-x);"));
    assert!(code.contains("int z = -(-5);"));
    assert!(code.contains("int w = +(+x);"));
    assert!(code.contains("int v = !-x;"));
}
