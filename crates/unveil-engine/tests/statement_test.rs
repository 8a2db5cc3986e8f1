//! Integration tests for statement-level desugaring: return slots,
//! conversions, bindings, loops and compile-time evaluation.

use unveil_config::{LanguageStandard, TransformOptions};
use unveil_engine::{TransformOutput, Transformer};
use unveil_tree::{
    BinaryOp, Binding, BindingAccess, CastKind, ConstructorKind, CppType, Decl, DeclId, DeclKind,
    DecompositionDecl, Expr, ExprKind, FunctionDecl, FunctionSpecifiers, IfKind, IfStmt,
    MemberState, ParamDecl, RangeForStmt, RangeIteration, RecordDecl, RecordTag, ResolvedUnit,
    SpecialMemberSet, StaticAssertDecl, Stmt, TupleGetter, UnaryOp, ValueCategory, VarDecl,
};

fn run_with(options: TransformOptions, decls: Vec<Decl>) -> TransformOutput {
    Transformer::with_options(options)
        .run(&ResolvedUnit::new(decls))
        .expect("Failed to transform unit")
}

fn run(decls: Vec<Decl>) -> TransformOutput {
    run_with(TransformOptions::default(), decls)
}

fn standard(standard: LanguageStandard) -> TransformOptions {
    TransformOptions {
        standard,
        ..TransformOptions::default()
    }
}

fn function(id: u32, name: &str, ret: CppType, params: Vec<ParamDecl>, body: Vec<Stmt>) -> Decl {
    Decl::function(
        DeclId(id),
        name,
        FunctionDecl::new(ret, params, Some(Stmt::compound(body))),
    )
}

fn var(id: u32, name: &str, ty: CppType, init: Option<Expr>) -> Stmt {
    Stmt::decl(Decl::var(DeclId(id), name, ty, init))
}

fn load(name: &str, id: u32, ty: CppType) -> Expr {
    Expr::load(Expr::name(name, DeclId(id), ty))
}

fn position(text: &str, needle: &str) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, text))
}

fn widget_return(nrvo: bool) -> Decl {
    let widget = CppType::named("Widget");
    let mut w = VarDecl::new(widget.clone(), None);
    w.is_nrvo = nrvo;
    let copy = Expr::construct(
        ConstructorKind::Copy,
        vec![Expr::name("w", DeclId(2), widget.clone())],
        widget.clone(),
    );
    function(
        1,
        "make",
        widget,
        vec![],
        vec![
            Stmt::decl(Decl::new(DeclId(2), "w", DeclKind::Var(w))),
            Stmt::Return {
                value: Some(copy),
                nrvo,
            },
        ],
    )
}

/// Test a variable constructed in the return slot is marked and returned directly.
#[test]
fn test_nrvo_variable() {
    let code = run(vec![widget_return(true)]).text;

    assert!(code.contains("Widget make()"));
    assert!(code.contains("Widget w /* NRVO variable */;"));
    assert!(code.contains("return w;"));
    assert!(!code.contains("Widget(w)"));
}

/// Test the copy into the return slot is visible without NRVO.
#[test]
fn test_return_copy_without_nrvo() {
    let code = run(vec![widget_return(false)]).text;

    assert!(code.contains("Widget w;"));
    assert!(!code.contains("NRVO"));
    assert!(code.contains("return Widget(w);"));
}

fn widening(id: u32) -> Decl {
    let long = CppType::Long { signed: true };
    let cast = Expr::implicit_cast(CastKind::IntegralCast, load("x", id + 1, CppType::int()), long.clone());
    function(
        id,
        "widen",
        CppType::Void,
        vec![ParamDecl::new(DeclId(id + 1), "x", CppType::int())],
        vec![var(id + 2, "l", long, Some(cast))],
    )
}

/// Test implicit conversions are written as casts.
#[test]
fn test_implicit_casts() {
    let code = run(vec![widening(1)]).text;
    assert!(code.contains("void widen(int x)"));
    assert!(code.contains("long l = static_cast<long>(x);"));

    let options = TransformOptions {
        show_all_implicit_casts: true,
        ..TransformOptions::default()
    };
    let code = run_with(options, vec![widening(1)]).text;
    assert!(code.contains("long l = static_cast<long>(static_cast<int>(x));"));
}

/// Test a user-defined conversion calls the conversion function.
#[test]
fn test_user_defined_conversion() {
    let flag = CppType::named("Flag");
    let conversion = Expr::new(
        ExprKind::ImplicitCast {
            kind: CastKind::UserDefinedConversion,
            operand: Box::new(Expr::name("f", DeclId(2), flag.clone())),
            conversion: Some("operator bool".to_string()),
        },
        CppType::Bool,
    );
    let test = function(
        1,
        "test",
        CppType::Void,
        vec![ParamDecl::new(DeclId(2), "f", flag)],
        vec![var(3, "b", CppType::Bool, Some(conversion))],
    );
    let code = run(vec![test]).text;
    assert!(code.contains("bool b = f.operator bool();"));
}

/// Test a lifetime-extended temporary gets a name ahead of its statement.
#[test]
fn test_extended_temporary() {
    let temporary = Expr::new(
        ExprKind::MaterializeTemporary {
            operand: Box::new(Expr::int(42)),
            extended: true,
        },
        CppType::int(),
    )
    .with_category(ValueCategory::LValue);
    let f = function(
        1,
        "f",
        CppType::Void,
        vec![],
        vec![var(2, "r", CppType::int().const_ref(), Some(temporary))],
    );
    let code = run(vec![f]).text;

    let hoisted = position(&code, "int __temporary_0 = 42;");
    let bound = position(&code, "const int & r = __temporary_0;");
    assert!(hoisted < bound);
}

/// Test static_assert results are written as comments.
#[test]
fn test_static_assert() {
    let passed = Decl::new(
        DeclId(1),
        "",
        DeclKind::StaticAssert(StaticAssertDecl {
            condition: "sizeof(int) == 4".to_string(),
            message: None,
            passed: true,
        }),
    );
    let failed = Decl::new(
        DeclId(2),
        "",
        DeclKind::StaticAssert(StaticAssertDecl {
            condition: "N > 0".to_string(),
            message: Some("N must be positive".to_string()),
            passed: false,
        }),
    );
    let code = run(vec![passed, failed]).text;

    assert!(code.contains("/* PASSED: static_assert(sizeof(int) == 4); */"));
    assert!(code.contains("/* FAILED: static_assert(N > 0, \"N must be positive\"); */"));
}

fn consteval_branches(id: u32, name: &str, is_consteval: bool) -> Decl {
    let body = Stmt::if_consteval(
        false,
        Stmt::compound(vec![Stmt::ret(Some(Expr::int(1)))]),
        Some(Stmt::compound(vec![Stmt::ret(Some(Expr::int(2)))])),
    );
    Decl::function(
        DeclId(id),
        name,
        FunctionDecl::new(CppType::int(), vec![], Some(Stmt::compound(vec![body]))).with_specifiers(
            FunctionSpecifiers {
                is_consteval,
                ..FunctionSpecifiers::default()
            },
        ),
    )
}

/// Test `if consteval` keeps only the branch its evaluation context selects.
#[test]
fn test_if_consteval_selection() {
    let decls = vec![
        consteval_branches(1, "square", true),
        consteval_branches(2, "runtime", false),
    ];
    let code = run_with(standard(LanguageStandard::Cxx20), decls).text;

    assert!(!code.contains("if consteval"));
    assert_eq!(code.matches("return 1;").count(), 1);
    assert_eq!(code.matches("return 2;").count(), 1);

    let square = position(&code, "consteval int square()");
    let compile_time = position(&code, "// if consteval: compile-time branch selected");
    let one = position(&code, "return 1;");
    let runtime = position(&code, "int runtime()");
    let run_time = position(&code, "// if consteval: run-time branch selected");
    let two = position(&code, "return 2;");
    assert!(square < compile_time && compile_time < one && one < runtime);
    assert!(runtime < run_time && run_time < two);
}

/// Test `if consteval` is printed as written before C++20.
#[test]
fn test_if_consteval_before_cxx20() {
    let code = run(vec![consteval_branches(2, "runtime", false)]).text;

    assert!(code.contains("if consteval"));
    assert!(code.contains("else"));
    assert!(code.contains("return 1;"));
    assert!(code.contains("return 2;"));
}

/// Test loops and if-with-initializer get explicit braces and scopes.
#[test]
fn test_loops_and_if_init() {
    let int = CppType::int;
    let counted = Stmt::For {
        init: Some(Box::new(var(2, "i", int(), Some(Expr::int(0))))),
        cond: Some(Expr::binary(BinaryOp::Lt, load("i", 2, int()), Expr::int(3), CppType::Bool)),
        inc: Some(Expr::unary(UnaryOp::PreInc, Expr::name("i", DeclId(2), int()), int())),
        body: Box::new(Stmt::Continue),
    };
    let guarded = Stmt::If(Box::new(IfStmt {
        kind: IfKind::Normal,
        init: Some(var(3, "n", int(), Some(Expr::int(1)))),
        cond: Some(Expr::binary(BinaryOp::Gt, load("n", 3, int()), Expr::int(0), CppType::Bool)),
        then: Stmt::Expr(Expr::unary(UnaryOp::PostInc, Expr::name("n", DeclId(3), int()), int())),
        else_: None,
    }));
    let repeated = Stmt::DoWhile {
        body: Box::new(Stmt::compound(vec![Stmt::Break])),
        cond: Expr::bool_(false),
    };
    let f = function(1, "f", CppType::Void, vec![], vec![counted, guarded, repeated]);
    let code = run(vec![f]).text;

    assert!(code.contains("for(int i = 0; i < 3; ++i)\n  {\n    continue;\n  }"));
    assert!(code.contains("int n = 1;\n    if(n > 0)\n    {\n      n++;\n    }"));
    assert!(code.contains("do\n  {\n    break;\n  } while(false);"));
}

/// Test a range-for over an array becomes an index loop.
#[test]
fn test_range_for_over_array() {
    let array = CppType::int().array(3);
    let range_for = RangeForStmt {
        init: None,
        var: Decl::var(DeclId(3), "v", CppType::int(), None),
        range: Expr::name("arr", DeclId(2), array.clone()),
        range_ty: array.clone().ref_(),
        iteration: RangeIteration::Array { size: 3 },
        body: Stmt::compound(vec![]),
    };
    let f = function(
        1,
        "f",
        CppType::Void,
        vec![],
        vec![var(2, "arr", array, None), Stmt::RangeFor(Box::new(range_for))],
    );
    let code = run(vec![f]).text;

    assert!(code.contains("int arr[3];"));
    assert!(code.contains("int (&__range_0)[3] = arr;"));
    assert!(code.contains("for(unsigned long __index_0 = 0; __index_0 < 3; ++__index_0)"));
    assert!(code.contains("int v = __range_0[__index_0];"));
}

fn vector_loop() -> Decl {
    let vector = CppType::named("std::vector<int>");
    let range_for = RangeForStmt {
        init: None,
        var: Decl::var(DeclId(3), "x", CppType::int().ref_(), None),
        range: Expr::name("vec", DeclId(2), vector.clone()),
        range_ty: vector.clone().ref_(),
        iteration: RangeIteration::Member {
            iterator: CppType::named("std::vector<int>::iterator"),
        },
        body: Stmt::Expr(Expr::unary(
            UnaryOp::PostInc,
            Expr::name("x", DeclId(3), CppType::int()),
            CppType::int(),
        )),
    };
    function(
        1,
        "f",
        CppType::Void,
        vec![],
        vec![var(2, "vec", vector, None), Stmt::RangeFor(Box::new(range_for))],
    )
}

/// Test a range-for over a container uses separate begin and end variables from C++17.
#[test]
fn test_range_for_over_container() {
    let code = run(vec![vector_loop()]).text;

    assert!(code.contains("std::vector<int> & __range_0 = vec;"));
    assert!(code.contains("std::vector<int>::iterator __begin_0 = __range_0.begin();"));
    assert!(code.contains("std::vector<int>::iterator __end_0 = __range_0.end();"));
    assert!(code.contains("for(; __begin_0 != __end_0; ++__begin_0)"));
    assert!(code.contains("int & x = *__begin_0;"));
    assert!(code.contains("x++;"));

    let code = run_with(standard(LanguageStandard::Cxx14), vec![vector_loop()]).text;
    assert!(code.contains(
        "for(std::vector<int>::iterator __begin_0 = __range_0.begin(), __end_0 = __range_0.end(); __begin_0 != __end_0; ++__begin_0)"
    ));
}

fn binding(id: u32, name: &str, ty: CppType, access: BindingAccess) -> Binding {
    Binding {
        id: DeclId(id),
        name: name.to_string(),
        ty,
        access,
    }
}

fn pair_bindings(getter: Option<TupleGetter>) -> Decl {
    let pair = CppType::named("std::pair<int, int>");
    let decomposition = DecompositionDecl {
        ty: pair.clone(),
        init: Expr::name("pr", DeclId(2), pair.clone()),
        bindings: vec![
            binding(
                11,
                "k",
                CppType::int(),
                BindingAccess::Tuple {
                    index: 0,
                    getter: getter.clone(),
                },
            ),
            binding(12, "v", CppType::int(), BindingAccess::Tuple { index: 1, getter }),
        ],
    };
    function(
        1,
        "split",
        CppType::Void,
        vec![ParamDecl::new(DeclId(2), "pr", pair)],
        vec![Stmt::decl(Decl::new(
            DeclId(10),
            "",
            DeclKind::Decomposition(decomposition),
        ))],
    )
}

/// Test tuple-like bindings go through the resolved `get`.
#[test]
fn test_tuple_bindings() {
    let code = run(vec![pair_bindings(Some(TupleGetter::Free("std::get".to_string())))]).text;

    assert!(code.contains("std::pair<int, int> __pr_0 = pr;"));
    assert!(code.contains("int && k = std::get<0>(static_cast<std::pair<int, int> &&>(__pr_0));"));
    assert!(code.contains("int && v = std::get<1>(static_cast<std::pair<int, int> &&>(__pr_0));"));
}

/// Test a tuple binding without a resolved accessor is reported.
#[test]
fn test_tuple_binding_without_accessor() {
    let output = run(vec![pair_bindings(None)]);

    assert_eq!(output.diagnostics.len(), 1);
    assert!(output.diagnostics[0].message.contains("tuple accessor"));
    assert!(output.text.contains("// unveil: could not desugar `split`"));
}

/// Test structured bindings are printed as written before C++17.
#[test]
fn test_bindings_before_cxx17() {
    let code = run_with(
        standard(LanguageStandard::Cxx14),
        vec![pair_bindings(Some(TupleGetter::Member))],
    )
    .text;
    assert!(code.contains("auto [k, v] = pr;"));
    assert!(!code.contains("__pr_0"));
}

/// Test an array binding copies the array element by element.
#[test]
fn test_array_bindings() {
    let array = CppType::int().array(2);
    let decomposition = DecompositionDecl {
        ty: array.clone(),
        init: Expr::name("arr", DeclId(2), array.clone()),
        bindings: vec![
            binding(11, "x", CppType::int(), BindingAccess::Element(0)),
            binding(12, "y", CppType::int(), BindingAccess::Element(1)),
        ],
    };
    let f = function(
        1,
        "f",
        CppType::Void,
        vec![],
        vec![
            var(2, "arr", array, None),
            Stmt::decl(Decl::new(DeclId(10), "", DeclKind::Decomposition(decomposition))),
        ],
    );
    let code = run(vec![f]).text;

    assert!(code.contains("int __arr_0[2] = {arr[0], arr[1]};"));
    assert!(code.contains("int & x = __arr_0[0];"));
    assert!(code.contains("int & y = __arr_0[1];"));
}

/// Test lifetime markers close each block in reverse order of construction.
#[test]
fn test_lifetime_markers() {
    let widget = Decl::record(
        DeclId(1),
        "Widget",
        RecordDecl::new(RecordTag::Struct, vec![])
            .with_special_members(SpecialMemberSet::all(MemberState::UserProvided)),
    );
    let f = function(
        2,
        "f",
        CppType::Void,
        vec![],
        vec![
            var(3, "a", CppType::named("Widget"), None),
            var(4, "b", CppType::named("Widget"), None),
            var(5, "c", CppType::int(), Some(Expr::int(0))),
            var(6, "r", CppType::named("Widget").ref_(), Some(Expr::name("a", DeclId(3), CppType::named("Widget")))),
        ],
    );
    let options = TransformOptions {
        show_lifetime: true,
        ..TransformOptions::default()
    };
    let code = run_with(options, vec![widget.clone(), f.clone()]).text;

    let c = position(&code, "/* c: trivially destroyed */");
    let b = position(&code, "/* b.~Widget(); */");
    let a = position(&code, "/* a.~Widget(); */");
    assert!(c < b && b < a);
    assert!(!code.contains("/* r"));

    let code = run(vec![widget, f]).text;
    assert!(!code.contains("~Widget();"));
}

fn static_var(id: u32, name: &str, ty: CppType, init: Option<Expr>) -> Stmt {
    let mut var = VarDecl::new(ty, init);
    var.is_static = true;
    Stmt::decl(Decl::new(DeclId(id), name, DeclKind::Var(var)))
}

/// Test a local static with a non-trivial destructor gets guarded one-time initialization.
#[test]
fn test_guarded_local_static() {
    let singleton_ty = CppType::named("Singleton");
    let singleton = Decl::record(
        DeclId(1),
        "Singleton",
        RecordDecl::new(RecordTag::Struct, vec![])
            .with_special_members(SpecialMemberSet::all(MemberState::UserProvided)),
    );
    let counter = Decl::record(
        DeclId(2),
        "Counter",
        RecordDecl::new(RecordTag::Struct, vec![])
            .with_special_members(SpecialMemberSet::all(MemberState::Trivial)),
    );
    let init = Expr::construct(ConstructorKind::Other, vec![Expr::int(5)], singleton_ty.clone());
    let instance = function(
        10,
        "instance",
        singleton_ty.clone().ref_(),
        vec![],
        vec![
            static_var(11, "singleton", singleton_ty.clone(), Some(init)),
            static_var(12, "calls", CppType::int(), Some(Expr::int(0))),
            static_var(13, "counter", CppType::named("Counter"), None),
            Stmt::ret(Some(Expr::name("singleton", DeclId(11), singleton_ty))),
        ],
    );
    let output = run(vec![singleton, counter, instance]);
    let code = &output.text;

    assert!(output.diagnostics.is_empty());
    assert!(!code.contains("static Singleton singleton"));
    assert!(code.contains("alignas(Singleton) static char __singleton_0[sizeof(Singleton)];"));
    assert!(code.contains("static uint64_t __singleton_guard_0;"));
    assert!(code.contains("if((__singleton_guard_0 & 0xff) == 0)"));
    assert!(code.contains("if(__cxa_guard_acquire(&__singleton_guard_0))"));
    assert!(code.contains("new (&__singleton_0) Singleton(5);"));
    assert!(code.contains("__cxa_guard_abort(&__singleton_guard_0);\n"));
    assert!(code.contains("/* __cxa_atexit(Singleton::~Singleton, &__singleton_0, &__dso_handle); */"));
    assert!(code.contains("return (*reinterpret_cast<Singleton *>(__singleton_0));"));

    // Trivially destructible and scalar statics are left alone
    assert!(code.contains("static int calls = 0;"));
    assert!(code.contains("static Counter counter;"));

    let acquire = position(code, "__cxa_guard_acquire");
    let placement = position(code, "new (&__singleton_0)");
    let release = position(code, "__cxa_guard_release(&__singleton_guard_0);");
    assert!(acquire < placement);
    assert!(placement < release);
}
