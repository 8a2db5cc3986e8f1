//! Integration tests for whole-unit runs: determinism, naming and recovery
//! from declarations that cannot be desugared.

use unveil_config::TransformOptions;
use unveil_engine::{DesugarError, TransformOutput, Transformer};
use unveil_tree::{
    CppType, Decl, DeclId, DeclKind, Expr, ExprKind, FunctionDecl, LambdaExpr, LambdaId,
    ResolvedUnit, Stmt, ValueCategory,
};

fn transformer() -> Transformer {
    Transformer::with_options(TransformOptions::default())
}

fn run(decls: Vec<Decl>) -> TransformOutput {
    transformer()
        .run(&ResolvedUnit::new(decls))
        .expect("Failed to transform unit")
}

fn function(id: u32, name: &str, body: Vec<Stmt>) -> Decl {
    Decl::function(
        DeclId(id),
        name,
        FunctionDecl::new(CppType::Void, vec![], Some(Stmt::compound(body))),
    )
}

fn int_var(id: u32, name: &str, init: Option<Expr>) -> Stmt {
    Stmt::decl(Decl::var(DeclId(id), name, CppType::int(), init))
}

fn closure_var(id: u32, name: &str) -> Stmt {
    let lambda = LambdaExpr::new(LambdaId(0), CppType::Void, Stmt::compound(vec![]));
    Stmt::decl(Decl::var(
        DeclId(id),
        name,
        CppType::Closure(LambdaId(0)),
        Some(Expr::lambda(lambda)),
    ))
}

fn sample_unit() -> ResolvedUnit {
    let main = function(
        2,
        "main",
        vec![int_var(3, "x", Some(Expr::int(1))), closure_var(4, "l")],
    );
    ResolvedUnit::new(vec![Decl::namespace(DeclId(1), "app", vec![main])])
}

/// Test two runs over the same unit produce identical output.
#[test]
fn test_runs_are_deterministic() {
    let unit = sample_unit();
    let first = transformer().run(&unit).expect("Failed to transform unit");
    let second = transformer().run(&unit).expect("Failed to transform unit");

    assert_eq!(first.text, second.text);
    assert_eq!(first.instantiations, second.instantiations);
}

/// Test namespaces are reopened with a closing comment.
#[test]
fn test_namespace_layout() {
    let code = transformer()
        .run(&sample_unit())
        .expect("Failed to transform unit")
        .text;

    assert!(code.contains("namespace app\n{\n"));
    assert!(code.contains("} // namespace app"));
    assert!(code.contains("  void main()"));
    assert!(code.contains("__closure_0 l = __closure_0{};"));
}

/// Test a unit loaded from JSON desugars the same as the one it was saved from.
#[test]
fn test_json_unit_matches_in_memory_unit() {
    let unit = sample_unit();
    let json = unit.to_json().expect("Failed to serialize unit");
    let loaded = ResolvedUnit::from_json(&json).expect("Failed to parse unit");

    let expected = transformer().run(&unit).expect("Failed to transform unit");
    let actual = transformer().run(&loaded).expect("Failed to transform unit");
    assert_eq!(expected.text, actual.text);
}

/// Test a user name already taken before synthesis is skipped by the generator.
#[test]
fn test_user_name_is_skipped() {
    let main = function(
        1,
        "main",
        vec![int_var(2, "__closure_0", Some(Expr::int(0))), closure_var(3, "l")],
    );
    let output = run(vec![main]);

    assert!(output.diagnostics.is_empty());
    assert!(output.text.contains("int __closure_0 = 0;"));
    assert!(output.text.contains("class __closure_1"));
    assert!(output.text.contains("__closure_1 l = __closure_1{};"));
}

/// Test a user name colliding with an already synthesized one ends the run.
#[test]
fn test_naming_conflict_is_fatal() {
    let temporary = Expr::new(
        ExprKind::MaterializeTemporary {
            operand: Box::new(Expr::int(42)),
            extended: true,
        },
        CppType::int(),
    )
    .with_category(ValueCategory::LValue);
    let main = function(
        1,
        "main",
        vec![
            Stmt::decl(Decl::var(
                DeclId(2),
                "r",
                CppType::int().const_ref(),
                Some(temporary),
            )),
            int_var(3, "__temporary_0", None),
        ],
    );
    let result = transformer().run(&ResolvedUnit::new(vec![main]));

    match result {
        Err(DesugarError::NamingConflict { name, .. }) => assert_eq!(name, "__temporary_0"),
        other => panic!("expected a naming conflict, got {:?}", other.map(|o| o.text)),
    }
}

/// Test an unsupported declaration is reported and the rest of the unit still desugars.
#[test]
fn test_unsupported_declaration_is_skipped() {
    let coroutine = Decl::new(
        DeclId(1),
        "generate",
        DeclKind::Unsupported {
            kind: "coroutine".to_string(),
        },
    );
    let main = function(2, "main", vec![int_var(3, "x", Some(Expr::int(1)))]);
    let output = run(vec![coroutine, main]);

    assert_eq!(output.diagnostics.len(), 1);
    assert!(output.has_errors());
    assert!(output.diagnostics[0].message.contains("coroutine"));
    assert!(output.text.contains("// unveil: could not desugar `generate`"));
    assert!(output.text.contains("void main()"));
    assert!(output.text.contains("int x = 1;"));
}
