//! Integration tests for template instantiations printed as explicit
//! specializations.

use unveil_config::TransformOptions;
use unveil_engine::{TransformOutput, Transformer};
use unveil_tree::{
    BinaryOp, ConstValue, CppType, Decl, DeclId, DeclKind, Expr, FunctionDecl, Instantiation, ParamDecl,
    RecordDecl, RecordTag, ResolvedUnit, SpecializationDecl, Stmt, TemplateArg, TemplateDecl,
    TemplateKind, TemplateUse,
};

fn run(decls: Vec<Decl>) -> TransformOutput {
    Transformer::with_options(TransformOptions::default())
        .run(&ResolvedUnit::new(decls))
        .expect("Failed to transform unit")
}

fn int_args() -> Vec<TemplateArg> {
    vec![TemplateArg::Type(CppType::int())]
}

fn template(id: u32, name: &str, kind: TemplateKind, pattern: &str, instantiations: Vec<Instantiation>) -> Decl {
    Decl::new(
        DeclId(id),
        name,
        DeclKind::Template(TemplateDecl {
            kind,
            pattern: pattern.to_string(),
            instantiations,
        }),
    )
}

/// `template<typename T> T twice(T x) { return x + x; }` instantiated for `int`.
fn twice_template(id: u32) -> Decl {
    let x = || Expr::load(Expr::name("x", DeclId(id + 2), CppType::int()));
    let body = Stmt::compound(vec![Stmt::ret(Some(Expr::binary(
        BinaryOp::Add,
        x(),
        x(),
        CppType::int(),
    )))]);
    let instance = Decl::function(
        DeclId(id + 1),
        "twice",
        FunctionDecl::new(
            CppType::int(),
            vec![ParamDecl::new(DeclId(id + 2), "x", CppType::int())],
            Some(body),
        ),
    );
    template(
        id,
        "twice",
        TemplateKind::Function,
        "template<typename T>\nT twice(T x) { return x + x; }",
        vec![Instantiation {
            args: int_args(),
            decl: instance,
        }],
    )
}

fn call_twice(template: &str, args: Vec<TemplateArg>, value: Expr) -> Stmt {
    let callee = Expr::template_name("twice", TemplateUse::new(template, args), CppType::Void);
    Stmt::Expr(Expr::call(callee, vec![value], CppType::int()))
}

fn function(id: u32, name: &str, body: Vec<Stmt>) -> Decl {
    Decl::function(
        DeclId(id),
        name,
        FunctionDecl::new(CppType::Void, vec![], Some(Stmt::compound(body))),
    )
}

/// Test each instantiation is printed once, ahead of its first use.
#[test]
fn test_one_instantiation_per_key() {
    let main = function(
        10,
        "main",
        vec![
            call_twice("twice", int_args(), Expr::int(1)),
            call_twice("twice", int_args(), Expr::int(2)),
        ],
    );
    let helper = function(11, "helper", vec![call_twice("twice", int_args(), Expr::int(3))]);
    let output = run(vec![twice_template(1), main, helper]);
    let code = &output.text;

    assert!(output.diagnostics.is_empty());
    assert_eq!(code.matches("int twice<int>(int x)").count(), 1);
    assert!(code.contains("template<typename T>\nT twice(T x) { return x + x; }"));
    assert!(code.contains("template<>\nint twice<int>(int x)\n{\n  return x + x;\n}"));
    assert!(code.contains("twice<int>(1);"));
    assert!(code.contains("twice<int>(3);"));

    let instance = code.find("int twice<int>(int x)").expect("Failed to find instantiation");
    let main_pos = code.find("void main()").expect("Failed to find main");
    assert!(instance < main_pos);
    assert_eq!(output.instantiations, vec!["twice<int>".to_string()]);
}

/// Test an instantiation's own dependencies are printed before it.
#[test]
fn test_dependencies_come_first() {
    let wrapper_int = CppType::instantiation("Wrapper", int_args());
    let box_int = CppType::instantiation("Box", int_args());

    let wrapper = template(
        1,
        "Wrapper",
        TemplateKind::Class,
        "template<typename T>\nstruct Wrapper { T value; };",
        vec![Instantiation {
            args: int_args(),
            decl: Decl::record(
                DeclId(2),
                "Wrapper",
                RecordDecl::new(
                    RecordTag::Struct,
                    vec![Decl::field(DeclId(3), "value", CppType::int())],
                ),
            ),
        }],
    );
    let boxed = template(
        4,
        "Box",
        TemplateKind::Class,
        "template<typename T>\nstruct Box { Wrapper<T> inner; };",
        vec![Instantiation {
            args: int_args(),
            decl: Decl::record(
                DeclId(5),
                "Box",
                RecordDecl::new(
                    RecordTag::Struct,
                    vec![Decl::field(DeclId(6), "inner", wrapper_int)],
                ),
            ),
        }],
    );
    let main = function(
        10,
        "main",
        vec![Stmt::decl(Decl::var(DeclId(11), "b", box_int, None))],
    );
    let output = run(vec![wrapper, boxed, main]);
    let code = &output.text;

    assert!(output.diagnostics.is_empty());
    assert!(code.contains("template<>\nstruct Wrapper<int>\n{\n  int value;\n};"));
    assert!(code.contains("Wrapper<int> inner;"));
    assert!(code.contains("Box<int> b;"));

    let wrapper_pos = code.find("struct Wrapper<int>").expect("Failed to find Wrapper<int>");
    let box_pos = code.find("struct Box<int>").expect("Failed to find Box<int>");
    let main_pos = code.find("void main()").expect("Failed to find main");
    assert!(wrapper_pos < box_pos);
    assert!(box_pos < main_pos);
    assert_eq!(
        output.instantiations,
        vec!["Wrapper<int>".to_string(), "Box<int>".to_string()]
    );
}

/// Test a user-written specialization suppresses the synthesized one.
#[test]
fn test_user_specialization_is_not_duplicated() {
    let bool_args = vec![TemplateArg::Type(CppType::Bool)];
    let user = Decl::new(
        DeclId(5),
        "twice",
        DeclKind::ExplicitSpecialization(SpecializationDecl {
            template: "twice".to_string(),
            args: bool_args.clone(),
            decl: Box::new(Decl::function(
                DeclId(6),
                "twice",
                FunctionDecl::new(
                    CppType::int(),
                    vec![ParamDecl::new(DeclId(7), "x", CppType::Bool)],
                    Some(Stmt::compound(vec![Stmt::ret(Some(Expr::int(2)))])),
                ),
            )),
        }),
    );
    let main = function(10, "main", vec![call_twice("twice", bool_args, Expr::bool_(true))]);
    let output = run(vec![twice_template(1), user, main]);
    let code = &output.text;

    assert_eq!(code.matches("int twice<bool>(bool x)").count(), 1);
    assert!(code.contains("twice<bool>(true);"));
    assert!(!code.contains("twice<int>(int x)"));
}

/// Test an instantiation used outside its template's namespace is placed in that namespace.
#[test]
fn test_instantiation_placed_in_template_namespace() {
    let geo = Decl::namespace(DeclId(100), "geo", vec![twice_template(1)]);
    let app = Decl::namespace(
        DeclId(101),
        "app",
        vec![function(10, "run", vec![call_twice("geo::twice", int_args(), Expr::int(1))])],
    );
    let output = run(vec![geo, app]);
    let code = &output.text;

    assert!(output.diagnostics.is_empty());
    assert!(code.contains(
        "} // namespace app\nnamespace geo\n{\n  template<>\n  int twice<int>(int x)\n"
    ));
    assert!(code.contains("} // namespace geo\nnamespace app\n{\n"));
    assert!(code.contains("twice<int>(1);"));
    assert_eq!(output.instantiations, vec!["geo::twice<int>".to_string()]);
}

/// Test an instantiation that cannot be synthesized is left to the compiler.
#[test]
fn test_failed_instantiation_is_reported() {
    let instance = Decl::function(
        DeclId(2),
        "twice",
        FunctionDecl::new(
            CppType::int(),
            vec![ParamDecl::new(DeclId(3), "x", CppType::int())],
            Some(Stmt::Unsupported {
                kind: "co_return".to_string(),
            }),
        ),
    );
    let twice = template(
        1,
        "twice",
        TemplateKind::Function,
        "template<typename T>\nT twice(T x);",
        vec![Instantiation {
            args: int_args(),
            decl: instance,
        }],
    );
    let main = function(10, "main", vec![call_twice("twice", int_args(), Expr::int(1))]);
    let output = run(vec![twice, main]);
    let code = &output.text;

    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].subject.as_deref(), Some("twice<int>"));
    assert!(code.contains("// unveil: could not instantiate `twice<int>`"));
    assert!(code.contains("void main()"));
    assert!(code.contains("twice<int>(1);"));
    assert!(output.instantiations.is_empty());
}

/// `template<Point P> void show() {}` in `geo`, instantiated for `Point{1, 2}`.
fn show_template(id: u32) -> Decl {
    let instance = Decl::function(
        DeclId(id + 1),
        "show",
        FunctionDecl::new(CppType::Void, vec![], Some(Stmt::compound(vec![]))),
    );
    template(
        id,
        "show",
        TemplateKind::Function,
        "template<Point P>\nvoid show() {}",
        vec![Instantiation {
            args: point_args(),
            decl: instance,
        }],
    )
}

fn point_args() -> Vec<TemplateArg> {
    vec![TemplateArg::Value(ConstValue::Aggregate {
        ty: CppType::named("geo::Point"),
        fields: vec![ConstValue::Int(1), ConstValue::Int(2)],
    })]
}

fn call_show(name: &str) -> Stmt {
    let callee = Expr::template_name(name, TemplateUse::new("geo::show", point_args()), CppType::Void);
    Stmt::Expr(Expr::call(callee, vec![], CppType::Void))
}

fn run_with_parameter_objects(decls: Vec<Decl>) -> TransformOutput {
    let options = TransformOptions {
        use_template_syntax_for_nttp: true,
        ..TransformOptions::default()
    };
    Transformer::with_options(options)
        .run(&ResolvedUnit::new(decls))
        .expect("Failed to transform unit")
}

/// Test a class-type template argument is named by a template parameter object.
#[test]
fn test_parameter_object_in_same_namespace() {
    let geo = Decl::namespace(
        DeclId(100),
        "geo",
        vec![show_template(1), function(10, "run", vec![call_show("show")])],
    );
    let output = run_with_parameter_objects(vec![geo]);
    let code = &output.text;

    assert!(output.diagnostics.is_empty());
    assert!(code.contains("\ninline constexpr geo::Point __nttp_0{1, 2};\n"));
    assert!(code.contains("void show<__nttp_0>()"));
    assert!(code.contains("show<__nttp_0>();"));

    let object = code.find("inline constexpr").expect("Failed to find parameter object");
    let instance = code.find("void show<__nttp_0>()").expect("Failed to find instantiation");
    let use_site = code.find("void run()").expect("Failed to find run");
    assert!(object < instance);
    assert!(instance < use_site);
}

/// Test a parameter object is visible from the template's namespace when used from another one.
#[test]
fn test_parameter_object_across_namespaces() {
    let geo = Decl::namespace(DeclId(100), "geo", vec![show_template(1)]);
    let app = Decl::namespace(
        DeclId(101),
        "app",
        vec![function(10, "run", vec![call_show("geo::show")])],
    );
    let output = run_with_parameter_objects(vec![geo, app]);
    let code = &output.text;

    assert!(output.diagnostics.is_empty());
    // Declared at global scope, outside both namespaces
    assert!(code.contains("} // namespace app\ninline constexpr geo::Point __nttp_0{1, 2};\nnamespace app\n"));
    assert!(!code.contains("  inline constexpr"));
    assert!(code.contains("namespace geo\n{\n  template<>\n  void show<__nttp_0>()"));
    assert!(code.contains("geo::show<__nttp_0>();"));

    let object = code.find("inline constexpr").expect("Failed to find parameter object");
    let instance = code.find("void show<__nttp_0>()").expect("Failed to find instantiation");
    assert!(object < instance);
    assert_eq!(output.instantiations, vec!["geo::show<geo::Point{1, 2}>".to_string()]);
}
