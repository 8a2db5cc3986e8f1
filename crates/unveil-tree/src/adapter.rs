//! Read-only access to a resolved unit.
//!
//! The engine never walks the raw unit to find classes or templates; it asks
//! a `ResolvedTree`. `UnitAdapter` implements that over a `ResolvedUnit` by
//! indexing records, templates and explicit specializations once, in source
//! order.

use crate::decl::{Decl, DeclKind, RecordDecl, SpecialMemberSet, SpecializationDecl, TemplateDecl};
use crate::types::{CppType, TemplateArg};
use crate::unit::ResolvedUnit;
use indexmap::IndexMap;

/// A class definition together with where it lives.
#[derive(Debug, Clone)]
pub struct RecordInfo<'u> {
    pub decl: &'u Decl,
    pub record: &'u RecordDecl,
    /// Fully qualified name, e.g. `geo::Point`.
    pub qualified: String,
    pub namespace: Vec<String>,
}

/// A primary template together with where it lives.
#[derive(Debug, Clone)]
pub struct TemplateInfo<'u> {
    pub decl: &'u Decl,
    pub template: &'u TemplateDecl,
    pub qualified: String,
    pub namespace: Vec<String>,
    /// Enclosing class for member templates.
    pub owner: Option<String>,
}

/// A user-written explicit specialization.
#[derive(Debug, Clone)]
pub struct SpecializationInfo<'u> {
    pub decl: &'u Decl,
    pub spec: &'u SpecializationDecl,
    pub namespace: Vec<String>,
}

/// Queries the engine needs from a resolved program.
pub trait ResolvedTree<'u> {
    /// Top-level declarations in source order.
    fn top_level(&self) -> &'u [Decl];

    /// Look up a class by qualified name.
    fn record(&self, qualified: &str) -> Option<&RecordInfo<'u>>;

    /// Look up a primary template by qualified name.
    fn template(&self, qualified: &str) -> Option<&TemplateInfo<'u>>;

    /// The front end's instantiation (or the user's explicit specialization)
    /// of `template` for `args`.
    fn instantiation(&self, template: &str, args: &[TemplateArg]) -> Option<&'u Decl>;

    /// Explicit specializations in source order.
    fn explicit_specializations(&self) -> &[SpecializationInfo<'u>];

    fn special_members(&self, qualified: &str) -> Option<&'u SpecialMemberSet> {
        self.record(qualified).map(|info| {
            let record: &'u RecordDecl = info.record;
            &record.special_members
        })
    }

    /// The class definition a type names, seeing through references and const.
    fn record_for_type(&self, ty: &CppType) -> Option<(&'u Decl, &'u RecordDecl)> {
        match ty.decayed() {
            CppType::Named(name) => self.record(name).map(|info| (info.decl, info.record)),
            CppType::Instantiation { template, args } => {
                let decl = self.instantiation(template, args)?;
                match &decl.kind {
                    DeclKind::Record(record) => Some((decl, record)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// `ResolvedTree` over an in-memory unit.
#[derive(Debug)]
pub struct UnitAdapter<'u> {
    unit: &'u ResolvedUnit,
    records: IndexMap<String, RecordInfo<'u>>,
    templates: IndexMap<String, TemplateInfo<'u>>,
    specializations: Vec<SpecializationInfo<'u>>,
}

impl<'u> UnitAdapter<'u> {
    pub fn new(unit: &'u ResolvedUnit) -> Self {
        let mut adapter = Self {
            unit,
            records: IndexMap::new(),
            templates: IndexMap::new(),
            specializations: Vec::new(),
        };
        let mut namespace = Vec::new();
        adapter.index(&unit.decls, &mut namespace, None);
        adapter
    }

    fn index(&mut self, decls: &'u [Decl], namespace: &mut Vec<String>, owner: Option<&str>) {
        for decl in decls {
            let qualified = qualify(namespace, owner, &decl.name);
            match &decl.kind {
                DeclKind::Namespace(ns) => {
                    namespace.push(decl.name.clone());
                    self.index(&ns.members, namespace, None);
                    namespace.pop();
                }
                DeclKind::Record(record) => {
                    // Keep the first definition; forward declarations come earlier.
                    let replace = self
                        .records
                        .get(&qualified)
                        .map_or(true, |existing| !existing.record.is_definition);
                    if replace {
                        self.records.insert(
                            qualified.clone(),
                            RecordInfo {
                                decl,
                                record,
                                qualified: qualified.clone(),
                                namespace: namespace.clone(),
                            },
                        );
                    }
                    self.index(&record.members, namespace, Some(&qualified));
                }
                DeclKind::Template(template) => {
                    self.templates.insert(
                        qualified.clone(),
                        TemplateInfo {
                            decl,
                            template,
                            qualified,
                            namespace: namespace.clone(),
                            owner: owner.map(str::to_string),
                        },
                    );
                }
                DeclKind::ExplicitSpecialization(spec) => {
                    self.specializations.push(SpecializationInfo {
                        decl,
                        spec,
                        namespace: namespace.clone(),
                    });
                }
                _ => {}
            }
        }
    }

    pub fn unit(&self) -> &'u ResolvedUnit {
        self.unit
    }

    /// Records in source order.
    pub fn records(&self) -> impl Iterator<Item = &RecordInfo<'u>> {
        self.records.values()
    }

    /// Primary templates in source order.
    pub fn templates(&self) -> impl Iterator<Item = &TemplateInfo<'u>> {
        self.templates.values()
    }
}

impl<'u> ResolvedTree<'u> for UnitAdapter<'u> {
    fn top_level(&self) -> &'u [Decl] {
        &self.unit.decls
    }

    fn record(&self, qualified: &str) -> Option<&RecordInfo<'u>> {
        self.records.get(qualified.trim_start_matches("::"))
    }

    fn template(&self, qualified: &str) -> Option<&TemplateInfo<'u>> {
        self.templates.get(qualified.trim_start_matches("::"))
    }

    fn instantiation(&self, template: &str, args: &[TemplateArg]) -> Option<&'u Decl> {
        let template = template.trim_start_matches("::");
        if let Some(info) = self.templates.get(template) {
            let decl: &'u TemplateDecl = info.template;
            if let Some(inst) = decl.instantiations.iter().find(|inst| inst.args == args) {
                return Some(&inst.decl);
            }
        }
        self.specializations
            .iter()
            .find(|s| s.spec.template.trim_start_matches("::") == template && s.spec.args == args)
            .map(|s| {
                let spec: &'u SpecializationDecl = s.spec;
                spec.decl.as_ref()
            })
    }

    fn explicit_specializations(&self) -> &[SpecializationInfo<'u>] {
        &self.specializations
    }
}

/// Join namespace path, owning class and name into a qualified name.
/// Anonymous namespaces contribute nothing.
pub fn qualify(namespace: &[String], owner: Option<&str>, name: &str) -> String {
    if name.contains("::") {
        return name.to_string();
    }
    let mut parts: Vec<&str> = match owner {
        Some(owner) => vec![owner],
        None => namespace
            .iter()
            .map(String::as_str)
            .filter(|n| !n.is_empty())
            .collect(),
    };
    parts.push(name);
    parts.join("::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{
        DeclId, Instantiation, MemberState, RecordTag, TemplateKind,
    };

    fn point(id: u32) -> Decl {
        Decl::record(
            DeclId(id),
            "Point",
            RecordDecl::new(
                RecordTag::Struct,
                vec![
                    Decl::field(DeclId(id + 1), "x", CppType::int()),
                    Decl::field(DeclId(id + 2), "y", CppType::int()),
                ],
            )
            .with_special_members(SpecialMemberSet::all(MemberState::Trivial)),
        )
    }

    fn boxed_template() -> Decl {
        let inst = Decl::record(DeclId(21), "Box", RecordDecl::new(RecordTag::Struct, vec![]));
        Decl::new(
            DeclId(20),
            "Box",
            DeclKind::Template(TemplateDecl {
                kind: TemplateKind::Class,
                pattern: "template<typename T>\nstruct Box { T value; };".to_string(),
                instantiations: vec![Instantiation {
                    args: vec![TemplateArg::Type(CppType::int())],
                    decl: inst,
                }],
            }),
        )
    }

    #[test]
    fn test_records_are_indexed_by_qualified_name() {
        let unit = ResolvedUnit::new(vec![Decl::namespace(DeclId(1), "geo", vec![point(2)])]);
        let adapter = UnitAdapter::new(&unit);

        let info = adapter.record("geo::Point").expect("record indexed");
        assert_eq!(info.namespace, vec!["geo".to_string()]);
        assert!(adapter.record("::geo::Point").is_some());
        assert!(adapter.record("Point").is_none());
        assert_eq!(
            adapter.special_members("geo::Point").map(|s| s.copy_ctor.state),
            Some(MemberState::Trivial)
        );
    }

    #[test]
    fn test_instantiation_lookup() {
        let unit = ResolvedUnit::new(vec![boxed_template()]);
        let adapter = UnitAdapter::new(&unit);

        let found = adapter.instantiation("Box", &[TemplateArg::Type(CppType::int())]);
        assert_eq!(found.map(|d| d.id), Some(DeclId(21)));
        assert!(adapter
            .instantiation("Box", &[TemplateArg::Type(CppType::Double)])
            .is_none());

        let ty = CppType::instantiation("Box", vec![TemplateArg::Type(CppType::int())]);
        assert!(adapter.record_for_type(&ty.const_ref()).is_some());
    }

    #[test]
    fn test_explicit_specializations_are_found() {
        let spec = Decl::new(
            DeclId(30),
            "Box",
            DeclKind::ExplicitSpecialization(SpecializationDecl {
                template: "Box".to_string(),
                args: vec![TemplateArg::Type(CppType::Bool)],
                decl: Box::new(Decl::record(DeclId(31), "Box", RecordDecl::new(RecordTag::Struct, vec![]))),
            }),
        );
        let unit = ResolvedUnit::new(vec![boxed_template(), spec]);
        let adapter = UnitAdapter::new(&unit);

        assert_eq!(adapter.explicit_specializations().len(), 1);
        let found = adapter.instantiation("Box", &[TemplateArg::Type(CppType::Bool)]);
        assert_eq!(found.map(|d| d.id), Some(DeclId(31)));
    }

    #[test]
    fn test_member_templates_are_qualified_by_owner() {
        let holder = Decl::record(
            DeclId(1),
            "Holder",
            RecordDecl::new(
                RecordTag::Struct,
                vec![Decl::new(
                    DeclId(2),
                    "get",
                    DeclKind::Template(TemplateDecl {
                        kind: TemplateKind::Function,
                        pattern: "template<int I> int get() const { return I; }".to_string(),
                        instantiations: vec![],
                    }),
                )],
            ),
        );
        let unit = ResolvedUnit::new(vec![holder]);
        let adapter = UnitAdapter::new(&unit);
        let info = adapter.template("Holder::get").expect("member template");
        assert_eq!(info.owner.as_deref(), Some("Holder"));
    }

    #[test]
    fn test_qualify_skips_anonymous_namespaces() {
        let ns = vec!["a".to_string(), String::new(), "b".to_string()];
        assert_eq!(qualify(&ns, None, "f"), "a::b::f");
        assert_eq!(qualify(&ns, Some("a::b::C"), "g"), "a::b::C::g");
        assert_eq!(qualify(&ns, None, "X::f"), "X::f");
    }
}
