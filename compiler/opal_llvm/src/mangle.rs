//! Name mangling.
//!
//! A function's linkage symbol is a deterministic function of the namespace
//! stack, its name, and its parameter types:
//!
//! ```text
//! _Z <ns-frames: (<len><name>)*> <len><name> <param-type-mangles> E
//! ```
//!
//! `extern` declarations keep their plain source name so C symbols resolve.
//! At a call site, candidate names are produced namespace-closed first, then
//! for each enclosing namespace, then for the root namespace; member calls
//! prepend a class frame. The first candidate defined in the module wins.

use opal_ast::{FunctionDecl, Linkage};
use opal_types::{Type, UserTypeTable};

/// One namespace frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    /// Class scopes participate in member-function resolution.
    pub is_class: bool,
}

/// The ordered stack of namespace frames, outermost first.
#[derive(Debug, Clone, Default)]
pub struct NamespaceHierarchy {
    frames: Vec<Namespace>,
}

impl NamespaceHierarchy {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, name: impl Into<String>, is_class: bool) {
        self.frames.push(Namespace {
            name: name.into(),
            is_class,
        });
    }

    pub fn pop(&mut self) -> Option<Namespace> {
        self.frames.pop()
    }

    #[must_use]
    pub fn top(&self) -> Option<&Namespace> {
        self.frames.last()
    }

    #[must_use]
    pub fn frames(&self) -> &[Namespace] {
        &self.frames
    }
}

fn mangle_frames(frames: &[Namespace]) -> String {
    frames
        .iter()
        .map(|ns| format!("{}{}", ns.name.len(), ns.name))
        .collect()
}

fn mangle_name(name: &str) -> String {
    format!("{}{}", name.len(), name)
}

/// The function-name mangler.
///
/// `None` results mean a parameter or argument type mentions an unknown user
/// type; callers turn that into a diagnostic at the offending span.
#[derive(Debug, Default)]
pub struct Mangler;

impl Mangler {
    /// Mangle a declaration's linkage symbol. External linkage keeps the
    /// plain source name.
    #[must_use]
    pub fn mangle_function(
        &self,
        namespaces: &NamespaceHierarchy,
        types: &UserTypeTable,
        decl: &FunctionDecl,
    ) -> Option<String> {
        if decl.linkage == Some(Linkage::External) {
            return Some(decl.name.clone());
        }
        let mut out = format!(
            "_Z{}{}",
            mangle_frames(namespaces.frames()),
            mangle_name(&decl.name)
        );
        for param in decl.fixed_params() {
            out.push_str(&param.ty.ty.mangled_name(types)?);
        }
        out.push('E');
        Some(out)
    }

    /// Candidate symbols for a call, in priority order: the current
    /// namespace closed over, then each enclosing namespace, then the root.
    #[must_use]
    pub fn mangle_call_candidates(
        &self,
        namespaces: &NamespaceHierarchy,
        types: &UserTypeTable,
        callee: &str,
        arg_types: &[&Type],
    ) -> Option<Vec<String>> {
        let mut params = String::new();
        for ty in arg_types {
            params.push_str(&ty.mangled_name(types)?);
        }

        let frames = namespaces.frames();
        let mut candidates = Vec::with_capacity(frames.len() + 1);
        for depth in (0..=frames.len()).rev() {
            candidates.push(format!(
                "_Z{}{}{}E",
                mangle_frames(&frames[..depth]),
                mangle_name(callee),
                params
            ));
        }
        Some(candidates)
    }

    /// Mangle a member-function call: the class name is one more frame on
    /// the namespace stack.
    #[must_use]
    pub fn mangle_member_call(
        &self,
        namespaces: &NamespaceHierarchy,
        types: &UserTypeTable,
        callee: &str,
        class_name: &str,
        arg_types: &[&Type],
    ) -> Option<String> {
        let mut params = String::new();
        for ty in arg_types {
            params.push_str(&ty.mangled_name(types)?);
        }
        Some(format!(
            "_Z{}{}{}{}E",
            mangle_frames(namespaces.frames()),
            mangle_name(class_name),
            mangle_name(callee),
            params
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_ast::{Param, TypeAst};
    use opal_diagnostic::Span;
    use opal_types::BuiltinKind;

    fn decl(name: &str, linkage: Option<Linkage>, param_tys: &[Type]) -> FunctionDecl {
        let params = param_tys
            .iter()
            .enumerate()
            .map(|(i, ty)| Param {
                qualifier: None,
                name: format!("p{i}"),
                ty: TypeAst::new(ty.clone(), Span::default()),
                is_vararg: false,
                span: Span::default(),
            })
            .collect();
        FunctionDecl {
            linkage,
            name: name.into(),
            params,
            return_type: TypeAst::new(Type::builtin(BuiltinKind::I32), Span::default()),
            span: Span::default(),
        }
    }

    #[test]
    fn mangles_root_function() {
        let mangler = Mangler;
        let ns = NamespaceHierarchy::default();
        let types = UserTypeTable::new();
        assert_eq!(
            mangler.mangle_function(&ns, &types, &decl("main", None, &[])),
            Some("_Z4mainE".to_string())
        );
        let i32_ty = Type::builtin(BuiltinKind::I32);
        assert_eq!(
            mangler.mangle_function(&ns, &types, &decl("add", None, &[i32_ty.clone(), i32_ty])),
            Some("_Z3addiiE".to_string())
        );
    }

    #[test]
    fn external_linkage_keeps_plain_name() {
        let mangler = Mangler;
        let ns = NamespaceHierarchy::default();
        let types = UserTypeTable::new();
        assert_eq!(
            mangler.mangle_function(&ns, &types, &decl("puts", Some(Linkage::External), &[])),
            Some("puts".to_string())
        );
    }

    #[test]
    fn namespace_frames_prefix_the_name() {
        let mangler = Mangler;
        let mut ns = NamespaceHierarchy::default();
        ns.push("math", false);
        ns.push("trig", false);
        let types = UserTypeTable::new();
        assert_eq!(
            mangler.mangle_function(&ns, &types, &decl("sin", None, &[Type::builtin(BuiltinKind::F64)])),
            Some("_Z4math4trig3sindE".to_string())
        );
    }

    #[test]
    fn call_candidates_in_priority_order() {
        let mangler = Mangler;
        let mut ns = NamespaceHierarchy::default();
        ns.push("outer", false);
        ns.push("inner", false);
        let types = UserTypeTable::new();
        let i32_ty = Type::builtin(BuiltinKind::I32);
        let candidates = mangler
            .mangle_call_candidates(&ns, &types, "f", &[&i32_ty])
            .unwrap();
        assert_eq!(
            candidates,
            vec![
                "_Z5outer5inner1fiE".to_string(),
                "_Z5outer1fiE".to_string(),
                "_Z1fiE".to_string(),
            ]
        );
    }

    #[test]
    fn member_call_prepends_class_frame() {
        let mangler = Mangler;
        let ns = NamespaceHierarchy::default();
        let types = UserTypeTable::new();
        let i32_ty = Type::builtin(BuiltinKind::I32);
        assert_eq!(
            mangler.mangle_member_call(&ns, &types, "area", "Rect", &[&i32_ty]),
            Some("_Z4Rect4areaiE".to_string())
        );
    }

    #[test]
    fn mangling_is_injective_over_inputs() {
        let mangler = Mangler;
        let ns = NamespaceHierarchy::default();
        let types = UserTypeTable::new();
        let i32_ty = Type::builtin(BuiltinKind::I32);
        let i64_ty = Type::builtin(BuiltinKind::I64);

        let a = mangler.mangle_function(&ns, &types, &decl("f", None, &[i32_ty.clone()]));
        let b = mangler.mangle_function(&ns, &types, &decl("f", None, &[i64_ty]));
        let c = mangler.mangle_function(&ns, &types, &decl("g", None, &[i32_ty.clone()]));
        let mut with_ns = NamespaceHierarchy::default();
        with_ns.push("m", false);
        let d = mangler.mangle_function(&with_ns, &types, &decl("f", None, &[i32_ty.clone()]));

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        // Same input, same string.
        assert_eq!(
            a,
            mangler.mangle_function(&ns, &types, &decl("f", None, &[i32_ty]))
        );
    }

    #[test]
    fn unknown_user_type_fails_cleanly() {
        let mangler = Mangler;
        let ns = NamespaceHierarchy::default();
        let types = UserTypeTable::new();
        let ghost = Type::user_defined("Ghost");
        assert_eq!(
            mangler.mangle_function(&ns, &types, &decl("f", None, &[ghost.clone()])),
            None
        );
        assert_eq!(
            mangler.mangle_call_candidates(&ns, &types, "f", &[&ghost]),
            None
        );
    }
}
