//! The Opal type model.
//!
//! Types form a tagged hierarchy: built-in scalars, pointers, references,
//! fixed-size arrays, name-deferred user types, classes with members, and
//! discriminated unions. Each node carries the mutability of the binding it
//! describes; [`Type::set_mutable`] propagates through composites so deep
//! mutability stays consistent.
//!
//! Type nodes own their children and `Clone` is a deep copy, so mutating one
//! binding's type can never alias another's.
//!
//! `UserDefined` is an indirection only used while lowering AST type syntax:
//! every structural query resolves it through the [`UserTypeTable`] and
//! reports cleanly (`None` / `false`) when the referent is unknown. It is
//! never stored in the table itself, so resolution cannot cycle.

use std::fmt;

use rustc_hash::FxHashMap;

/// Signedness classification of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignKind {
    Signed,
    Unsigned,
    NoSign,
}

/// The built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Void,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
    /// A 32-bit Unicode code point.
    Char,
    F32,
    F64,
    Isize,
    Usize,
}

impl BuiltinKind {
    /// The source-level spelling.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Isize => "isize",
            Self::Usize => "usize",
        }
    }

    /// Parse a source-level type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => Self::Void,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "bool" => Self::Bool,
            "char" => Self::Char,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "isize" => Self::Isize,
            "usize" => Self::Usize,
            _ => return None,
        })
    }

    #[must_use]
    pub fn sign_kind(self) -> SignKind {
        match self {
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::Isize => SignKind::Signed,
            Self::F32 | Self::F64 => SignKind::Signed,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::Usize | Self::Bool | Self::Char => {
                SignKind::Unsigned
            }
            Self::Void => SignKind::NoSign,
        }
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::Isize
                | Self::Usize
                | Self::Bool
                | Self::Char
        )
    }

    #[must_use]
    pub fn is_floating(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Single-letter mangle code. Stable within a compilation unit.
    #[must_use]
    pub fn mangle_letter(self) -> char {
        match self {
            Self::Void => 'v',
            Self::I8 => 'a',
            Self::I16 => 's',
            Self::I32 => 'i',
            Self::I64 => 'x',
            Self::U8 => 'h',
            Self::U16 => 't',
            Self::U32 => 'j',
            Self::U64 => 'y',
            Self::Bool => 'b',
            Self::Char => 'c',
            Self::F32 => 'f',
            Self::F64 => 'd',
            Self::Isize => 'l',
            Self::Usize => 'm',
        }
    }
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Member access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessibility {
    Public,
    Private,
}

/// One member variable of a class. Its offset is its position in the member
/// list.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberVariable {
    pub name: String,
    pub ty: Type,
    pub accessibility: Accessibility,
}

/// One variant of a discriminated union: a tag, its offset (the variant
/// index, which doubles as the discriminant value), and the payload type.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionVariantDef {
    pub tag: String,
    pub offset: u8,
    pub ty: Type,
}

/// A type node.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Builtin {
        kind: BuiltinKind,
        is_mutable: bool,
    },
    Pointer {
        pointee: Box<Type>,
        is_mutable: bool,
    },
    /// A pointer that is implicitly dereferenced on use.
    Reference {
        refee: Box<Type>,
        is_mutable: bool,
    },
    Array {
        element: Box<Type>,
        size: u64,
        is_mutable: bool,
    },
    /// Name-deferred resolution through the [`UserTypeTable`].
    UserDefined {
        name: String,
        is_mutable: bool,
    },
    Class {
        name: String,
        members: Vec<MemberVariable>,
        /// Forward-declared: members unknown, may be pointed to but not
        /// instantiated.
        is_opaque: bool,
        is_mutable: bool,
    },
    Union {
        name: String,
        variants: Vec<UnionVariantDef>,
        is_mutable: bool,
    },
}

impl Type {
    #[must_use]
    pub fn builtin(kind: BuiltinKind) -> Self {
        Self::Builtin {
            kind,
            is_mutable: false,
        }
    }

    #[must_use]
    pub fn pointer(pointee: Type) -> Self {
        Self::Pointer {
            pointee: Box::new(pointee),
            is_mutable: false,
        }
    }

    #[must_use]
    pub fn reference(refee: Type) -> Self {
        Self::Reference {
            refee: Box::new(refee),
            is_mutable: false,
        }
    }

    #[must_use]
    pub fn array(element: Type, size: u64) -> Self {
        Self::Array {
            element: Box::new(element),
            size,
            is_mutable: false,
        }
    }

    #[must_use]
    pub fn user_defined(name: impl Into<String>) -> Self {
        Self::UserDefined {
            name: name.into(),
            is_mutable: false,
        }
    }

    /// A forward-declared class with no known members.
    #[must_use]
    pub fn opaque_class(name: impl Into<String>) -> Self {
        Self::Class {
            name: name.into(),
            members: Vec::new(),
            is_opaque: true,
            is_mutable: false,
        }
    }

    #[must_use]
    pub fn class(name: impl Into<String>, members: Vec<MemberVariable>) -> Self {
        Self::Class {
            name: name.into(),
            members,
            is_opaque: false,
            is_mutable: false,
        }
    }

    /// Build a union from `(tag, payload)` pairs; offsets are list positions.
    #[must_use]
    pub fn union_of(name: impl Into<String>, tags: Vec<(String, Type)>) -> Self {
        let variants = tags
            .into_iter()
            .enumerate()
            .map(|(i, (tag, ty))| UnionVariantDef {
                tag,
                offset: i as u8,
                ty,
            })
            .collect();
        Self::Union {
            name: name.into(),
            variants,
            is_mutable: false,
        }
    }

    // -- Mutability --

    #[must_use]
    pub fn is_mutable(&self) -> bool {
        match self {
            Self::Builtin { is_mutable, .. }
            | Self::Pointer { is_mutable, .. }
            | Self::Reference { is_mutable, .. }
            | Self::Array { is_mutable, .. }
            | Self::UserDefined { is_mutable, .. }
            | Self::Class { is_mutable, .. }
            | Self::Union { is_mutable, .. } => *is_mutable,
        }
    }

    /// Set mutability, propagating into pointee/refee/element so a mutable
    /// binding is mutable all the way down.
    pub fn set_mutable(&mut self, mutable: bool) {
        match self {
            Self::Builtin { is_mutable, .. }
            | Self::UserDefined { is_mutable, .. }
            | Self::Class { is_mutable, .. }
            | Self::Union { is_mutable, .. } => *is_mutable = mutable,
            Self::Pointer {
                pointee: inner,
                is_mutable,
            }
            | Self::Reference {
                refee: inner,
                is_mutable,
            }
            | Self::Array {
                element: inner,
                is_mutable,
                ..
            } => {
                *is_mutable = mutable;
                inner.set_mutable(mutable);
            }
        }
    }

    // -- Resolution --

    /// Resolve a `UserDefined` node to the table entry it names. Any other
    /// node resolves to itself. `None` when the referent is unknown.
    #[must_use]
    pub fn resolve<'a>(&'a self, types: &'a UserTypeTable) -> Option<&'a Type> {
        match self {
            Self::UserDefined { name, .. } => types.lookup(name),
            other => Some(other),
        }
    }

    /// A deep copy with `UserDefined` replaced by its referent, keeping this
    /// node's mutability. Used when a binding's type is recorded, so symbol
    /// tables never hold the indirection.
    #[must_use]
    pub fn resolved(&self, types: &UserTypeTable) -> Option<Type> {
        match self {
            Self::UserDefined { name, is_mutable } => {
                let mut real = types.lookup(name)?.clone();
                real.set_mutable(*is_mutable);
                Some(real)
            }
            Self::Pointer { pointee, is_mutable } => Some(Self::Pointer {
                pointee: Box::new(pointee.resolved(types)?),
                is_mutable: *is_mutable,
            }),
            Self::Reference { refee, is_mutable } => Some(Self::Reference {
                refee: Box::new(refee.resolved(types)?),
                is_mutable: *is_mutable,
            }),
            Self::Array {
                element,
                size,
                is_mutable,
            } => Some(Self::Array {
                element: Box::new(element.resolved(types)?),
                size: *size,
                is_mutable: *is_mutable,
            }),
            other => Some(other.clone()),
        }
    }

    /// Name carried by a `UserDefined` node.
    #[must_use]
    pub fn user_defined_name(&self) -> Option<&str> {
        match self {
            Self::UserDefined { name, .. } => Some(name),
            _ => None,
        }
    }

    // -- Structural predicates --
    //
    // All dispatch through `resolve`; an unresolved user type answers `false`
    // everywhere, and the fallible accessors below surface the failure.

    #[must_use]
    pub fn sign_kind(&self, types: &UserTypeTable) -> Option<SignKind> {
        match self.resolve(types)? {
            Self::Builtin { kind, .. } => Some(kind.sign_kind()),
            Self::Pointer { .. } => Some(SignKind::Unsigned),
            Self::Reference { refee, .. } => refee.sign_kind(types),
            Self::Array { .. } | Self::Class { .. } | Self::Union { .. } => Some(SignKind::NoSign),
            Self::UserDefined { .. } => None,
        }
    }

    #[must_use]
    pub fn is_signed(&self, types: &UserTypeTable) -> bool {
        self.sign_kind(types) == Some(SignKind::Signed)
    }

    #[must_use]
    pub fn is_void(&self, types: &UserTypeTable) -> bool {
        matches!(
            self.resolve(types),
            Some(Self::Builtin {
                kind: BuiltinKind::Void,
                ..
            })
        )
    }

    #[must_use]
    pub fn is_integer(&self, types: &UserTypeTable) -> bool {
        matches!(self.resolve(types), Some(Self::Builtin { kind, .. }) if kind.is_integer())
    }

    #[must_use]
    pub fn is_floating(&self, types: &UserTypeTable) -> bool {
        matches!(self.resolve(types), Some(Self::Builtin { kind, .. }) if kind.is_floating())
    }

    #[must_use]
    pub fn is_pointer(&self, types: &UserTypeTable) -> bool {
        matches!(self.resolve(types), Some(Self::Pointer { .. }))
    }

    #[must_use]
    pub fn is_reference(&self, types: &UserTypeTable) -> bool {
        matches!(self.resolve(types), Some(Self::Reference { .. }))
    }

    #[must_use]
    pub fn is_array(&self, types: &UserTypeTable) -> bool {
        matches!(self.resolve(types), Some(Self::Array { .. }))
    }

    #[must_use]
    pub fn is_class(&self, types: &UserTypeTable) -> bool {
        matches!(self.resolve(types), Some(Self::Class { .. }))
    }

    #[must_use]
    pub fn is_union(&self, types: &UserTypeTable) -> bool {
        matches!(self.resolve(types), Some(Self::Union { .. }))
    }

    #[must_use]
    pub fn is_opaque(&self, types: &UserTypeTable) -> bool {
        matches!(self.resolve(types), Some(Self::Class { is_opaque: true, .. }))
    }

    // -- Accessors --

    #[must_use]
    pub fn pointee<'a>(&'a self, types: &'a UserTypeTable) -> Option<&'a Type> {
        match self.resolve(types)? {
            Self::Pointer { pointee, .. } => Some(pointee),
            _ => None,
        }
    }

    #[must_use]
    pub fn refee<'a>(&'a self, types: &'a UserTypeTable) -> Option<&'a Type> {
        match self.resolve(types)? {
            Self::Reference { refee, .. } => Some(refee),
            _ => None,
        }
    }

    #[must_use]
    pub fn element<'a>(&'a self, types: &'a UserTypeTable) -> Option<&'a Type> {
        match self.resolve(types)? {
            Self::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn array_size(&self, types: &UserTypeTable) -> Option<u64> {
        match self.resolve(types)? {
            Self::Array { size, .. } => Some(*size),
            _ => None,
        }
    }

    #[must_use]
    pub fn class_name<'a>(&'a self, types: &'a UserTypeTable) -> Option<&'a str> {
        match self.resolve(types)? {
            Self::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Class members, in declaration order. `None` for opaque classes.
    #[must_use]
    pub fn class_members<'a>(&'a self, types: &'a UserTypeTable) -> Option<&'a [MemberVariable]> {
        match self.resolve(types)? {
            Self::Class {
                members,
                is_opaque: false,
                ..
            } => Some(members),
            _ => None,
        }
    }

    /// A member's offset within its class, by name.
    #[must_use]
    pub fn member_offset(&self, types: &UserTypeTable, member: &str) -> Option<usize> {
        self.class_members(types)?
            .iter()
            .position(|m| m.name == member)
    }

    #[must_use]
    pub fn union_variants<'a>(&'a self, types: &'a UserTypeTable) -> Option<&'a [UnionVariantDef]> {
        match self.resolve(types)? {
            Self::Union { variants, .. } => Some(variants),
            _ => None,
        }
    }

    /// Look up one union variant by tag.
    #[must_use]
    pub fn union_variant<'a>(
        &'a self,
        types: &'a UserTypeTable,
        tag: &str,
    ) -> Option<&'a UnionVariantDef> {
        self.union_variants(types)?.iter().find(|v| v.tag == tag)
    }

    // -- Mangling --

    /// The mangled spelling of this type. Distinct types mangle to distinct
    /// strings; cloning never changes the result. `None` when a `UserDefined`
    /// referent is missing.
    #[must_use]
    pub fn mangled_name(&self, types: &UserTypeTable) -> Option<String> {
        match self {
            Self::Builtin { kind, .. } => Some(kind.mangle_letter().to_string()),
            Self::Pointer { pointee, .. } => Some(format!("P{}", pointee.mangled_name(types)?)),
            Self::Reference { refee, .. } => Some(format!("R{}", refee.mangled_name(types)?)),
            Self::Array { element, size, .. } => {
                Some(format!("A{}_{}", size, element.mangled_name(types)?))
            }
            Self::UserDefined { name, .. } => types.lookup(name)?.mangled_name(types),
            Self::Class { name, .. } | Self::Union { name, .. } => {
                Some(format!("{}{}", name.len(), name))
            }
        }
    }

    /// Human-readable spelling for diagnostics.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Builtin { kind, .. } => kind.name().to_string(),
            Self::Pointer { pointee, .. } => format!("*{}", pointee.display_name()),
            Self::Reference { refee, .. } => format!("&{}", refee.display_name()),
            Self::Array { element, size, .. } => {
                format!("[{}; {}]", element.display_name(), size)
            }
            Self::UserDefined { name, .. }
            | Self::Class { name, .. }
            | Self::Union { name, .. } => name.clone(),
        }
    }
}

/// Error from registering a user type whose name is already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateTypeName {
    pub name: String,
}

impl fmt::Display for DuplicateTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type name '{}' is already defined", self.name)
    }
}

impl std::error::Error for DuplicateTypeName {}

/// The per-unit registry of class and union types.
///
/// Class and union names are globally unique within a compilation unit.
/// Opaque classes use two-phase registration: [`declare_opaque`] creates an
/// empty class, a later [`define_class`] populates its members.
///
/// [`declare_opaque`]: UserTypeTable::declare_opaque
/// [`define_class`]: UserTypeTable::define_class
#[derive(Debug, Default)]
pub struct UserTypeTable {
    table: FxHashMap<String, Type>,
}

impl UserTypeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.table.get(name)
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Register a complete type under a fresh name.
    pub fn register(&mut self, name: &str, ty: Type) -> Result<(), DuplicateTypeName> {
        debug_assert!(ty.user_defined_name().is_none(), "table stores real types only");
        if self.table.contains_key(name) {
            return Err(DuplicateTypeName {
                name: name.to_string(),
            });
        }
        self.table.insert(name.to_string(), ty);
        Ok(())
    }

    /// Forward-declare a class. Re-declaring an opaque class is a no-op;
    /// declaring over a completed type is an error.
    pub fn declare_opaque(&mut self, name: &str) -> Result<(), DuplicateTypeName> {
        if !self.table.contains_key(name) {
            self.table.insert(name.to_string(), Type::opaque_class(name));
            return Ok(());
        }
        match self.table.get(name) {
            Some(Type::Class { is_opaque: true, .. }) => Ok(()),
            _ => Err(DuplicateTypeName {
                name: name.to_string(),
            }),
        }
    }

    /// Complete a class, either filling in a forward declaration or creating
    /// it outright. Completing an already-complete class is an error.
    pub fn define_class(
        &mut self,
        name: &str,
        members: Vec<MemberVariable>,
    ) -> Result<(), DuplicateTypeName> {
        if !self.table.contains_key(name) {
            self.table.insert(name.to_string(), Type::class(name, members));
            return Ok(());
        }
        match self.table.get_mut(name) {
            Some(Type::Class {
                members: slot,
                is_opaque: is_opaque @ true,
                ..
            }) => {
                *slot = members;
                *is_opaque = false;
                Ok(())
            }
            _ => Err(DuplicateTypeName {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32_ty() -> Type {
        Type::builtin(BuiltinKind::I32)
    }

    #[test]
    fn builtin_name_round_trip() {
        for kind in [
            BuiltinKind::Void,
            BuiltinKind::I8,
            BuiltinKind::U64,
            BuiltinKind::Bool,
            BuiltinKind::Char,
            BuiltinKind::F32,
            BuiltinKind::Isize,
            BuiltinKind::Usize,
        ] {
            assert_eq!(BuiltinKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BuiltinKind::from_name("int"), None);
    }

    #[test]
    fn sign_kinds() {
        let types = UserTypeTable::new();
        assert_eq!(i32_ty().sign_kind(&types), Some(SignKind::Signed));
        assert_eq!(
            Type::builtin(BuiltinKind::U8).sign_kind(&types),
            Some(SignKind::Unsigned)
        );
        assert_eq!(
            Type::pointer(i32_ty()).sign_kind(&types),
            Some(SignKind::Unsigned)
        );
        assert_eq!(
            Type::reference(i32_ty()).sign_kind(&types),
            Some(SignKind::Signed)
        );
        assert_eq!(
            Type::array(i32_ty(), 3).sign_kind(&types),
            Some(SignKind::NoSign)
        );
    }

    #[test]
    fn mangled_names_distinct_and_stable() {
        let types = UserTypeTable::new();
        let samples = [
            Type::builtin(BuiltinKind::Void),
            i32_ty(),
            Type::builtin(BuiltinKind::U32),
            Type::builtin(BuiltinKind::I64),
            Type::pointer(i32_ty()),
            Type::pointer(Type::pointer(i32_ty())),
            Type::reference(i32_ty()),
            Type::array(i32_ty(), 3),
            Type::array(i32_ty(), 4),
            Type::array(Type::builtin(BuiltinKind::U32), 3),
        ];
        let mangled: Vec<_> = samples
            .iter()
            .map(|t| t.mangled_name(&types).unwrap())
            .collect();
        for (i, a) in mangled.iter().enumerate() {
            for (j, b) in mangled.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "{:?} vs {:?}", samples[i], samples[j]);
                }
            }
        }
        assert_eq!(mangled[4], "Pi");
        assert_eq!(mangled[6], "Ri");
        assert_eq!(mangled[7], "A3_i");
    }

    #[test]
    fn clone_mangles_identically() {
        let types = UserTypeTable::new();
        let ty = Type::pointer(Type::array(Type::builtin(BuiltinKind::U8), 16));
        assert_eq!(ty.mangled_name(&types), ty.clone().mangled_name(&types));
    }

    #[test]
    fn set_mutable_propagates() {
        let mut ty = Type::pointer(Type::array(i32_ty(), 2));
        assert!(!ty.is_mutable());
        ty.set_mutable(true);
        assert!(ty.is_mutable());
        let types = UserTypeTable::new();
        let elem = ty.pointee(&types).unwrap().element(&types).unwrap();
        assert!(elem.is_mutable());
    }

    #[test]
    fn set_mutable_never_aliases() {
        let mut a = Type::pointer(i32_ty());
        let b = a.clone();
        a.set_mutable(true);
        assert!(a.is_mutable());
        assert!(!b.is_mutable());
        let types = UserTypeTable::new();
        assert!(!b.pointee(&types).unwrap().is_mutable());
    }

    #[test]
    fn user_defined_resolves_through_table() {
        let mut types = UserTypeTable::new();
        types
            .register(
                "Point",
                Type::class(
                    "Point",
                    vec![
                        MemberVariable {
                            name: "x".into(),
                            ty: i32_ty(),
                            accessibility: Accessibility::Public,
                        },
                        MemberVariable {
                            name: "y".into(),
                            ty: i32_ty(),
                            accessibility: Accessibility::Public,
                        },
                    ],
                ),
            )
            .unwrap();

        let ud = Type::user_defined("Point");
        assert!(ud.is_class(&types));
        assert!(!ud.is_opaque(&types));
        assert_eq!(ud.class_name(&types), Some("Point"));
        assert_eq!(ud.member_offset(&types, "y"), Some(1));
        assert_eq!(ud.mangled_name(&types), Some("5Point".to_string()));
    }

    #[test]
    fn unknown_user_type_fails_cleanly() {
        let types = UserTypeTable::new();
        let ud = Type::user_defined("Ghost");
        assert!(!ud.is_class(&types));
        assert!(!ud.is_integer(&types));
        assert_eq!(ud.sign_kind(&types), None);
        assert_eq!(ud.mangled_name(&types), None);
        assert_eq!(ud.resolved(&types), None);
    }

    #[test]
    fn opaque_two_phase_registration() {
        let mut types = UserTypeTable::new();
        types.declare_opaque("Node").unwrap();
        // Repeated forward declarations are fine.
        types.declare_opaque("Node").unwrap();

        let ud = Type::user_defined("Node");
        assert!(ud.is_class(&types));
        assert!(ud.is_opaque(&types));
        assert_eq!(ud.class_members(&types), None);

        types
            .define_class(
                "Node",
                vec![MemberVariable {
                    name: "next".into(),
                    ty: Type::pointer(Type::user_defined("Node")),
                    accessibility: Accessibility::Public,
                }],
            )
            .unwrap();
        assert!(!ud.is_opaque(&types));
        assert_eq!(ud.class_members(&types).map(<[_]>::len), Some(1));

        // Completing twice is a redefinition.
        assert!(types.define_class("Node", Vec::new()).is_err());
        // And so is forward-declaring over a complete class.
        assert!(types.declare_opaque("Node").is_err());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut types = UserTypeTable::new();
        types.register("T", Type::class("T", Vec::new())).unwrap();
        let err = types.register("T", Type::union_of("T", Vec::new())).unwrap_err();
        assert_eq!(err.name, "T");
    }

    #[test]
    fn union_variants_and_offsets() {
        let mut types = UserTypeTable::new();
        types
            .register(
                "Shape",
                Type::union_of(
                    "Shape",
                    vec![
                        ("circle".to_string(), Type::builtin(BuiltinKind::F64)),
                        ("square".to_string(), i32_ty()),
                    ],
                ),
            )
            .unwrap();

        let ud = Type::user_defined("Shape");
        assert!(ud.is_union(&types));
        let variants = ud.union_variants(&types).unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].offset, 0);
        assert_eq!(variants[1].offset, 1);
        let sq = ud.union_variant(&types, "square").unwrap();
        assert_eq!(sq.ty, i32_ty());
        assert_eq!(ud.mangled_name(&types), Some("5Shape".to_string()));
    }

    #[test]
    fn resolved_strips_indirection_and_keeps_mutability() {
        let mut types = UserTypeTable::new();
        types.register("T", Type::class("T", Vec::new())).unwrap();
        let mut ud = Type::user_defined("T");
        ud.set_mutable(true);
        let real = ud.resolved(&types).unwrap();
        assert!(matches!(real, Type::Class { .. }));
        assert!(real.is_mutable());

        // Nested indirections resolve too.
        let ptr = Type::pointer(Type::user_defined("T"));
        let real = ptr.resolved(&types).unwrap();
        assert!(real.pointee(&types).unwrap().user_defined_name().is_none());
    }

    #[test]
    fn display_names() {
        assert_eq!(Type::pointer(i32_ty()).display_name(), "*i32");
        assert_eq!(Type::array(i32_ty(), 3).display_name(), "[i32; 3]");
        assert_eq!(Type::reference(i32_ty()).display_name(), "&i32");
    }
}
