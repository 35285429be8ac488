//! Known head symbols and their structural roles
//!
//! Every structural decision the engine makes about a list (where its parameter
//! vector goes, where its body starts, whether it introduces bindings) goes
//! through [`FormKind`]. The table is built once; everything else matches on
//! the enum instead of comparing head strings.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::ir::symbol_resolution::DefinitionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Ns,
    Def,
    DefPrivate,
    Defn,
    DefnPrivate,
    Defmacro,
    DefmacroPrivate,
    Defstruct,
    Defexception,
    Definterface,
    Deftest,
    Fn,
    Let,
    Loop,
    For,
    Dofor,
    Foreach,
    Binding,
    IfLet,
    WhenLet,
    If,
    IfNot,
    When,
    WhenNot,
    Do,
    Case,
    Cond,
    Try,
    Catch,
    Finally,
    WithOutputBuffer,
}

static FORM_TABLE: &[(&str, FormKind)] = &[
    ("ns", FormKind::Ns),
    ("def", FormKind::Def),
    ("def-", FormKind::DefPrivate),
    ("defn", FormKind::Defn),
    ("defn-", FormKind::DefnPrivate),
    ("defmacro", FormKind::Defmacro),
    ("defmacro-", FormKind::DefmacroPrivate),
    ("defstruct", FormKind::Defstruct),
    ("defexception", FormKind::Defexception),
    ("definterface", FormKind::Definterface),
    ("deftest", FormKind::Deftest),
    ("fn", FormKind::Fn),
    ("let", FormKind::Let),
    ("loop", FormKind::Loop),
    ("for", FormKind::For),
    ("dofor", FormKind::Dofor),
    ("foreach", FormKind::Foreach),
    ("binding", FormKind::Binding),
    ("if-let", FormKind::IfLet),
    ("when-let", FormKind::WhenLet),
    ("if", FormKind::If),
    ("if-not", FormKind::IfNot),
    ("when", FormKind::When),
    ("when-not", FormKind::WhenNot),
    ("do", FormKind::Do),
    ("case", FormKind::Case),
    ("cond", FormKind::Cond),
    ("try", FormKind::Try),
    ("catch", FormKind::Catch),
    ("finally", FormKind::Finally),
    ("with-output-buffer", FormKind::WithOutputBuffer),
];

static FORMS_BY_NAME: Lazy<FxHashMap<&'static str, FormKind>> =
    Lazy::new(|| FORM_TABLE.iter().copied().collect());

impl FormKind {
    pub fn lookup(name: &str) -> Option<FormKind> {
        FORMS_BY_NAME.get(name).copied()
    }

    pub fn name(self) -> &'static str {
        FORM_TABLE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("", |(name, _)| name)
    }

    /// Forms that bound local visibility: named functions, macros and `fn`.
    pub fn is_scope_root(self) -> bool {
        matches!(
            self,
            FormKind::Defn
                | FormKind::DefnPrivate
                | FormKind::Defmacro
                | FormKind::DefmacroPrivate
                | FormKind::Fn
        )
    }

    /// Form ordinal (head = 0) where the parameter vector is declared.
    pub fn parameter_slot(self) -> Option<usize> {
        match self {
            FormKind::Fn => Some(1),
            FormKind::Defn
            | FormKind::DefnPrivate
            | FormKind::Defmacro
            | FormKind::DefmacroPrivate => Some(2),
            _ => None,
        }
    }

    /// Binding vectors of the form `[name value name value ...]`.
    pub fn has_alternating_bindings(self) -> bool {
        matches!(
            self,
            FormKind::Let | FormKind::Loop | FormKind::For | FormKind::Binding
        )
    }

    /// Forms whose ordinal-1 slot names a new definition.
    pub fn is_definition(self) -> bool {
        self.definition_kind().is_some()
    }

    pub fn definition_kind(self) -> Option<DefinitionKind> {
        match self {
            FormKind::Def | FormKind::DefPrivate => Some(DefinitionKind::Variable),
            FormKind::Defn | FormKind::DefnPrivate => Some(DefinitionKind::Function),
            FormKind::Defmacro | FormKind::DefmacroPrivate => Some(DefinitionKind::Macro),
            FormKind::Defstruct | FormKind::Defexception | FormKind::Definterface => {
                Some(DefinitionKind::Struct)
            }
            _ => None,
        }
    }

    /// Definitions visible from other namespaces (no `-` suffix).
    pub fn is_public_definition(self) -> bool {
        matches!(
            self,
            FormKind::Def | FormKind::Defn | FormKind::Defmacro | FormKind::Defstruct
        )
    }

    /// Ordinal offset from the head where the body (value position) starts.
    ///
    /// `None` means the form has no body positions at all (`ns`) or is not a
    /// special form, in which case every argument is a plain argument.
    pub fn body_offset(self) -> Option<usize> {
        match self {
            FormKind::Def
            | FormKind::DefPrivate
            | FormKind::Defstruct
            | FormKind::Defn
            | FormKind::DefnPrivate
            | FormKind::Defmacro
            | FormKind::DefmacroPrivate => Some(3),
            FormKind::Deftest
            | FormKind::Let
            | FormKind::WhenLet
            | FormKind::IfLet
            | FormKind::Binding
            | FormKind::Fn
            | FormKind::Loop
            | FormKind::For
            | FormKind::Dofor
            | FormKind::Foreach
            | FormKind::Definterface => Some(2),
            FormKind::If
            | FormKind::IfNot
            | FormKind::When
            | FormKind::WhenNot
            | FormKind::Do
            | FormKind::Case
            | FormKind::Cond
            | FormKind::Try
            | FormKind::WithOutputBuffer => Some(1),
            _ => None,
        }
    }

    /// Heads whose argument slots hold declarations rather than values; API
    /// functions are not offered directly inside them.
    pub fn suppresses_api(self) -> bool {
        matches!(
            self,
            FormKind::Defn
                | FormKind::DefnPrivate
                | FormKind::Defmacro
                | FormKind::DefmacroPrivate
                | FormKind::Let
                | FormKind::Loop
                | FormKind::Binding
                | FormKind::Fn
                | FormKind::IfLet
                | FormKind::WhenLet
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_round_trips_names() {
        for (name, kind) in FORM_TABLE {
            assert_eq!(FormKind::lookup(name), Some(*kind));
            assert_eq!(kind.name(), *name);
        }
        assert_eq!(FormKind::lookup("map"), None);
        assert_eq!(FormKind::lookup("defn "), None);
    }

    #[test]
    fn test_parameter_slots() {
        assert_eq!(FormKind::Fn.parameter_slot(), Some(1));
        assert_eq!(FormKind::Defn.parameter_slot(), Some(2));
        assert_eq!(FormKind::DefmacroPrivate.parameter_slot(), Some(2));
        assert_eq!(FormKind::Let.parameter_slot(), None);
        assert!(FormKind::Let.has_alternating_bindings());
        assert!(!FormKind::IfLet.has_alternating_bindings());
    }

    #[test]
    fn test_body_offsets() {
        assert_eq!(FormKind::Defn.body_offset(), Some(3));
        assert_eq!(FormKind::Let.body_offset(), Some(2));
        assert_eq!(FormKind::If.body_offset(), Some(1));
        assert_eq!(FormKind::Ns.body_offset(), None);
        assert_eq!(FormKind::Catch.body_offset(), None);
    }

    #[test]
    fn test_definition_kinds() {
        assert_eq!(FormKind::Defn.definition_kind(), Some(DefinitionKind::Function));
        assert_eq!(FormKind::DefPrivate.definition_kind(), Some(DefinitionKind::Variable));
        assert_eq!(FormKind::Definterface.definition_kind(), Some(DefinitionKind::Struct));
        assert!(!FormKind::DefnPrivate.is_public_definition());
        assert!(FormKind::Defstruct.is_public_definition());
        assert!(!FormKind::Deftest.is_definition());
    }
}
