//! Completion candidates and the static Phel API catalog
//!
//! A [`Candidate`] is one suggested insertion. Candidates are produced by the
//! producers in [`super::indexing`], ordered by [`super::ranking::rank`] and
//! converted to LSP items with [`Candidate::to_completion_item`].
//!
//! The catalog lists the functions, macros and special forms shipped with
//! Phel, grouped by [`ApiGroup`]. It is static data built once; lookups by name
//! go through a hash index.

use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemLabelDetails, Documentation,
    InsertTextFormat, MarkupContent, MarkupKind,
};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::ranking::Priority;

/// How a candidate's text is inserted into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InsertionBehavior {
    /// Insert the text as-is
    Plain,
    /// Insert `()` and place the caret between them
    BalancedParens,
    /// Insert `[]` and place the caret between them
    BalancedBrackets,
    /// Expand a form template
    Template(TemplateKind),
    /// Informational entry; nothing is inserted
    None,
}

/// Form templates offered where a new form may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemplateKind {
    Defn,
    Def,
    Let,
    If,
    Fn,
    When,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 6] = [
        TemplateKind::Defn,
        TemplateKind::Def,
        TemplateKind::Let,
        TemplateKind::If,
        TemplateKind::Fn,
        TemplateKind::When,
    ];

    /// Head symbol the template starts with.
    pub fn keyword(self) -> &'static str {
        match self {
            TemplateKind::Defn => "defn",
            TemplateKind::Def => "def",
            TemplateKind::Let => "let",
            TemplateKind::If => "if",
            TemplateKind::Fn => "fn",
            TemplateKind::When => "when",
        }
    }

    /// Plain-text expansion, shown as the candidate's display text.
    pub fn expansion(self) -> &'static str {
        match self {
            TemplateKind::Defn => "(defn name [] ())",
            TemplateKind::Def => "(def name )",
            TemplateKind::Let => "(let [bindings] body)",
            TemplateKind::If => "(if condition then else)",
            TemplateKind::Fn => "(fn [params] body)",
            TemplateKind::When => "(when condition body)",
        }
    }

    /// LSP snippet with tab stops.
    pub fn snippet(self) -> &'static str {
        match self {
            TemplateKind::Defn => "(defn ${1:name} [$2]\n  ($0))",
            TemplateKind::Def => "(def ${1:name} $0)",
            TemplateKind::Let => "(let [${1:bindings}]\n  $0)",
            TemplateKind::If => "(if ${1:condition}\n  ${2:then}\n  ${3:else})",
            TemplateKind::Fn => "(fn [${1:params}] $0)",
            TemplateKind::When => "(when ${1:condition}\n  $0)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TemplateKind::Defn => "Function definition template",
            TemplateKind::Def => "Variable definition template",
            TemplateKind::Let => "Let binding template",
            TemplateKind::If => "Conditional template",
            TemplateKind::Fn => "Anonymous function template",
            TemplateKind::When => "When template",
        }
    }
}

/// One suggested insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Text inserted when the candidate is accepted
    pub text: String,
    /// Label shown in the popup
    pub display_text: String,
    /// Short category shown next to the label ("Parameter", "Core Function", ...)
    pub type_hint: Option<String>,
    /// Call shape shown after the label, e.g. `(map f & colls)`
    pub signature: Option<String>,
    /// Longer description shown in the documentation pane
    pub documentation: Option<String>,
    pub priority: Priority,
    pub insertion: InsertionBehavior,
}

impl Candidate {
    pub fn new(text: impl Into<String>, priority: Priority) -> Self {
        let text = text.into();
        Self {
            display_text: text.clone(),
            text,
            type_hint: None,
            signature: None,
            documentation: None,
            priority,
            insertion: InsertionBehavior::Plain,
        }
    }

    /// A candidate that only carries a message; accepting it inserts nothing.
    pub fn informational(
        display_text: impl Into<String>,
        type_hint: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            text: String::new(),
            display_text: display_text.into(),
            type_hint: Some(type_hint.into()),
            signature: None,
            documentation: None,
            priority,
            insertion: InsertionBehavior::None,
        }
    }

    /// Candidate expanding a form template.
    pub fn template(kind: TemplateKind, priority: Priority) -> Self {
        Self {
            text: kind.keyword().to_string(),
            display_text: kind.expansion().to_string(),
            type_hint: Some(kind.description().to_string()),
            signature: None,
            documentation: None,
            priority,
            insertion: InsertionBehavior::Template(kind),
        }
    }

    /// Candidate for a catalog entry.
    pub fn from_catalog(entry: &CatalogEntry, priority: Priority) -> Self {
        Self::new(entry.name, priority)
            .with_type_hint(entry.group.label())
            .with_signature(entry.signature)
            .with_documentation(entry.summary)
    }

    pub fn with_display(mut self, display_text: impl Into<String>) -> Self {
        self.display_text = display_text.into();
        self
    }

    pub fn with_type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        self.signature = (!signature.is_empty()).then_some(signature);
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        let documentation = documentation.into();
        self.documentation = (!documentation.is_empty()).then_some(documentation);
        self
    }

    pub fn with_insertion(mut self, insertion: InsertionBehavior) -> Self {
        self.insertion = insertion;
        self
    }

    pub fn is_informational(&self) -> bool {
        self.insertion == InsertionBehavior::None
    }

    fn item_kind(&self) -> CompletionItemKind {
        match self.insertion {
            InsertionBehavior::Template(_) => return CompletionItemKind::SNIPPET,
            InsertionBehavior::None => return CompletionItemKind::TEXT,
            InsertionBehavior::BalancedParens | InsertionBehavior::BalancedBrackets => {
                return CompletionItemKind::OPERATOR;
            }
            InsertionBehavior::Plain => {}
        }
        if self.text.starts_with(':') {
            return CompletionItemKind::KEYWORD;
        }
        match self.priority {
            Priority::CurrentScopeLocals | Priority::NestedScopeLocals => {
                CompletionItemKind::VARIABLE
            }
            Priority::SpecialForms | Priority::ControlFlow => CompletionItemKind::KEYWORD,
            Priority::Macros => CompletionItemKind::SNIPPET,
            Priority::PhpInterop => CompletionItemKind::CLASS,
            _ => CompletionItemKind::FUNCTION,
        }
    }

    /// Convert to LSP CompletionItem
    ///
    /// # Arguments
    /// * `sort_order` - Position in the ranked list; becomes the item's sort text
    pub fn to_completion_item(&self, sort_order: usize) -> CompletionItem {
        let mut item = CompletionItem {
            label: self.display_text.clone(),
            kind: Some(self.item_kind()),
            detail: self.type_hint.clone(),
            ..Default::default()
        };

        if let Some(ref signature) = self.signature {
            item.label_details = Some(CompletionItemLabelDetails {
                detail: None,
                description: Some(signature.clone()),
            });
        }

        if let Some(ref doc) = self.documentation {
            item.documentation = Some(Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: doc.clone(),
            }));
        }

        match self.insertion {
            InsertionBehavior::Plain => {
                item.insert_text = Some(self.text.clone());
            }
            InsertionBehavior::BalancedParens => {
                item.insert_text = Some("($0)".to_string());
                item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            }
            InsertionBehavior::BalancedBrackets => {
                item.insert_text = Some("[$0]".to_string());
                item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            }
            InsertionBehavior::Template(kind) => {
                item.insert_text = Some(kind.snippet().to_string());
                item.insert_text_format = Some(InsertTextFormat::SNIPPET);
                item.filter_text = Some(kind.keyword().to_string());
            }
            InsertionBehavior::None => {
                item.insert_text = Some(String::new());
            }
        }

        // Sort text ensures proper ordering (lower numbers first)
        item.sort_text = Some(format!("{:04}", sort_order));

        item
    }
}

/// Catalog grouping of a built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ApiGroup {
    SpecialForm,
    ControlFlow,
    Macro,
    Core,
    Predicate,
    Collection,
    Arithmetic,
    String,
    Json,
    Base64,
    Html,
    Http,
    Test,
    Debug,
    Repl,
    PhpInterop,
}

impl ApiGroup {
    pub fn label(self) -> &'static str {
        match self {
            ApiGroup::SpecialForm => "Special Form",
            ApiGroup::ControlFlow => "Control Flow",
            ApiGroup::Macro => "Macro",
            ApiGroup::Core => "Core Function",
            ApiGroup::Predicate => "Predicate",
            ApiGroup::Collection => "Collection Function",
            ApiGroup::Arithmetic => "Arithmetic",
            ApiGroup::String => "String Function",
            ApiGroup::Json => "JSON Function",
            ApiGroup::Base64 => "Base64 Function",
            ApiGroup::Html => "HTML Function",
            ApiGroup::Http => "HTTP Function",
            ApiGroup::Test => "Test Function",
            ApiGroup::Debug => "Debug Function",
            ApiGroup::Repl => "REPL Function",
            ApiGroup::PhpInterop => "PHP Interop",
        }
    }

    /// Groups whose members are written with a namespace alias (`str/join`).
    pub fn is_namespaced(self) -> bool {
        matches!(
            self,
            ApiGroup::String
                | ApiGroup::Json
                | ApiGroup::Base64
                | ApiGroup::Html
                | ApiGroup::Http
                | ApiGroup::Test
                | ApiGroup::Debug
                | ApiGroup::Repl
                | ApiGroup::PhpInterop
        )
    }

    /// Groups offered at argument positions.
    pub fn is_argument_api(self) -> bool {
        matches!(
            self,
            ApiGroup::Core | ApiGroup::Predicate | ApiGroup::Collection | ApiGroup::Arithmetic
        )
    }
}

/// One built-in function, macro or special form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: &'static str,
    /// Call shape, empty for values such as `*ns*`
    pub signature: &'static str,
    pub summary: &'static str,
    pub group: ApiGroup,
}

/// Display name of the parameter that argument `index` of a call with
/// `signature` binds to.
///
/// Arguments past a `&` marker all bind to the rest parameter.
pub fn parameter_at(signature: &str, index: usize) -> Option<&str> {
    let params = signature_parameters(signature);
    match params.iter().position(|p| *p == "&") {
        Some(rest) if index >= rest => params.get(rest + 1).copied(),
        _ => params.get(index).copied(),
    }
}

/// Top-level tokens of a `(head a [b c] & d)` signature, head excluded.
///
/// Bracketed groups such as `[k & ks]` count as one parameter.
pub fn signature_parameters(signature: &str) -> Vec<&str> {
    let Some(inner) = signature
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
    else {
        return Vec::new();
    };

    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (i, ch) in inner.char_indices() {
        match ch {
            '[' | '{' => {
                if depth == 0 && start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            ']' | '}' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&inner[s..i]);
                }
            }
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&inner[s..]);
    }
    tokens.into_iter().skip(1).collect()
}

const fn entry(
    group: ApiGroup,
    name: &'static str,
    signature: &'static str,
    summary: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        name,
        signature,
        summary,
        group,
    }
}

use ApiGroup as G;

/// All built-ins known to the completion engine.
pub static CATALOG: &[CatalogEntry] = &[
    // Special forms
    entry(G::SpecialForm, "def", "(def name meta? value)", "Bind a value to a global name."),
    entry(G::SpecialForm, "def-", "(def- name value)", "Bind a value to a namespace-private global name."),
    entry(G::SpecialForm, "defn", "(defn name & fdecl)", "Define a named global function."),
    entry(G::SpecialForm, "defn-", "(defn- name & fdecl)", "Define a function visible only inside its namespace."),
    entry(G::SpecialForm, "defmacro", "(defmacro name & fdecl)", "Define a macro."),
    entry(G::SpecialForm, "defmacro-", "(defmacro- name & fdecl)", "Define a macro visible only inside its namespace."),
    entry(G::SpecialForm, "defstruct", "(defstruct name keys & implementations)", "Define a struct type with the given fields."),
    entry(G::SpecialForm, "defexception", "(defexception name)", "Define a new exception type."),
    entry(G::SpecialForm, "definterface", "(definterface name & fns)", "Define an interface with the given function signatures."),
    entry(G::SpecialForm, "fn", "(fn [params*] expr*)", "Create an anonymous function."),
    entry(G::SpecialForm, "let", "(let [bindings*] expr*)", "Evaluate the body with local names bound."),
    entry(G::SpecialForm, "ns", "(ns name imports*)", "Declare the namespace of the file and its imports."),
    entry(G::SpecialForm, "quote", "(quote form)", "Return the form unevaluated."),
    entry(G::SpecialForm, "unquote", "(unquote form)", "Evaluate a form inside a quasiquote."),
    entry(G::SpecialForm, "var", "(var value)", "Create a mutable variable holding a value."),
    entry(G::SpecialForm, "macroexpand", "(macroexpand form)", "Expand the macro at the head of a form repeatedly."),
    entry(G::SpecialForm, "macroexpand-1", "(macroexpand-1 form)", "Expand the macro at the head of a form once."),
    // Control flow
    entry(G::ControlFlow, "if", "(if test then else?)", "Evaluate `then` when `test` is truthy, else `else`."),
    entry(G::ControlFlow, "if-not", "(if-not test then & [else])", "Evaluate `then` when `test` is falsy."),
    entry(G::ControlFlow, "if-let", "(if-let bindings then & [else])", "Bind a value and branch on its truthiness."),
    entry(G::ControlFlow, "when", "(when test & body)", "Evaluate the body when `test` is truthy."),
    entry(G::ControlFlow, "when-not", "(when-not test & body)", "Evaluate the body when `test` is falsy."),
    entry(G::ControlFlow, "when-let", "(when-let bindings & body)", "Bind a value and evaluate the body when it is truthy."),
    entry(G::ControlFlow, "cond", "(cond & pairs)", "Evaluate test/expression pairs until a test is truthy."),
    entry(G::ControlFlow, "case", "(case e & pairs)", "Select a branch by comparing a value against constants."),
    entry(G::ControlFlow, "do", "(do expr*)", "Evaluate expressions in order and return the last."),
    entry(G::ControlFlow, "loop", "(loop [bindings*] expr*)", "Establish a recursion point with initial bindings."),
    entry(G::ControlFlow, "recur", "(recur expr*)", "Jump back to the nearest loop or function with new values."),
    entry(G::ControlFlow, "for", "(for head & body)", "List comprehension over one or more collections."),
    entry(G::ControlFlow, "dofor", "(dofor head & body)", "Iterate like `for` for side effects, returning nil."),
    entry(G::ControlFlow, "foreach", "(foreach [key value valueExpr] expr*)", "Iterate over a PHP-style collection for side effects."),
    entry(G::ControlFlow, "try", "(try expr* catch-clause* finally-clause?)", "Evaluate expressions and handle thrown exceptions."),
    entry(G::ControlFlow, "catch", "(catch exception-type exception-name expr*)", "Handle exceptions of the given type inside `try`."),
    entry(G::ControlFlow, "finally", "(finally expr*)", "Expressions always evaluated when a `try` exits."),
    entry(G::ControlFlow, "throw", "(throw exception)", "Throw an exception."),
    // Macros
    entry(G::Macro, "->", "(-> x & forms)", "Thread a value through forms as their first argument."),
    entry(G::Macro, "->>", "(->> x & forms)", "Thread a value through forms as their last argument."),
    entry(G::Macro, "as->", "(as-> expr name & forms)", "Thread a value through forms under a chosen name."),
    entry(G::Macro, "some->", "(some-> x & forms)", "Like `->`, stopping at the first nil."),
    entry(G::Macro, "some->>", "(some->> x & forms)", "Like `->>`, stopping at the first nil."),
    entry(G::Macro, "and", "(and & args)", "Return the first falsy argument, or the last one."),
    entry(G::Macro, "or", "(or & args)", "Return the first truthy argument, or the last one."),
    entry(G::Macro, "binding", "(binding bindings & body)", "Temporarily rebind global definitions for the body."),
    entry(G::Macro, "comment", "(comment & body)", "Ignore the body and return nil."),
    entry(G::Macro, "declare", "(declare name)", "Declare a global name before it is defined."),
    entry(G::Macro, "doto", "(doto x & forms)", "Call forms on a value for side effects and return it."),
    entry(G::Macro, "time", "(time expr)", "Evaluate an expression and print the time it took."),
    entry(G::Macro, "memoize", "(memoize f)", "Wrap a function so results are cached per argument list."),
    entry(G::Macro, "juxt", "(juxt & fs)", "Build a function returning a vector of every function's result."),
    entry(G::Macro, "*ns*", "", "The namespace of the current scope."),
    entry(G::Macro, "*file*", "", "Path of the current source file."),
    // Arithmetic
    entry(G::Arithmetic, "+", "(+ & xs)", "Sum of the numbers; 0 when empty."),
    entry(G::Arithmetic, "-", "(- & xs)", "Difference of the numbers; negation for a single argument."),
    entry(G::Arithmetic, "*", "(* & xs)", "Product of the numbers; 1 when empty."),
    entry(G::Arithmetic, "/", "(/ & xs)", "Quotient of the numbers; reciprocal for a single argument."),
    entry(G::Arithmetic, "%", "(% dividend divisor)", "Remainder of a division."),
    entry(G::Arithmetic, "**", "(** a x)", "Raise `a` to the power `x`."),
    entry(G::Arithmetic, "=", "(= a & more)", "True when all arguments are equal."),
    entry(G::Arithmetic, "not=", "(not= a & more)", "True when the arguments are not all equal."),
    entry(G::Arithmetic, "<", "(< a & more)", "True when the arguments are strictly increasing."),
    entry(G::Arithmetic, "<=", "(<= a & more)", "True when the arguments are non-decreasing."),
    entry(G::Arithmetic, ">", "(> a & more)", "True when the arguments are strictly decreasing."),
    entry(G::Arithmetic, ">=", "(>= a & more)", "True when the arguments are non-increasing."),
    entry(G::Arithmetic, "<=>", "(<=> a b)", "Three-way comparison returning -1, 0 or 1."),
    entry(G::Arithmetic, "compare", "(compare x y)", "Compare two values, returning a negative, zero or positive number."),
    entry(G::Arithmetic, "inc", "(inc x)", "Add one to a number."),
    entry(G::Arithmetic, "dec", "(dec x)", "Subtract one from a number."),
    entry(G::Arithmetic, "max", "(max & numbers)", "Largest of the numbers."),
    entry(G::Arithmetic, "min", "(min & numbers)", "Smallest of the numbers."),
    entry(G::Arithmetic, "abs", "(abs x)", "Absolute value of a number."),
    entry(G::Arithmetic, "mod", "(mod dividend divisor)", "Modulus of a division, with the sign of the divisor."),
    entry(G::Arithmetic, "quot", "(quot dividend divisor)", "Integer quotient of a division."),
    entry(G::Arithmetic, "rem", "(rem dividend divisor)", "Remainder of an integer division."),
    entry(G::Arithmetic, "not", "(not x)", "True when the value is falsy."),
    // Predicates
    entry(G::Predicate, "nil?", "(nil? x)", "True when the value is nil."),
    entry(G::Predicate, "true?", "(true? x)", "True when the value is exactly true."),
    entry(G::Predicate, "false?", "(false? x)", "True when the value is exactly false."),
    entry(G::Predicate, "truthy?", "(truthy? x)", "True for every value except nil and false."),
    entry(G::Predicate, "some?", "(some? pred coll)", "True when the predicate holds for some element."),
    entry(G::Predicate, "every?", "(every? pred coll)", "True when the predicate holds for every element."),
    entry(G::Predicate, "all?", "(all? pred coll)", "True when the predicate holds for all elements."),
    entry(G::Predicate, "not-any?", "(not-any? pred coll)", "True when the predicate holds for no element."),
    entry(G::Predicate, "not-every?", "(not-every? pred coll)", "True when the predicate fails for some element."),
    entry(G::Predicate, "empty?", "(empty? x)", "True when the collection has no elements."),
    entry(G::Predicate, "even?", "(even? x)", "True when the number is even."),
    entry(G::Predicate, "odd?", "(odd? x)", "True when the number is odd."),
    entry(G::Predicate, "pos?", "(pos? x)", "True when the number is greater than zero."),
    entry(G::Predicate, "neg?", "(neg? x)", "True when the number is less than zero."),
    entry(G::Predicate, "zero?", "(zero? x)", "True when the number is zero."),
    entry(G::Predicate, "one?", "(one? x)", "True when the number is one."),
    entry(G::Predicate, "nan?", "(nan? x)", "True when the value is not a number."),
    entry(G::Predicate, "string?", "(string? x)", "True when the value is a string."),
    entry(G::Predicate, "number?", "(number? x)", "True when the value is an integer or float."),
    entry(G::Predicate, "int?", "(int? x)", "True when the value is an integer."),
    entry(G::Predicate, "float?", "(float? x)", "True when the value is a float."),
    entry(G::Predicate, "boolean?", "(boolean? x)", "True when the value is a boolean."),
    entry(G::Predicate, "keyword?", "(keyword? x)", "True when the value is a keyword."),
    entry(G::Predicate, "symbol?", "(symbol? x)", "True when the value is a symbol."),
    entry(G::Predicate, "function?", "(function? x)", "True when the value is callable."),
    entry(G::Predicate, "list?", "(list? x)", "True when the value is a list."),
    entry(G::Predicate, "vector?", "(vector? x)", "True when the value is a vector."),
    entry(G::Predicate, "hash-map?", "(hash-map? x)", "True when the value is a hash map."),
    entry(G::Predicate, "set?", "(set? x)", "True when the value is a set."),
    entry(G::Predicate, "struct?", "(struct? x)", "True when the value is a struct instance."),
    entry(G::Predicate, "var?", "(var? x)", "True when the value is a variable."),
    entry(G::Predicate, "indexed?", "(indexed? x)", "True when the value supports index access."),
    entry(G::Predicate, "associative?", "(associative? x)", "True when the value maps keys to values."),
    entry(G::Predicate, "contains?", "(contains? coll key)", "True when the collection has the key."),
    entry(G::Predicate, "contains-value?", "(contains-value? coll val)", "True when the collection holds the value."),
    entry(G::Predicate, "realized?", "(realized? coll)", "True when a lazy sequence has been evaluated."),
    entry(G::Predicate, "php-array?", "(php-array? x)", "True when the value is a PHP array."),
    entry(G::Predicate, "php-object?", "(php-object? x)", "True when the value is a PHP object."),
    entry(G::Predicate, "php-resource?", "(php-resource? x)", "True when the value is a PHP resource."),
    // Collections
    entry(G::Collection, "map", "(map f & colls)", "Apply a function to every element, lazily."),
    entry(G::Collection, "filter", "(filter pred coll)", "Elements for which the predicate holds, lazily."),
    entry(G::Collection, "remove", "(remove pred coll)", "Elements for which the predicate fails, lazily."),
    entry(G::Collection, "reduce", "(reduce f & args)", "Fold a collection with a two-argument function."),
    entry(G::Collection, "first", "(first coll)", "First element, or nil."),
    entry(G::Collection, "second", "(second coll)", "Second element, or nil."),
    entry(G::Collection, "rest", "(rest coll)", "Everything after the first element."),
    entry(G::Collection, "next", "(next coll)", "Everything after the first element, or nil when empty."),
    entry(G::Collection, "last", "(last coll)", "Last element, or nil."),
    entry(G::Collection, "butlast", "(butlast coll)", "Everything but the last element."),
    entry(G::Collection, "cons", "(cons x coll)", "Prepend an element."),
    entry(G::Collection, "conj", "(conj coll x)", "Add an element where the collection adds most cheaply."),
    entry(G::Collection, "take", "(take n coll)", "The first `n` elements."),
    entry(G::Collection, "take-while", "(take-while pred coll)", "Leading elements while the predicate holds."),
    entry(G::Collection, "take-last", "(take-last n coll)", "The last `n` elements."),
    entry(G::Collection, "take-nth", "(take-nth n coll)", "Every `n`th element."),
    entry(G::Collection, "drop", "(drop n coll)", "All but the first `n` elements."),
    entry(G::Collection, "drop-while", "(drop-while pred coll)", "Elements after the leading run the predicate holds for."),
    entry(G::Collection, "drop-last", "(drop-last n coll)", "All but the last `n` elements."),
    entry(G::Collection, "concat", "(concat & colls)", "Join collections end to end."),
    entry(G::Collection, "into", "(into to & rest)", "Add all elements of a collection to another."),
    entry(G::Collection, "reverse", "(reverse coll)", "Elements in reverse order."),
    entry(G::Collection, "sort", "(sort coll & [comp])", "Elements in sorted order."),
    entry(G::Collection, "sort-by", "(sort-by keyfn coll & [comp])", "Elements sorted by a key function."),
    entry(G::Collection, "group-by", "(group-by f coll)", "Map from key-function result to matching elements."),
    entry(G::Collection, "partition", "(partition n coll)", "Split into chunks of `n`, dropping a short tail."),
    entry(G::Collection, "partition-all", "(partition-all n coll)", "Split into chunks of `n`, keeping a short tail."),
    entry(G::Collection, "partition-by", "(partition-by f coll)", "Split whenever the function's result changes."),
    entry(G::Collection, "frequencies", "(frequencies coll)", "Map from element to occurrence count."),
    entry(G::Collection, "distinct", "(distinct coll)", "Elements with duplicates removed."),
    entry(G::Collection, "dedupe", "(dedupe coll)", "Elements with consecutive duplicates removed."),
    entry(G::Collection, "flatten", "(flatten coll)", "Nested sequential collections as one flat sequence."),
    entry(G::Collection, "interleave", "(interleave & colls)", "First of each collection, then second of each, and so on."),
    entry(G::Collection, "interpose", "(interpose sep coll)", "Elements separated by `sep`."),
    entry(G::Collection, "mapcat", "(mapcat f & colls)", "Map, then concatenate the results."),
    entry(G::Collection, "map-indexed", "(map-indexed f coll)", "Map with the element index as first argument."),
    entry(G::Collection, "keep", "(keep pred coll)", "Non-nil results of applying the function."),
    entry(G::Collection, "keep-indexed", "(keep-indexed pred coll)", "Non-nil results of applying the function with the index."),
    entry(G::Collection, "find", "(find pred coll)", "First element the predicate holds for."),
    entry(G::Collection, "find-index", "(find-index pred coll)", "Index of the first element the predicate holds for."),
    entry(G::Collection, "some", "(some pred coll)", "First truthy result of the predicate."),
    entry(G::Collection, "count", "(count coll)", "Number of elements."),
    entry(G::Collection, "get", "(get ds k & [opt])", "Value at a key or index, or a default."),
    entry(G::Collection, "get-in", "(get-in ds ks & [opt])", "Value at a key path, or a default."),
    entry(G::Collection, "assoc", "(assoc ds key value)", "Collection with a key set to a value."),
    entry(G::Collection, "assoc-in", "(assoc-in ds [k & ks] v)", "Collection with a nested key path set to a value."),
    entry(G::Collection, "dissoc", "(dissoc ds key)", "Collection without a key."),
    entry(G::Collection, "dissoc-in", "(dissoc-in ds [k & ks])", "Collection without a nested key."),
    entry(G::Collection, "update", "(update ds k f & args)", "Collection with the value at a key transformed."),
    entry(G::Collection, "update-in", "(update-in ds [k & ks] f & args)", "Collection with a nested value transformed."),
    entry(G::Collection, "put", "(put ds key value)", "Collection with a key set to a value."),
    entry(G::Collection, "put-in", "(put-in ds ks v)", "Collection with a nested key path set to a value."),
    entry(G::Collection, "unset", "(unset ds key)", "Collection without a key."),
    entry(G::Collection, "unset-in", "(unset-in ds ks)", "Collection without a nested key."),
    entry(G::Collection, "keys", "(keys coll)", "Keys of an associative collection."),
    entry(G::Collection, "values", "(values coll)", "Values of an associative collection."),
    entry(G::Collection, "pairs", "(pairs coll)", "Key/value pairs of an associative collection."),
    entry(G::Collection, "kvs", "(kvs coll)", "Keys and values interleaved in one vector."),
    entry(G::Collection, "select-keys", "(select-keys m ks)", "Map restricted to the given keys."),
    entry(G::Collection, "merge", "(merge & maps)", "Merge maps; later keys win."),
    entry(G::Collection, "merge-with", "(merge-with f & hash-maps)", "Merge maps, combining clashing values with a function."),
    entry(G::Collection, "deep-merge", "(deep-merge & args)", "Recursively merge nested maps."),
    entry(G::Collection, "invert", "(invert map)", "Map with keys and values swapped."),
    entry(G::Collection, "zipmap", "(zipmap keys vals)", "Map from paired keys and values."),
    entry(G::Collection, "zipcoll", "(zipcoll a b)", "Map from paired keys and values."),
    entry(G::Collection, "split-at", "(split-at n coll)", "Pair of the first `n` elements and the rest."),
    entry(G::Collection, "split-with", "(split-with f coll)", "Pair of the leading run the predicate holds for and the rest."),
    entry(G::Collection, "shuffle", "(shuffle coll)", "Elements in random order."),
    entry(G::Collection, "slice", "(slice coll & [offset & [length]])", "Part of an indexed collection."),
    entry(G::Collection, "peek", "(peek coll)", "Last element of a vector."),
    entry(G::Collection, "pop", "(pop coll)", "Vector without its last element."),
    entry(G::Collection, "push", "(push coll x)", "Vector with an element appended."),
    entry(G::Collection, "range", "(range a & rest)", "Lazy sequence of numbers."),
    entry(G::Collection, "repeat", "(repeat a & rest)", "Sequence repeating a value."),
    entry(G::Collection, "repeatedly", "(repeatedly a & rest)", "Sequence of results of calling a function repeatedly."),
    entry(G::Collection, "iterate", "(iterate f x)", "Lazy sequence of `x`, `(f x)`, `(f (f x))`, ..."),
    entry(G::Collection, "cycle", "(cycle coll)", "Lazy infinite repetition of a collection."),
    entry(G::Collection, "union", "(union & sets)", "Union of sets."),
    entry(G::Collection, "intersection", "(intersection set & sets)", "Intersection of sets."),
    entry(G::Collection, "difference", "(difference set & sets)", "First set without the elements of the others."),
    entry(G::Collection, "symmetric-difference", "(symmetric-difference set & sets)", "Elements in exactly one of the sets."),
    entry(G::Collection, "doall", "(doall coll)", "Realize a lazy sequence and return it."),
    entry(G::Collection, "dorun", "(dorun coll)", "Realize a lazy sequence for side effects, returning nil."),
    entry(G::Collection, "lazy-seq", "(lazy-seq & body)", "Sequence whose body is evaluated on first access."),
    entry(G::Collection, "tree-seq", "(tree-seq branch? children root)", "Depth-first walk of a tree as a sequence."),
    // Core
    entry(G::Core, "str", "(str & args)", "Concatenate the string forms of the arguments."),
    entry(G::Core, "print", "(print & xs)", "Print the values."),
    entry(G::Core, "println", "(println & xs)", "Print the values followed by a newline."),
    entry(G::Core, "printf", "(printf fmt & xs)", "Print a formatted string."),
    entry(G::Core, "print-str", "(print-str & xs)", "Printed form of the values as a string."),
    entry(G::Core, "format", "(format fmt & xs)", "Format a string with placeholders."),
    entry(G::Core, "apply", "(apply f expr*)", "Call a function with arguments spread from a collection."),
    entry(G::Core, "identity", "(identity x)", "Return the argument unchanged."),
    entry(G::Core, "constantly", "(constantly x)", "Function that always returns `x`."),
    entry(G::Core, "comp", "(comp & fs)", "Compose functions right to left."),
    entry(G::Core, "complement", "(complement f)", "Function returning the negation of `f`."),
    entry(G::Core, "partial", "(partial f & args)", "Function with leading arguments fixed."),
    entry(G::Core, "type", "(type x)", "Keyword naming the type of a value."),
    entry(G::Core, "name", "(name x)", "Name part of a symbol or keyword."),
    entry(G::Core, "namespace", "(namespace x)", "Namespace part of a symbol or keyword."),
    entry(G::Core, "full-name", "(full-name x)", "Namespace-qualified name of a symbol or keyword."),
    entry(G::Core, "symbol", "(symbol name-or-ns & [name])", "Create a symbol."),
    entry(G::Core, "keyword", "(keyword x)", "Create a keyword."),
    entry(G::Core, "gensym", "(gensym)", "Fresh unique symbol."),
    entry(G::Core, "list", "(list & xs)", "Create a list."),
    entry(G::Core, "vector", "(vector & xs)", "Create a vector."),
    entry(G::Core, "hash-map", "(hash-map & xs)", "Create a map from key/value pairs."),
    entry(G::Core, "set", "(set & xs)", "Create a set."),
    entry(G::Core, "eval", "(eval form)", "Evaluate a form."),
    entry(G::Core, "compile", "(compile form)", "Compile a form to PHP code."),
    entry(G::Core, "read-string", "(read-string s)", "Read the first form of a string."),
    entry(G::Core, "deref", "(deref variable)", "Current value of a variable."),
    entry(G::Core, "set!", "(set! variable value)", "Set the value of a variable."),
    entry(G::Core, "swap!", "(swap! variable f & args)", "Replace a variable's value with `(f value args)`."),
    entry(G::Core, "slurp", "(slurp path & [opts])", "Read a whole file into a string."),
    entry(G::Core, "spit", "(spit filename data & [opts])", "Write a string to a file."),
    entry(G::Core, "transient", "(transient coll)", "Mutable copy of a persistent collection."),
    entry(G::Core, "persistent", "(persistent coll)", "Persistent copy of a transient collection."),
    entry(G::Core, "rand", "(rand)", "Random float between 0 and 1."),
    entry(G::Core, "rand-int", "(rand-int n)", "Random integer between 0 and `n`."),
    entry(G::Core, "rand-nth", "(rand-nth xs)", "Random element of a collection."),
    entry(G::Core, "sum", "(sum xs)", "Sum of the numbers in a collection."),
    entry(G::Core, "mean", "(mean xs)", "Arithmetic mean of the numbers in a collection."),
    entry(G::Core, "re-seq", "(re-seq re s)", "All matches of a regular expression."),
    entry(G::Core, "bit-and", "(bit-and x y & args)", "Bitwise and."),
    entry(G::Core, "bit-or", "(bit-or x y & args)", "Bitwise or."),
    entry(G::Core, "bit-xor", "(bit-xor x y & args)", "Bitwise exclusive or."),
    entry(G::Core, "bit-not", "(bit-not x)", "Bitwise complement."),
    entry(G::Core, "bit-shift-left", "(bit-shift-left x n)", "Shift bits left."),
    entry(G::Core, "bit-shift-right", "(bit-shift-right x n)", "Shift bits right."),
    entry(G::Core, "with-output-buffer", "(with-output-buffer & body)", "Capture everything printed by the body as a string."),
    entry(G::Core, "php->phel", "(php->phel x)", "Convert a PHP array into Phel data."),
    entry(G::Core, "phel->php", "(phel->php x)", "Convert Phel data into PHP arrays."),
    entry(G::Core, "to-php-array", "(to-php-array coll)", "Copy a collection into a PHP array."),
    entry(G::Core, "php-indexed-array", "(php-indexed-array & xs)", "Create a PHP indexed array."),
    entry(G::Core, "php-associative-array", "(php-associative-array & xs)", "Create a PHP associative array."),
    // String
    entry(G::String, "str/blank?", "(str/blank? s)", "True when the string is empty or whitespace."),
    entry(G::String, "str/capitalize", "(str/capitalize s)", "First character upper-cased, the rest lower-cased."),
    entry(G::String, "str/contains?", "(str/contains? s substr)", "True when the string contains `substr`."),
    entry(G::String, "str/ends-with?", "(str/ends-with? s substr)", "True when the string ends with `substr`."),
    entry(G::String, "str/starts-with?", "(str/starts-with? s substr)", "True when the string starts with `substr`."),
    entry(G::String, "str/escape", "(str/escape s cmap)", "Replace characters using a mapping."),
    entry(G::String, "str/index-of", "(str/index-of s value & [from-index])", "Position of the first occurrence of `value`."),
    entry(G::String, "str/last-index-of", "(str/last-index-of s value & [from-index])", "Position of the last occurrence of `value`."),
    entry(G::String, "str/join", "(str/join separator & [coll])", "Join the elements with a separator."),
    entry(G::String, "str/lower-case", "(str/lower-case s)", "String in lower case."),
    entry(G::String, "str/upper-case", "(str/upper-case s)", "String in upper case."),
    entry(G::String, "str/pad-left", "(str/pad-left s len & [pad-str])", "Pad the start of the string to a length."),
    entry(G::String, "str/pad-right", "(str/pad-right s len & [pad-str])", "Pad the end of the string to a length."),
    entry(G::String, "str/pad-both", "(str/pad-both s len & [pad-str])", "Pad both ends of the string to a length."),
    entry(G::String, "str/repeat", "(str/repeat s n)", "String repeated `n` times."),
    entry(G::String, "str/replace", "(str/replace s match replacement)", "Replace every occurrence of `match`."),
    entry(G::String, "str/replace-first", "(str/replace-first s match replacement)", "Replace the first occurrence of `match`."),
    entry(G::String, "str/reverse", "(str/reverse s)", "Characters in reverse order."),
    entry(G::String, "str/split", "(str/split s re & [limit])", "Split on a regular expression."),
    entry(G::String, "str/split-lines", "(str/split-lines s)", "Split into lines."),
    entry(G::String, "str/subs", "(str/subs s start & [end])", "Substring between two positions."),
    entry(G::String, "str/trim", "(str/trim s)", "Remove whitespace from both ends."),
    entry(G::String, "str/triml", "(str/triml s)", "Remove whitespace from the start."),
    entry(G::String, "str/trimr", "(str/trimr s)", "Remove whitespace from the end."),
    entry(G::String, "str/trim-newline", "(str/trim-newline s)", "Remove trailing newlines."),
    // JSON, Base64, HTML
    entry(G::Json, "json/encode", "(json/encode value & [opts])", "Encode a value as a JSON string."),
    entry(G::Json, "json/decode", "(json/decode json & [opts])", "Decode a JSON string."),
    entry(G::Base64, "base64/encode", "(base64/encode s)", "Encode a string as Base64."),
    entry(G::Base64, "base64/decode", "(base64/decode s & [strict?])", "Decode a Base64 string."),
    entry(G::Html, "html/html", "(html/html & content)", "Render data as an HTML string."),
    entry(G::Html, "html/doctype", "(html/doctype type)", "HTML doctype declaration."),
    // HTTP
    entry(G::Http, "http/request", "(http/request method uri headers parsed-body query-params cookie-params server-params uploaded-files version attributes)", "Create an HTTP request."),
    entry(G::Http, "http/request-from-globals", "(http/request-from-globals)", "Request built from the PHP superglobals."),
    entry(G::Http, "http/request-from-map", "(http/request-from-map m)", "Request built from a map."),
    entry(G::Http, "http/response", "(http/response status headers body version reason)", "Create an HTTP response."),
    entry(G::Http, "http/response-from-map", "(http/response-from-map m)", "Response built from a map."),
    entry(G::Http, "http/response-from-string", "(http/response-from-string s)", "Response with a string body."),
    entry(G::Http, "http/emit-response", "(http/emit-response response)", "Send a response to the client."),
    entry(G::Http, "http/uri", "(http/uri scheme userinfo host port path query fragment)", "Create a URI."),
    entry(G::Http, "http/uri-from-string", "(http/uri-from-string url)", "Parse a URI from a string."),
    entry(G::Http, "http/request?", "(http/request? x)", "True when the value is a request."),
    entry(G::Http, "http/response?", "(http/response? x)", "True when the value is a response."),
    // Test
    entry(G::Test, "test/deftest", "(test/deftest test-name & body)", "Define a test."),
    entry(G::Test, "test/is", "(test/is form & [message])", "Assert inside a test."),
    entry(G::Test, "test/run-tests", "(test/run-tests options & namespaces)", "Run the tests of the namespaces."),
    entry(G::Test, "test/print-summary", "(test/print-summary)", "Print the results of the last run."),
    entry(G::Test, "test/report", "(test/report data)", "Record a test result."),
    entry(G::Test, "test/successful?", "(test/successful?)", "True when the last run had no failures."),
    // Debug
    entry(G::Debug, "debug/dbg", "(debug/dbg expr)", "Print an expression with its value and return the value."),
    entry(G::Debug, "debug/spy", "(debug/spy expr)", "Print a value and return it."),
    entry(G::Debug, "debug/tap", "(debug/tap value)", "Pass a value to the tap handlers and return it."),
    entry(G::Debug, "debug/dotrace", "(debug/dotrace name f)", "Wrap a function so its calls are traced."),
    // REPL
    entry(G::Repl, "repl/doc", "(repl/doc sym)", "Print the documentation of a symbol."),
    entry(G::Repl, "repl/require", "(repl/require sym & args)", "Require a namespace in the REPL."),
    entry(G::Repl, "repl/use", "(repl/use sym & args)", "Import a PHP class in the REPL."),
    entry(G::Repl, "repl/resolve", "(repl/resolve sym)", "Resolve a symbol to its definition."),
    entry(G::Repl, "repl/compile-str", "(repl/compile-str s)", "Compile a string of Phel code."),
    entry(G::Repl, "repl/loaded-namespaces", "(repl/loaded-namespaces)", "Namespaces loaded in the REPL."),
    // PHP interop
    entry(G::PhpInterop, "php/new", "(php/new expr args*)", "Instantiate a PHP class."),
    entry(G::PhpInterop, "php/->", "(php/-> object call*)", "Call a method or read a property of a PHP object."),
    entry(G::PhpInterop, "php/::", "(php/:: class call*)", "Call a static method or read a static property."),
    entry(G::PhpInterop, "php/aget", "(php/aget arr index)", "Read an element of a PHP array."),
    entry(G::PhpInterop, "php/aget-in", "(php/aget-in arr ks)", "Read a nested element of a PHP array."),
    entry(G::PhpInterop, "php/aset", "(php/aset arr index value)", "Set an element of a PHP array."),
    entry(G::PhpInterop, "php/aset-in", "(php/aset-in arr ks value)", "Set a nested element of a PHP array."),
    entry(G::PhpInterop, "php/apush", "(php/apush arr value)", "Append to a PHP array."),
    entry(G::PhpInterop, "php/apush-in", "(php/apush-in arr ks value)", "Append to a nested PHP array."),
    entry(G::PhpInterop, "php/aunset", "(php/aunset arr index)", "Remove an element of a PHP array."),
    entry(G::PhpInterop, "php/aunset-in", "(php/aunset-in arr ks)", "Remove a nested element of a PHP array."),
    entry(G::PhpInterop, "php/oset", "(php/oset (php/-> object prop) val)", "Set a property of a PHP object."),
];

static BY_NAME: Lazy<FxHashMap<&'static str, &'static CatalogEntry>> =
    Lazy::new(|| CATALOG.iter().map(|entry| (entry.name, entry)).collect());

/// Catalog entry for a built-in name.
pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    BY_NAME.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_are_unique() {
        assert_eq!(BY_NAME.len(), CATALOG.len());
    }

    #[test]
    fn test_lookup() {
        let map = lookup("map").unwrap();
        assert_eq!(map.group, ApiGroup::Collection);
        assert_eq!(map.signature, "(map f & colls)");
        assert!(lookup("no-such-fn").is_none());
        assert!(lookup("str/join").unwrap().group.is_namespaced());
    }

    #[test]
    fn test_signature_parameters() {
        assert_eq!(signature_parameters("(filter pred coll)"), vec!["pred", "coll"]);
        assert_eq!(
            signature_parameters("(assoc-in ds [k & ks] v)"),
            vec!["ds", "[k & ks]", "v"]
        );
        assert!(signature_parameters("").is_empty());
        assert!(signature_parameters("(rand)").is_empty());
    }

    #[test]
    fn test_parameter_at_handles_rest_args() {
        let map = lookup("map").unwrap().signature;
        assert_eq!(parameter_at(map, 0), Some("f"));
        assert_eq!(parameter_at(map, 1), Some("colls"));
        assert_eq!(parameter_at(map, 5), Some("colls"));

        let filter = lookup("filter").unwrap().signature;
        assert_eq!(parameter_at(filter, 1), Some("coll"));
        assert_eq!(parameter_at(filter, 2), None);
    }

    #[test]
    fn test_template_item_is_snippet() {
        let candidate = Candidate::template(TemplateKind::Defn, Priority::ApiFunctions);
        assert_eq!(candidate.display_text, "(defn name [] ())");
        let item = candidate.to_completion_item(3);
        assert_eq!(item.kind, Some(CompletionItemKind::SNIPPET));
        assert_eq!(item.insert_text_format, Some(InsertTextFormat::SNIPPET));
        assert_eq!(item.sort_text.as_deref(), Some("0003"));
        assert_eq!(item.filter_text.as_deref(), Some("defn"));
    }

    #[test]
    fn test_catalog_item_carries_signature_and_docs() {
        let entry = lookup("str/join").unwrap();
        let item = Candidate::from_catalog(entry, Priority::StringFunctions).to_completion_item(0);
        assert_eq!(item.label, "str/join");
        assert_eq!(item.detail.as_deref(), Some("String Function"));
        assert_eq!(
            item.label_details.and_then(|d| d.description).as_deref(),
            Some("(str/join separator & [coll])")
        );
        assert!(item.documentation.is_some());
    }

    #[test]
    fn test_informational_inserts_nothing() {
        let candidate = Candidate::informational("Type a unique name...", "Definition name", Priority::CurrentScopeLocals);
        assert!(candidate.is_informational());
        assert_eq!(candidate.text, "");
        let item = candidate.to_completion_item(0);
        assert_eq!(item.insert_text.as_deref(), Some(""));
        assert_eq!(item.kind, Some(CompletionItemKind::TEXT));
    }
}
