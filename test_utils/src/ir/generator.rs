//! Module for generating random Phel code for property-based testing.
//!
//! `PhelForm` covers the reader-level shapes of the language (atoms, the four
//! collection kinds, short functions, reader prefixes, `#_` markers) plus the
//! binder forms the completion engine inspects (`defn`, `let`, `fn`, `loop`).
//!
//! Generation functions take a depth parameter that bounds recursion.
//! `TruncatedSource` cuts a rendered program at an arbitrary character so
//! tests see the unbalanced text of a file that is still being typed.

use quickcheck::{Arbitrary, Gen};
use std::fmt;

const MAX_DEPTH: usize = 6;

/// Binder and definition heads, avoided for generated plain symbols.
const RESERVED: &[&str] = &[
    "def", "defn", "defmacro", "fn", "let", "loop", "for", "ns", "if", "do",
];

/// A Phel form.
#[derive(Clone, Debug)]
pub enum PhelForm {
    Symbol(String),
    Keyword(String),
    Int(i64),
    Str(String),
    Nil,
    Bool(bool),
    List(Vec<PhelForm>),
    Vector(Vec<PhelForm>),
    Map(Vec<(PhelForm, PhelForm)>),
    Set(Vec<PhelForm>),
    ShortFn(Vec<PhelForm>),
    Quote(Box<PhelForm>),
    /// `#_` followed by the deactivated form
    Discard(Box<PhelForm>),
    Defn {
        name: String,
        params: Vec<String>,
        body: Vec<PhelForm>,
    },
    Let {
        bindings: Vec<(String, PhelForm)>,
        body: Vec<PhelForm>,
    },
    Fn {
        params: Vec<String>,
        body: Vec<PhelForm>,
    },
    Loop {
        bindings: Vec<(String, PhelForm)>,
        body: Vec<PhelForm>,
    },
}

/// A whole program: a namespace declaration followed by top-level forms.
#[derive(Clone, Debug)]
pub struct PhelProgram {
    pub namespace: String,
    pub forms: Vec<PhelForm>,
}

/// A rendered program cut at an arbitrary character boundary.
#[derive(Clone, Debug)]
pub struct TruncatedSource(pub String);

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_bindings(f: &mut fmt::Formatter<'_>, bindings: &[(String, PhelForm)]) -> fmt::Result {
    write!(f, "[")?;
    for (i, (name, value)) in bindings.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{} {}", name, value)?;
    }
    write!(f, "]")
}

impl fmt::Display for PhelForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhelForm::Symbol(name) => write!(f, "{}", name),
            PhelForm::Keyword(name) => write!(f, ":{}", name),
            PhelForm::Int(value) => write!(f, "{}", value),
            PhelForm::Str(text) => write!(f, "\"{}\"", text),
            PhelForm::Nil => write!(f, "nil"),
            PhelForm::Bool(value) => write!(f, "{}", value),
            PhelForm::List(items) => {
                write!(f, "(")?;
                join(f, items)?;
                write!(f, ")")
            }
            PhelForm::Vector(items) => {
                write!(f, "[")?;
                join(f, items)?;
                write!(f, "]")
            }
            PhelForm::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{} {}", key, value)?;
                }
                write!(f, "}}")
            }
            PhelForm::Set(items) => {
                write!(f, "#{{")?;
                join(f, items)?;
                write!(f, "}}")
            }
            PhelForm::ShortFn(items) => {
                write!(f, "|(")?;
                join(f, items)?;
                write!(f, ")")
            }
            PhelForm::Quote(form) => write!(f, "'{}", form),
            PhelForm::Discard(form) => write!(f, "#_{}", form),
            PhelForm::Defn { name, params, body } => {
                write!(f, "(defn {} [", name)?;
                join(f, params)?;
                write!(f, "] ")?;
                join(f, body)?;
                write!(f, ")")
            }
            PhelForm::Let { bindings, body } => {
                write!(f, "(let ")?;
                write_bindings(f, bindings)?;
                write!(f, " ")?;
                join(f, body)?;
                write!(f, ")")
            }
            PhelForm::Fn { params, body } => {
                write!(f, "(fn [")?;
                join(f, params)?;
                write!(f, "] ")?;
                join(f, body)?;
                write!(f, ")")
            }
            PhelForm::Loop { bindings, body } => {
                write!(f, "(loop ")?;
                write_bindings(f, bindings)?;
                write!(f, " ")?;
                join(f, body)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for PhelProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "(ns {})", self.namespace)?;
        for form in &self.forms {
            writeln!(f, "{}", form)?;
        }
        Ok(())
    }
}

/// Generates a random number in the range [min, max] inclusive.
fn gen_range(g: &mut Gen, min: u32, max: u32) -> u32 {
    min + (u32::arbitrary(g) % (max - min + 1))
}

fn pick<'a>(g: &mut Gen, choices: &'a [&'a str]) -> &'a str {
    let index = gen_range(g, 0, choices.len() as u32 - 1) as usize;
    choices[index]
}

/// Generates a symbol name that is not a binder head.
fn gen_name(g: &mut Gen) -> String {
    const STARTERS: &[char] = &['a', 'b', 'c', 'f', 'k', 'm', 'n', 's', 'x', 'y'];
    const CONTINUERS: &[char] = &['a', 'e', 'i', 'o', 'r', 't', '-', '?', '!', '1'];
    loop {
        let len = gen_range(g, 1, 8);
        let mut name = String::new();
        name.push(STARTERS[gen_range(g, 0, STARTERS.len() as u32 - 1) as usize]);
        for _ in 1..len {
            name.push(CONTINUERS[gen_range(g, 0, CONTINUERS.len() as u32 - 1) as usize]);
        }
        if !RESERVED.contains(&name.as_str()) {
            return name;
        }
    }
}

fn gen_names(g: &mut Gen, max: u32) -> Vec<String> {
    (0..gen_range(g, 0, max)).map(|_| gen_name(g)).collect()
}

fn gen_string_content(g: &mut Gen) -> String {
    let len = gen_range(g, 0, 6);
    (0..len)
        .map(|_| {
            let mut c = char::arbitrary(g);
            while c.is_control() || c == '"' || c == '\\' {
                c = char::arbitrary(g);
            }
            c
        })
        .collect()
}

fn gen_atom(g: &mut Gen) -> PhelForm {
    match pick(g, &["symbol", "keyword", "int", "string", "nil", "bool"]) {
        "symbol" => PhelForm::Symbol(gen_name(g)),
        "keyword" => PhelForm::Keyword(gen_name(g)),
        "int" => PhelForm::Int(i64::arbitrary(g) % 1000),
        "string" => PhelForm::Str(gen_string_content(g)),
        "nil" => PhelForm::Nil,
        _ => PhelForm::Bool(bool::arbitrary(g)),
    }
}

fn gen_forms(g: &mut Gen, depth: usize, max: u32) -> Vec<PhelForm> {
    (0..gen_range(g, 0, max)).map(|_| gen_form(g, depth)).collect()
}

fn gen_bindings(g: &mut Gen, depth: usize) -> Vec<(String, PhelForm)> {
    (0..gen_range(g, 0, 3))
        .map(|_| (gen_name(g), gen_form(g, depth)))
        .collect()
}

/// Generates a random form, falling back to atoms once `depth` is spent.
pub fn gen_form(g: &mut Gen, depth: usize) -> PhelForm {
    let depth = depth.min(MAX_DEPTH);
    if depth == 0 {
        return gen_atom(g);
    }
    let next = depth - 1;
    const CHOICES: &[&str] = &[
        "atom", "atom", "call", "vector", "map", "set", "short_fn", "quote", "discard", "defn",
        "let", "fn", "loop",
    ];
    match pick(g, CHOICES) {
        "call" => {
            let mut items = vec![PhelForm::Symbol(gen_name(g))];
            items.extend(gen_forms(g, next, 3));
            PhelForm::List(items)
        }
        "vector" => PhelForm::Vector(gen_forms(g, next, 4)),
        "map" => PhelForm::Map(
            (0..gen_range(g, 0, 3))
                .map(|_| (PhelForm::Keyword(gen_name(g)), gen_form(g, next)))
                .collect(),
        ),
        "set" => PhelForm::Set(gen_forms(g, next, 3)),
        "short_fn" => {
            let mut items = vec![PhelForm::Symbol(gen_name(g))];
            items.push(PhelForm::Symbol("$".to_string()));
            PhelForm::ShortFn(items)
        }
        "quote" => PhelForm::Quote(Box::new(gen_form(g, next))),
        "discard" => PhelForm::Discard(Box::new(gen_form(g, next))),
        "defn" => PhelForm::Defn {
            name: gen_name(g),
            params: gen_names(g, 3),
            body: gen_forms(g, next, 2),
        },
        "let" => PhelForm::Let {
            bindings: gen_bindings(g, next),
            body: gen_forms(g, next, 2),
        },
        "fn" => PhelForm::Fn {
            params: gen_names(g, 2),
            body: gen_forms(g, next, 2),
        },
        "loop" => PhelForm::Loop {
            bindings: gen_bindings(g, next),
            body: gen_forms(g, next, 2),
        },
        _ => gen_atom(g),
    }
}

impl Arbitrary for PhelForm {
    fn arbitrary(g: &mut Gen) -> Self {
        gen_form(g, g.size().min(MAX_DEPTH))
    }
}

impl Arbitrary for PhelProgram {
    fn arbitrary(g: &mut Gen) -> Self {
        let segments = gen_range(g, 1, 3);
        let namespace = (0..segments)
            .map(|_| gen_name(g).replace(['?', '!'], ""))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("\\");
        let namespace = if namespace.is_empty() { "app".to_string() } else { namespace };
        let depth = g.size().min(MAX_DEPTH);
        PhelProgram {
            namespace,
            forms: (0..gen_range(g, 0, 4)).map(|_| gen_form(g, depth)).collect(),
        }
    }
}

impl Arbitrary for TruncatedSource {
    fn arbitrary(g: &mut Gen) -> Self {
        let text = PhelProgram::arbitrary(g).to_string();
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let cut = boundaries[gen_range(g, 0, boundaries.len() as u32 - 1) as usize];
        TruncatedSource(text[..cut].to_string())
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let text = self.0.clone();
        let shorter: Vec<TruncatedSource> = text
            .char_indices()
            .rev()
            .take(8)
            .map(|(i, _)| TruncatedSource(text[..i].to_string()))
            .collect();
        Box::new(shorter.into_iter())
    }
}
