use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace, warn};

/// How a variable reference is expanded.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Expansion {
    /// `$(NAME)`: looked up when the emitted code runs.
    Recursive,
    /// `${NAME}`: as `Recursive`, with trailing slashes removed.
    RecursiveStripSlash,
    /// `$[NAME]`: substituted while transpiling.
    Immediate,
}

/// A piece of a bmake value: literal text or a variable reference.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    Literal(String),
    Reference { name: String, expansion: Expansion },
}

impl Fragment {
    pub fn literal<T: Into<String>>(text: T) -> Self {
        Self::Literal(text.into())
    }

    pub fn reference<T: Into<String>>(name: T, expansion: Expansion) -> Self {
        Self::Reference {
            name: name.into(),
            expansion,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits bmake text into literal runs and `$( )`, `${ }`, `$[ ]` references.
///
/// `$$` is a literal dollar sign. Anything that does not form a well-formed
/// reference stays literal.
pub fn split_references(text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(dollar) = rest.find('$') {
        let (before, after) = rest.split_at(dollar);
        literal.push_str(before);
        let after = &after[1..];

        let (close, expansion) = match after.chars().next() {
            Some('$') => {
                literal.push('$');
                rest = &after[1..];
                continue;
            }
            Some('(') => (')', Expansion::Recursive),
            Some('{') => ('}', Expansion::RecursiveStripSlash),
            Some('[') => (']', Expansion::Immediate),
            _ => {
                literal.push('$');
                rest = after;
                continue;
            }
        };

        match after[1..].find(close) {
            Some(end) if is_identifier(after[1..1 + end].trim()) => {
                if !literal.is_empty() {
                    fragments.push(Fragment::Literal(std::mem::take(&mut literal)));
                }
                fragments.push(Fragment::reference(after[1..1 + end].trim(), expansion));
                rest = &after[end + 2..];
            }
            _ => {
                literal.push('$');
                rest = after;
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        fragments.push(Fragment::Literal(literal));
    }
    fragments
}

/// Writes fragments back as bmake text, the inverse of [`split_references`].
pub fn to_source(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Literal(text) => out.push_str(&text.replace('$', "$$")),
            Fragment::Reference { name, expansion } => {
                let (open, close) = match expansion {
                    Expansion::Recursive => ("$(", ")"),
                    Expansion::RecursiveStripSlash => ("${", "}"),
                    Expansion::Immediate => ("$[", "]"),
                };
                out.push_str(open);
                out.push_str(name);
                out.push_str(close);
            }
        }
    }
    out
}

/// The variable store of a single render pass.
///
/// Values are kept in bmake form: immediate expansions have already been
/// substituted while deferred references are stored as written. Besides the
/// live values the environment remembers every name that was ever bound, so
/// the emitted program can declare them all.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Environment {
    values: BTreeMap<String, String>,
    bound: BTreeSet<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<&str> {
        self.values.get(name.as_ref()).map(String::as_str)
    }

    pub fn contains<T: AsRef<str>>(&self, name: T) -> bool {
        self.values.contains_key(name.as_ref())
    }

    /// Binds `name`, returning the value it replaced.
    pub fn assign<N: AsRef<str>, V: Into<String>>(&mut self, name: N, value: V) -> Option<String> {
        let name = name.as_ref();
        let value = value.into();
        trace!("{} = {:?}", name, value);
        self.bound.insert(name.to_string());
        self.values.insert(name.to_string(), value)
    }

    /// Appends to `name`, binding it when absent.
    ///
    /// `separator` is only inserted between two non-empty values.
    pub fn append<N: AsRef<str>>(&mut self, name: N, value: &str, separator: &str) -> &str {
        let name = name.as_ref();
        self.bound.insert(name.to_string());
        let slot = self.values.entry(name.to_string()).or_default();
        if !slot.is_empty() && !value.is_empty() {
            slot.push_str(separator);
        }
        slot.push_str(value);
        trace!("{} += {:?} -> {:?}", name, value, slot);
        slot
    }

    pub fn undefine<T: AsRef<str>>(&mut self, name: T) -> Option<String> {
        let name = name.as_ref();
        self.bound.insert(name.to_string());
        self.values.remove(name)
    }

    /// Every name bound during the pass, including undefined ones.
    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        self.bound.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fully expands `name`, following deferred references.
    ///
    /// Returns `None` when `name` is not bound. Unbound references expand to
    /// nothing, and so does a variable that refers back to itself.
    pub fn resolve<T: AsRef<str>>(&self, name: T) -> Option<String> {
        let name = name.as_ref();
        if !self.contains(name) {
            return None;
        }
        let mut out = String::new();
        let mut active = Vec::new();
        self.resolve_into(name, &mut out, &mut active);
        Some(out)
    }

    fn resolve_into<'e>(&'e self, name: &'e str, out: &mut String, active: &mut Vec<&'e str>) {
        if active.contains(&name) {
            warn!("variable '{}' refers to itself; expanding to nothing", name);
            return;
        }
        let Some(value) = self.values.get(name) else {
            debug!("'{}' is not bound; expanding to nothing", name);
            return;
        };

        active.push(name);
        for fragment in split_references(value) {
            match fragment {
                Fragment::Literal(text) => out.push_str(&text),
                Fragment::Reference { name, expansion } => {
                    let start = out.len();
                    // `name` is owned by the fragment, look it up again to
                    // borrow from the environment.
                    if let Some((key, _)) = self.values.get_key_value(name.as_str()) {
                        self.resolve_into(key, out, active);
                    } else {
                        debug!("'{}' is not bound; expanding to nothing", name);
                    }
                    if expansion == Expansion::RecursiveStripSlash {
                        while out.len() > start && out.ends_with('/') {
                            out.pop();
                        }
                    }
                }
            }
        }
        active.pop();
    }
}
