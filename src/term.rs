use std::fmt;

/// A literal that can be stored as a fact argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Text literal (e.g. `"denethor"`, `"'Gandalf'"`, `"X"`)
    Text(String),
    /// Integer literal
    Integer(i64),
    /// Boolean literal
    Boolean(bool),
}

impl Value {
    /// Returns the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Integer(_) | Self::Boolean(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Lexical category of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// A constant.
    Atom,
    /// A placeholder reported back in bindings.
    NamedVariable,
    /// `_` or `?`: matches anything, never reported.
    AnonymousVariable,
}

/// Classifies a value by the lexical conventions of goals:
///
/// - non-text values are always atoms
/// - `_` and `?` alone are anonymous variables
/// - `'quoted'` text is an atom, whatever its case
/// - text starting with `_` or `?`, or in title/upper case, is a named variable
/// - anything else is an atom
#[must_use]
pub fn classify(value: &Value) -> TermKind {
    let Some(text) = value.as_text() else {
        return TermKind::Atom;
    };

    if text == "_" || text == "?" {
        TermKind::AnonymousVariable
    } else if is_quoted(text) {
        TermKind::Atom
    } else if text.starts_with('_')
        || text.starts_with('?')
        || is_title_case(text)
        || is_upper_case(text)
    {
        TermKind::NamedVariable
    } else {
        TermKind::Atom
    }
}

fn is_quoted(text: &str) -> bool {
    text.starts_with('\'') && text.ends_with('\'')
}

/// Every cased run starts with an uppercase letter followed only by
/// lowercase ones, and at least one cased letter exists.
fn is_title_case(text: &str) -> bool {
    let mut seen_cased = false;
    let mut previous_cased = false;

    for c in text.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            seen_cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            seen_cased = true;
        } else {
            previous_cased = false;
        }
    }

    seen_cased
}

/// No lowercase letters and at least one uppercase letter.
fn is_upper_case(text: &str) -> bool {
    let mut seen_upper = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        seen_upper |= c.is_uppercase();
    }
    seen_upper
}

/// A classified goal argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Term {
    /// A constant (e.g. `denethor`, `'Gandalf'`, `42`)
    Atom(Value),
    /// A variable whose matches are reported (e.g. `X`, `_Who`, `?child`)
    Variable(String),
    /// The anonymous variable `_` / `?`
    Anonymous,
}

impl Term {
    /// Classifies `value` once and wraps it in the matching variant.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match classify(&value) {
            TermKind::Atom => Self::Atom(value),
            TermKind::AnonymousVariable => Self::Anonymous,
            TermKind::NamedVariable => match value {
                Value::Text(name) => Self::Variable(name),
                // only text is ever classified as a variable
                other => Self::Atom(other),
            },
        }
    }

    /// Returns the kind of this term.
    #[must_use]
    pub fn kind(&self) -> TermKind {
        match self {
            Self::Atom(_) => TermKind::Atom,
            Self::Variable(_) => TermKind::NamedVariable,
            Self::Anonymous => TermKind::AnonymousVariable,
        }
    }

    /// True for named and anonymous variables.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        !matches!(self, Self::Atom(_))
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<&str> for Term {
    fn from(text: &str) -> Self {
        Self::from_value(Value::from(text))
    }
}

impl From<String> for Term {
    fn from(text: String) -> Self {
        Self::from_value(Value::Text(text))
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Self {
        Self::Atom(Value::Integer(n))
    }
}

impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Self::Atom(Value::Boolean(b))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(value) => value.fmt(f),
            Self::Variable(name) => f.write_str(name),
            Self::Anonymous => f.write_str("_"),
        }
    }
}
