//! Safe-markup values returned by partial rendering.

use std::fmt;

use minijinja::Value;

/// Rendered HTML the template engine must not escape again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Markup(String);

impl Markup {
    /// Trust `html` as already-safe markup.
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    /// The markup text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Markup {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Markup> for Value {
    fn from(markup: Markup) -> Self {
        Value::from_safe_string(markup.0)
    }
}

/// Result of rendering a partial.
///
/// Both variants hold the same characters; they differ only in whether the
/// engine's auto-escaping applies when the value is interpolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partial {
    /// Safe markup, inserted verbatim.
    Markup(Markup),
    /// Plain string, escaped by auto-escaping templates.
    Plain(String),
}

impl Partial {
    /// Wrap `html` according to the markup flag.
    pub fn new(html: String, markup: bool) -> Self {
        if markup {
            Self::Markup(Markup(html))
        } else {
            Self::Plain(html)
        }
    }

    /// Whether the text is spliced unescaped.
    pub fn is_markup(&self) -> bool {
        matches!(self, Self::Markup(_))
    }

    /// The rendered text, whichever variant.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Markup(m) => m.as_str(),
            Self::Plain(s) => s,
        }
    }

    /// Take the text.
    pub fn into_string(self) -> String {
        match self {
            Self::Markup(m) => m.into_string(),
            Self::Plain(s) => s,
        }
    }
}

impl fmt::Display for Partial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Partial {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<&str> for Partial {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl From<Partial> for Value {
    fn from(partial: Partial) -> Self {
        match partial {
            Partial::Markup(m) => m.into(),
            Partial::Plain(s) => Value::from(s),
        }
    }
}
