//! Named-placeholder templates.
//!
//! A template is parsed once into literal and slot segments. Rendering takes
//! typed values: [`Value::Text`] is HTML-escaped, [`Value::Markup`] is
//! inserted verbatim. A slot without a value, or a value without a slot, is a
//! [`SwagError::Template`] error.

use crate::result::{SwagError, SwagResult};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

const PLACEHOLDER: &str = r"\{\{\s*([a-z_]+)\s*\}\}";

/// Escape text for HTML element content and quoted attributes
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// A value bound to a placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Plain text, escaped on render
    Text(String),
    /// Pre-rendered HTML, inserted as-is
    Markup(String),
}

impl Value {
    fn render(&self) -> String {
        match self {
            Self::Text(text) => escape_html(text),
            Self::Markup(html) => html.clone(),
        }
    }
}

/// Values for one render call
#[derive(Debug, Clone, Default)]
pub struct Values {
    map: BTreeMap<String, Value>,
}

impl Values {
    /// Empty value set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind escaped text
    #[must_use]
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.map.insert(name.to_string(), Value::Text(value.into()));
        self
    }

    /// Bind pre-rendered markup
    #[must_use]
    pub fn markup(mut self, name: &str, value: impl Into<String>) -> Self {
        self.map.insert(name.to_string(), Value::Markup(value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`; `name` is used in error messages
    pub fn parse(name: &str, source: &str) -> SwagResult<Self> {
        let re = Regex::new(PLACEHOLDER).map_err(|e| SwagError::Template {
            message: e.to_string(),
        })?;
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in re.captures_iter(source) {
            let (Some(whole), Some(slot)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Slot(slot.as_str().to_string()));
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            segments,
        })
    }

    /// Placeholder names used by the template
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Slot(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Fill every placeholder from `values`
    pub fn render(&self, values: &Values) -> SwagResult<String> {
        let used = self.placeholders();
        if let Some(extra) = values.map.keys().find(|k| !used.contains(k.as_str())) {
            return Err(SwagError::Template {
                message: format!("template {} has no placeholder {{{{{extra}}}}}", self.name),
            });
        }
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(name) => {
                    let value = values.map.get(name).ok_or_else(|| SwagError::Template {
                        message: format!("template {} is missing a value for {{{{{name}}}}}", self.name),
                    })?;
                    out.push_str(&value.render());
                }
            }
        }
        Ok(out)
    }
}

/// Parse and render in one step
pub fn render(name: &str, source: &str, values: &Values) -> SwagResult<String> {
    Template::parse(name, source)?.render(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_text_escaped_markup_verbatim() {
        let html = render(
            "t",
            "<p>{{ error }}</p>{{badge}}",
            &Values::new()
                .text("error", "2 < 3")
                .markup("badge", "<span>x</span>"),
        )
        .unwrap();
        assert_eq!(html, "<p>2 &lt; 3</p><span>x</span>");
    }

    #[test]
    fn test_repeated_placeholder() {
        let html = render("t", "{{aid}}-{{aid}}", &Values::new().text("aid", "3")).unwrap();
        assert_eq!(html, "3-3");
    }

    #[test]
    fn test_missing_value_is_error() {
        let err = render("card", "{{duration}}", &Values::new()).unwrap_err();
        assert!(err.to_string().contains("{{duration}}"));
        assert!(err.to_string().contains("card"));
    }

    #[test]
    fn test_unknown_value_is_error() {
        let err = render("card", "static", &Values::new().text("url", "x")).unwrap_err();
        assert!(matches!(err, SwagError::Template { .. }));
    }

    #[test]
    fn test_single_braces_untouched() {
        let source = "function show(id) { return {a: 1}; }";
        assert_eq!(render("js", source, &Values::new()).unwrap(), source);
    }

    #[test]
    fn test_placeholders_listed() {
        let t = Template::parse("t", "{{a}} {{b}} {{a}}").unwrap();
        assert_eq!(t.placeholders().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
