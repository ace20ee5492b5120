//! Minimal HTML form extraction.
//!
//! Login and consent pages are server-rendered forms. This module pulls out
//! `<form>` elements with their `<input>` and `<button>` controls, which is
//! all a session needs to submit them. It is not an HTML parser: markup is
//! matched with regular expressions and scripts are never run.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

static FORM: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<form\b([^>]*)>(.*?)</form\s*>"));
static CONTROL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?is)<input\b([^>]*?)/?>|<button\b([^>]*)>(.*?)</button\s*>")
});
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
});
static TITLE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?is)<title[^>]*>(.*?)</title\s*>"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<[^>]*>"));
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[A-Za-z]+);"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

/// HTTP method of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    /// Fields are sent in the query string.
    Get,
    /// Fields are sent as `application/x-www-form-urlencoded` body.
    Post,
}

/// Kind of a form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `<input type="hidden">`.
    Hidden,
    /// Text-like inputs (`text`, `email`, ...).
    Text,
    /// `<input type="password">`.
    Password,
    /// `<input type="checkbox">`.
    Checkbox {
        /// Pre-checked in the markup.
        checked: bool,
    },
    /// `<input type="radio">`. At most one per name is submitted.
    Radio {
        /// Pre-checked in the markup.
        checked: bool,
    },
    /// Submit buttons (`<button>`, `type="submit"`).
    Submit,
}

/// A named form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Control name.
    pub name: String,
    /// Control value as rendered (entity-decoded).
    pub value: String,
    /// Control kind.
    pub kind: FieldKind,
}

/// A form found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    /// Absolute submission URL.
    pub action: Url,
    /// Submission method.
    pub method: FormMethod,
    /// Named controls in document order.
    pub fields: Vec<Field>,
}

impl Form {
    /// Returns whether a control named `name` exists.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Returns whether a submit control named `name` exists.
    #[must_use]
    pub fn has_submit(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.name == name && f.kind == FieldKind::Submit)
    }

    /// Values the form would submit untouched.
    ///
    /// Submit controls and unchecked boxes are left out, the way a browser
    /// does when no button is pressed.
    #[must_use]
    pub fn values(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter(|f| match f.kind {
                FieldKind::Submit
                | FieldKind::Checkbox { checked: false }
                | FieldKind::Radio { checked: false } => false,
                FieldKind::Hidden
                | FieldKind::Text
                | FieldKind::Password
                | FieldKind::Checkbox { checked: true }
                | FieldKind::Radio { checked: true } => true,
            })
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }

    /// Values with every checkbox checked.
    ///
    /// Radio groups keep their checked option, or their first one when the
    /// markup checks none.
    #[must_use]
    pub fn values_all_checked(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(index, f)| match f.kind {
                FieldKind::Submit => false,
                FieldKind::Radio { .. } => self.chosen_radio(&f.name) == Some(*index),
                FieldKind::Hidden
                | FieldKind::Text
                | FieldKind::Password
                | FieldKind::Checkbox { .. } => true,
            })
            .map(|(_, f)| (f.name.clone(), f.value.clone()))
            .collect()
    }

    fn chosen_radio(&self, name: &str) -> Option<usize> {
        let mut group = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name == name && matches!(f.kind, FieldKind::Radio { .. }));
        let first = group.clone().next().map(|(index, _)| index);
        group
            .find(|(_, f)| f.kind == FieldKind::Radio { checked: true })
            .map(|(index, _)| index)
            .or(first)
    }
}

/// Replaces the first `name` entry in `values`, appending when absent.
pub fn set_value(values: &mut Vec<(String, String)>, name: &str, value: &str) {
    match values.iter_mut().find(|(n, _)| n == name) {
        Some(entry) => value.clone_into(&mut entry.1),
        None => values.push((name.to_string(), value.to_string())),
    }
}

/// Extracts every form of `html`, resolving actions against `base`.
///
/// Forms whose action cannot be resolved are skipped.
#[must_use]
pub fn parse_forms(html: &str, base: &Url) -> Vec<Form> {
    FORM.captures_iter(html)
        .filter_map(|form| {
            let attrs = attributes(&form[1]);
            let action = match attr(&attrs, "action").filter(|a| !a.is_empty()) {
                Some(action) => base.join(action).ok()?,
                None => base.clone(),
            };
            let method = match attr(&attrs, "method") {
                Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
                _ => FormMethod::Get,
            };
            let fields = CONTROL.captures_iter(&form[2]).filter_map(|c| field(&c)).collect();
            Some(Form {
                action,
                method,
                fields,
            })
        })
        .collect()
}

fn field(control: &Captures<'_>) -> Option<Field> {
    if let Some(input) = control.get(1) {
        let attrs = attributes(input.as_str());
        let name = attr(&attrs, "name").filter(|n| !n.is_empty())?.to_string();
        let value = attr(&attrs, "value").unwrap_or_default().to_string();
        let kind = match attr(&attrs, "type").map(str::to_ascii_lowercase).as_deref() {
            Some("hidden") => FieldKind::Hidden,
            Some("password") => FieldKind::Password,
            Some("checkbox") => FieldKind::Checkbox {
                checked: attrs.iter().any(|(n, _)| n == "checked"),
            },
            Some("radio") => FieldKind::Radio {
                checked: attrs.iter().any(|(n, _)| n == "checked"),
            },
            Some("submit" | "image") => FieldKind::Submit,
            Some("button" | "reset" | "file") => return None,
            _ => FieldKind::Text,
        };
        let checkable = matches!(kind, FieldKind::Checkbox { .. } | FieldKind::Radio { .. });
        let value = if value.is_empty() && checkable {
            "on".to_string()
        } else {
            value
        };
        return Some(Field { name, value, kind });
    }

    let attrs = attributes(control.get(2)?.as_str());
    let name = attr(&attrs, "name").filter(|n| !n.is_empty())?.to_string();
    match attr(&attrs, "type").map(str::to_ascii_lowercase).as_deref() {
        None | Some("submit") => Some(Field {
            name,
            value: attr(&attrs, "value").unwrap_or_default().to_string(),
            kind: FieldKind::Submit,
        }),
        Some(_) => None,
    }
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(tag)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map_or("", |m| m.as_str());
            (c[1].to_ascii_lowercase(), decode_entities(value))
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// Returns the decoded `<title>` of a page.
#[must_use]
pub fn title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .map(|c| collapse(&decode_entities(&c[1])))
}

/// Visible text of a page with tags, scripts and styles removed.
#[must_use]
pub fn text_content(html: &str) -> String {
    collapse(&decode_entities(&TAG.replace_all(html, " ")))
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Decodes character references (`&amp;`, `&#39;`, `&#x2F;`, ...).
///
/// Unknown named references are left as written.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY
        .replace_all(text, |c: &Captures<'_>| {
            let reference = &c[1];
            let decoded = if let Some(hex) = reference
                .strip_prefix("#x")
                .or_else(|| reference.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = reference.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                match reference {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| c[0].to_string(), String::from)
        })
        .into_owned()
}
