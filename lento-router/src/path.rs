//! Path normalization and `{name}` placeholder templates.

use crate::error::TemplateError;
use fxhash::FxHashSet;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Normalizes a path to a single leading slash and no trailing slash. The root path normalizes to
/// `/`.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

/// Normalizes a controller prefix: empty prefixes stay empty, others get a single leading slash.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Joins a controller prefix with an action path template and normalizes the result.
pub fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

#[derive(Clone, Eq, PartialEq, Debug)]
enum Token {
    Literal(String),
    Placeholder(String),
}

fn tokenize(template: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut placeholder: Option<String> = None;
    let mut names = FxHashSet::default();

    for character in template.chars() {
        match (character, placeholder.as_mut()) {
            ('{', Some(_)) => return Err(TemplateError::Nested),
            ('{', None) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                placeholder = Some(String::new());
            }
            ('}', None) => return Err(TemplateError::Unopened),
            ('}', Some(name)) => {
                let name = std::mem::take(name);
                placeholder = None;

                if name.is_empty() {
                    return Err(TemplateError::EmptyName);
                }
                if !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(TemplateError::InvalidName(name));
                }
                if !names.insert(name.clone()) {
                    return Err(TemplateError::DuplicateName(name));
                }

                tokens.push(Token::Placeholder(name));
            }
            ('/', Some(_)) => return Err(TemplateError::Unclosed),
            (character, Some(name)) => name.push(character),
            (character, None) => literal.push(character),
        }
    }

    if placeholder.is_some() {
        return Err(TemplateError::Unclosed);
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    Ok(tokens)
}

/// Checks if a template contains placeholders, validating its syntax on the way.
pub fn is_dynamic(template: &str) -> Result<bool, TemplateError> {
    Ok(tokenize(template)?
        .iter()
        .any(|token| matches!(token, Token::Placeholder(_))))
}

/// Compiled dynamic path template. Each `{name}` matches a single, non-empty path segment run
/// (no `/`), while every other character must match literally.
///
/// Only the template is persisted - the regex is rebuilt when deserializing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RoutePattern {
    template: String,
    regex: Regex,
    captures: Vec<String>,
}

impl RoutePattern {
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        let tokens = tokenize(template)?;
        let mut pattern = String::from("^");
        let mut captures = Vec::new();

        for token in tokens {
            match token {
                Token::Literal(literal) => pattern.push_str(&regex::escape(&literal)),
                Token::Placeholder(name) => {
                    pattern.push_str("([^/]+)");
                    captures.push(name);
                }
            }
        }

        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|error| TemplateError::Regex(error.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            regex,
            captures,
        })
    }

    #[inline]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Capture names in placeholder order.
    #[inline]
    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    /// Matches given path, returning captured values paired with their names, in placeholder
    /// order.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let captured = self.regex.captures(path)?;
        Some(
            self.captures
                .iter()
                .enumerate()
                .filter_map(|(index, name)| {
                    captured
                        .get(index + 1)
                        .map(|value| (name.clone(), value.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template && self.captures == other.captures
    }
}

impl Eq for RoutePattern {}

impl From<RoutePattern> for String {
    fn from(value: RoutePattern) -> Self {
        value.template
    }
}

impl TryFrom<String> for RoutePattern {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::compile(&value)
    }
}
