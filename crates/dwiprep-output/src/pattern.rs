//! Entity-substitution path patterns.
//!
//! A pattern is literal text with `{entity}` placeholders. Text inside
//! `[...]` is optional: it is rendered only when every placeholder it holds
//! has a value, and dropped as a whole (delimiters included) otherwise.
//!
//! ```text
//! sub-{subject}[_ses-{session}]_{suffix}.{extension}
//!   {subject: 01, suffix: dwi, extension: nii.gz}              -> sub-01_dwi.nii.gz
//!   {subject: 01, session: 1, suffix: dwi, extension: nii.gz}  -> sub-01_ses-1_dwi.nii.gz
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use dwiprep_model::{EntityKey, EntityRecord};

use crate::error::{PathBuildError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Placeholder(EntityKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Required(Token),
    Optional(Vec<Token>),
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| PathBuildError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut optional: Option<Vec<Token>> = None;
        let mut literal = String::new();
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '[' => {
                    if optional.is_some() {
                        return Err(invalid("nested optional segment"));
                    }
                    flush(&mut literal, &mut optional, &mut segments);
                    optional = Some(Vec::new());
                }
                ']' => {
                    flush(&mut literal, &mut optional, &mut segments);
                    let tokens = optional.take().ok_or_else(|| invalid("unmatched ']'"))?;
                    if !tokens.iter().any(|token| matches!(token, Token::Placeholder(_))) {
                        return Err(invalid("optional segment without placeholder"));
                    }
                    segments.push(Segment::Optional(tokens));
                }
                '{' => {
                    flush(&mut literal, &mut optional, &mut segments);
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(invalid("unterminated placeholder"));
                    }
                    let key = name
                        .parse::<EntityKey>()
                        .map_err(|_| invalid(&format!("unknown placeholder '{name}'")))?;
                    push(Token::Placeholder(key), &mut optional, &mut segments);
                }
                '}' => return Err(invalid("unmatched '}'")),
                c => literal.push(c),
            }
        }
        if optional.is_some() {
            return Err(invalid("unterminated optional segment"));
        }
        flush(&mut literal, &mut optional, &mut segments);

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholders that must have a value for rendering to succeed.
    pub fn required(&self) -> BTreeSet<EntityKey> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Required(Token::Placeholder(key)) => Some(*key),
                _ => None,
            })
            .collect()
    }

    /// Every placeholder the pattern references.
    pub fn placeholders(&self) -> BTreeSet<EntityKey> {
        let mut keys = self.required();
        for segment in &self.segments {
            if let Segment::Optional(tokens) = segment {
                keys.extend(tokens.iter().filter_map(|token| match token {
                    Token::Placeholder(key) => Some(*key),
                    Token::Literal(_) => None,
                }));
            }
        }
        keys
    }

    /// Substitute `entities` into the pattern. Keys the pattern does not use are ignored.
    pub fn render(&self, entities: &EntityRecord) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Required(Token::Literal(text)) => out.push_str(text),
                Segment::Required(Token::Placeholder(key)) => {
                    let value = lookup(entities, *key)?.ok_or_else(|| {
                        PathBuildError::MissingEntity {
                            entity: *key,
                            pattern: self.source.clone(),
                        }
                    })?;
                    out.push_str(value);
                }
                Segment::Optional(tokens) => {
                    let mut rendered = String::new();
                    let mut complete = true;
                    for token in tokens {
                        match token {
                            Token::Literal(text) => rendered.push_str(text),
                            Token::Placeholder(key) => match lookup(entities, *key)? {
                                Some(value) => rendered.push_str(value),
                                None => {
                                    complete = false;
                                    break;
                                }
                            },
                        }
                    }
                    if complete {
                        out.push_str(&rendered);
                    }
                }
            }
        }
        Ok(out)
    }
}

impl FromStr for PathPattern {
    type Err = PathBuildError;

    fn from_str(s: &str) -> Result<Self> {
        PathPattern::parse(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn lookup(entities: &EntityRecord, key: EntityKey) -> Result<Option<&str>> {
    match entities.get(key) {
        None | Some("") => Ok(None),
        Some(value) if value.contains(['/', '\\']) || value.contains("..") => {
            Err(PathBuildError::InvalidEntityValue {
                entity: key,
                value: value.to_string(),
            })
        }
        Some(value) => Ok(Some(value)),
    }
}

fn push(token: Token, optional: &mut Option<Vec<Token>>, segments: &mut Vec<Segment>) {
    match optional {
        Some(tokens) => tokens.push(token),
        None => segments.push(Segment::Required(token)),
    }
}

fn flush(literal: &mut String, optional: &mut Option<Vec<Token>>, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        push(Token::Literal(std::mem::take(literal)), optional, segments);
    }
}
