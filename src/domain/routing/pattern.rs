//! Topic-exchange routing patterns.
//!
//! Patterns and routing keys are dot-separated words. In a pattern `*`
//! stands for exactly one word and `#` for zero or more trailing words;
//! matching stops at the first `#`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    AnyOne,
    AnyRest,
}

/// A parsed binding pattern such as `medication.*` or `interaction.#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutingPattern {
    /// Parses a pattern. Every string is a valid pattern.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = raw
            .split('.')
            .map(|word| match word {
                "*" => Segment::AnyOne,
                "#" => Segment::AnyRest,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();
        Self { raw, segments }
    }

    /// Pattern matching every routing key (`#`).
    pub fn match_all() -> Self {
        Self::new("#")
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `routing_key` is selected by this pattern. Case-sensitive.
    pub fn matches(&self, routing_key: &str) -> bool {
        let mut words = routing_key.split('.');

        for segment in &self.segments {
            match segment {
                Segment::AnyRest => return true,
                Segment::AnyOne => {
                    if words.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(literal) => match words.next() {
                    Some(word) if word == literal => {}
                    _ => return false,
                },
            }
        }

        words.next().is_none()
    }
}

impl fmt::Display for RoutingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for RoutingPattern {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
