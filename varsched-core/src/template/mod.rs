//! Template References
//!
//! Query templates reference other variables with a small placeholder
//! syntax:
//!
//! - `${name}` and `${name:format}`
//! - bare `$name`, where the name is the longest run of `[A-Za-z0-9_]`
//!   following the dollar sign
//!
//! The bare form is boundary-aware: `$region_id` is a reference to
//! `region_id`, never to a variable called `region`.
//!
//! Both the dependency extractor and the interpolator walk a template with
//! the same scanner, so they always agree on what counts as a reference.

mod extract;
mod interpolate;

pub use extract::{extract_dependencies, unknown_references};
pub use interpolate::{interpolate, render_value, Resolution, ValueLookup};

/// A piece of a scanned template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied through unchanged.
    Literal(&'a str),

    /// A variable reference.
    Reference(Reference<'a>),
}

/// A `$name`, `${name}` or `${name:format}` occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Referenced variable name.
    pub name: &'a str,

    /// Optional format after the colon.
    pub format: Option<&'a str>,

    /// The full source text of the reference, including `$` and braces.
    pub raw: &'a str,
}

/// Scan a template into literal text and references.
pub fn segments(template: &str) -> Segments<'_> {
    Segments {
        src: template,
        pos: 0,
    }
}

/// Iterator returned by [`segments`].
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        let rest = &self.src[self.pos..];
        if rest.is_empty() {
            return None;
        }

        if let Some((reference, len)) = parse_reference(rest) {
            self.pos += len;
            return Some(Segment::Reference(reference));
        }

        // Literal text runs up to the next dollar sign that starts a reference.
        let end = rest
            .match_indices('$')
            .map(|(i, _)| i)
            .find(|&i| i > 0 && parse_reference(&rest[i..]).is_some())
            .unwrap_or(rest.len());

        self.pos += end;
        Some(Segment::Literal(&rest[..end]))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_name_char)
}

/// Parse a reference at the start of `s`. Returns the reference and the
/// number of bytes it spans.
fn parse_reference(s: &str) -> Option<(Reference<'_>, usize)> {
    let body = s.strip_prefix('$')?;

    if let Some(inner) = body.strip_prefix('{') {
        let close = inner.find('}')?;
        let inner = &inner[..close];
        let (name, format) = match inner.split_once(':') {
            Some((name, format)) => (name, Some(format).filter(|f| !f.is_empty())),
            None => (inner, None),
        };
        if !is_name(name) {
            return None;
        }
        // `$` + `{` + inner + `}`
        let len = close + 3;
        return Some((
            Reference {
                name,
                format,
                raw: &s[..len],
            },
            len,
        ));
    }

    let name_len = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
    if name_len == 0 {
        return None;
    }
    let len = name_len + 1;
    Some((
        Reference {
            name: &body[..name_len],
            format: None,
            raw: &s[..len],
        },
        len,
    ))
}
