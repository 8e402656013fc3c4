//! Path expressions over semi-structured values.

use ipld_core::ipld::Ipld;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, take_while1},
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, recognize, value},
    sequence::{delimited, pair, preceded, separated_pair},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A parsed path expression like `.to[0].email?`.
///
/// A selector starts with `.` and names a path into a value, one segment
/// at a time. A trailing `?` on a segment makes absence along that path a
/// non-error. Parsing preserves the written form, so a selector displays
/// exactly as it was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(Vec<Segment>);

/// One step of a [`Selector`] path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    kind: SegmentKind,
    optional: bool,
    source: String,
}

impl Segment {
    /// The step this segment performs.
    #[must_use]
    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Whether absence at this segment is tolerated.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// The step kinds a segment can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// `.` on its own, selecting the whole value.
    Identity,
    /// `.name` or `.["name"]`, selecting a map entry.
    Field(String),
    /// `.[2]` or `.[-1]`, selecting a list element. Negative counts from
    /// the end.
    Index(i64),
    /// `.[1:3]`, `.[:3]` or `.[1:]`. Parsed but not resolvable.
    Slice(Option<i64>, Option<i64>),
    /// `.[]`, fanning out over list elements or map values.
    Iterator,
}

/// The result of resolving a selector against a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A single value.
    One(Ipld),
    /// The accumulated values of an iterator fan-out, flattened.
    Many(Vec<Ipld>),
    /// Nothing found along an optional path.
    Absent,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::One(value) => super::write_ipld(f, value),
            Selection::Many(values) => {
                write!(f, "[")?;
                for (position, value) in values.iter().enumerate() {
                    if position > 0 {
                        write!(f, ", ")?;
                    }
                    super::write_ipld(f, value)?;
                }
                write!(f, "]")
            }
            Selection::Absent => f.write_str("absent"),
        }
    }
}

/// A selector failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector at column {column}: {token:?}")]
pub struct ParseError {
    /// The text that could not be read as a segment.
    pub token: String,
    /// Byte offset of the offending token.
    pub column: usize,
}

/// A selector could not be resolved against the value's actual shape.
///
/// Each variant carries the written form of the segment that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// A field segment hit a non-map value.
    #[error("cannot select field {at}: value is not a map")]
    NotAMap {
        /// The failing segment as written.
        at: String,
    },

    /// A field segment named a key the map does not carry.
    #[error("no entry for field {at}")]
    MissingField {
        /// The failing segment as written.
        at: String,
    },

    /// An index segment hit a non-list value.
    #[error("cannot index with {at}: value is not a list")]
    NotAList {
        /// The failing segment as written.
        at: String,
    },

    /// An index segment fell outside the list.
    #[error("index {at} is out of bounds")]
    OutOfBounds {
        /// The failing segment as written.
        at: String,
    },

    /// Slice resolution is not implemented.
    #[error("slice {at} is not yet implemented")]
    SliceUnimplemented {
        /// The failing segment as written.
        at: String,
    },

    /// An iterator segment hit a value that is neither list nor map.
    #[error("cannot iterate {at}: value is not a list or map")]
    NotIterable {
        /// The failing segment as written.
        at: String,
    },
}

impl Selector {
    /// The identity selector `.`.
    #[must_use]
    pub fn identity() -> Self {
        Selector(vec![Segment {
            kind: SegmentKind::Identity,
            optional: false,
            source: ".".to_string(),
        }])
    }

    /// The parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Resolve this selector against `value`.
    ///
    /// Segments apply left to right. An optional segment that finds
    /// nothing turns the cursor absent rather than erroring; absence then
    /// rides through the remaining segments. An iterator segment fans out
    /// over the remaining path and always yields [`Selection::Many`],
    /// flattening nested iterators and dropping absent branches.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] when a non-optional segment does not
    /// fit the value's shape, and always for slice segments.
    pub fn select(&self, value: &Ipld) -> Result<Selection, ResolutionError> {
        resolve_path(&self.0, Some(value))
    }
}

fn resolve_path(segments: &[Segment], cursor: Option<&Ipld>) -> Result<Selection, ResolutionError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(match cursor {
            Some(found) => Selection::One(found.clone()),
            None => Selection::Absent,
        });
    };

    match &segment.kind {
        SegmentKind::Identity => resolve_path(rest, cursor),
        SegmentKind::Field(name) => match cursor {
            None => resolve_path(rest, None),
            Some(Ipld::Map(map)) => match map.get(name) {
                Some(found) => resolve_path(rest, Some(found)),
                None if segment.optional => resolve_path(rest, None),
                None => Err(ResolutionError::MissingField {
                    at: segment.source.clone(),
                }),
            },
            Some(_) if segment.optional => resolve_path(rest, None),
            Some(_) => Err(ResolutionError::NotAMap {
                at: segment.source.clone(),
            }),
        },
        SegmentKind::Index(index) => match cursor {
            None => resolve_path(rest, None),
            Some(Ipld::List(items)) => {
                let position = if *index < 0 {
                    items.len() as i64 + index
                } else {
                    *index
                };
                match usize::try_from(position).ok().and_then(|i| items.get(i)) {
                    Some(found) => resolve_path(rest, Some(found)),
                    None if segment.optional => resolve_path(rest, None),
                    None => Err(ResolutionError::OutOfBounds {
                        at: segment.source.clone(),
                    }),
                }
            }
            Some(_) if segment.optional => resolve_path(rest, None),
            Some(_) => Err(ResolutionError::NotAList {
                at: segment.source.clone(),
            }),
        },
        SegmentKind::Slice(..) => Err(ResolutionError::SliceUnimplemented {
            at: segment.source.clone(),
        }),
        SegmentKind::Iterator => {
            let items: Vec<&Ipld> = match cursor {
                Some(Ipld::List(items)) => items.iter().collect(),
                Some(Ipld::Map(map)) => map.values().collect(),
                None if segment.optional => return Ok(Selection::Many(Vec::new())),
                _ => {
                    return Err(ResolutionError::NotIterable {
                        at: segment.source.clone(),
                    });
                }
            };

            let mut accumulated = Vec::new();
            for item in items {
                match resolve_path(rest, Some(item))? {
                    Selection::One(found) => accumulated.push(found),
                    Selection::Many(found) => accumulated.extend(found),
                    Selection::Absent => {}
                }
            }
            Ok(Selection::Many(accumulated))
        }
    }
}

fn identifier(input: &str) -> IResult<&str, SegmentKind> {
    map(
        take_while1(|c: char| nom_unicode::is_alphanumeric(c) || c == '_'),
        |name: &str| SegmentKind::Field(name.to_string()),
    )(input)
}

fn quoted_field(input: &str) -> IResult<&str, SegmentKind> {
    map(
        delimited(
            char('"'),
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\"", char('"')), value("\\", char('\\')))),
            )),
            char('"'),
        ),
        |name| SegmentKind::Field(name.unwrap_or_default()),
    )(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse)(input)
}

fn slice(input: &str) -> IResult<&str, SegmentKind> {
    map(
        separated_pair(opt(integer), char(':'), opt(integer)),
        |(start, end)| SegmentKind::Slice(start, end),
    )(input)
}

fn index(input: &str) -> IResult<&str, SegmentKind> {
    map(integer, SegmentKind::Index)(input)
}

fn iterator(input: &str) -> IResult<&str, SegmentKind> {
    Ok((input, SegmentKind::Iterator))
}

fn bracket(input: &str) -> IResult<&str, SegmentKind> {
    delimited(
        char('['),
        alt((quoted_field, slice, index, iterator)),
        char(']'),
    )(input)
}

fn identity(input: &str) -> IResult<&str, SegmentKind> {
    Ok((input, SegmentKind::Identity))
}

// A bracket segment may directly follow the previous segment, as in
// `.to[0]`; every other segment form is introduced by `.`.
fn segment(input: &str) -> IResult<&str, (SegmentKind, bool)> {
    let (input, kind) = alt((
        preceded(char('.'), alt((bracket, identifier, identity))),
        bracket,
    ))(input)?;
    let (input, optional) = opt(char('?'))(input)?;
    Ok((input, (kind, optional.is_some())))
}

fn offending_token(rest: &str) -> String {
    match rest.char_indices().skip(1).find(|(_, c)| *c == '.') {
        Some((boundary, _)) => rest[..boundary].to_string(),
        None => rest.to_string(),
    }
}

impl FromStr for Selector {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if !text.starts_with('.') {
            return Err(ParseError {
                token: offending_token(text),
                column: 0,
            });
        }

        let mut segments = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            let column = text.len() - rest.len();
            let (remaining, (kind, optional)) = segment(rest).map_err(|_| ParseError {
                token: offending_token(rest),
                column,
            })?;

            // The bare identity only stands alone; `..` in particular is
            // not recursive descent.
            if kind == SegmentKind::Identity && (!segments.is_empty() || !remaining.is_empty()) {
                let token = if remaining.starts_with('.') {
                    "..".to_string()
                } else {
                    offending_token(rest)
                };
                return Err(ParseError { token, column });
            }

            segments.push(Segment {
                kind,
                optional,
                source: text[column..text.len() - remaining.len()].to_string(),
            });
            rest = remaining;
        }

        Ok(Selector(segments))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            f.write_str(&segment.source)?;
        }
        Ok(())
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Selector {
        text.parse().unwrap()
    }

    fn map_of(entries: &[(&str, Ipld)]) -> Ipld {
        Ipld::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn parse_round_trips() {
        for text in [
            ".",
            ".to",
            ".to[0].email?",
            ".[\"weird key\"]",
            ".[-2]",
            ".[1:3]",
            ".[:3]",
            ".[1:]",
            ".[]",
            ".a.b?.c",
            ".[].x",
        ] {
            assert_eq!(parse(text).to_string(), text, "round trip for {text:?}");
        }
    }

    #[test]
    fn double_dot_is_a_parse_error() {
        let err = "..".parse::<Selector>().unwrap_err();
        assert_eq!(err.token, "..");
        assert_eq!(err.column, 0);

        let err = ".x..y".parse::<Selector>().unwrap_err();
        assert_eq!(err.token, "..");
        assert_eq!(err.column, 2);
    }

    #[test]
    fn malformed_selectors_report_the_token() {
        assert!("".parse::<Selector>().is_err());
        assert!("to".parse::<Selector>().is_err());
        assert!("[0]".parse::<Selector>().is_err());
        assert!(".[@]".parse::<Selector>().is_err());
        assert!(".a.".parse::<Selector>().is_err());
    }

    #[test]
    fn field_chain_selects_nested_value() {
        let value = map_of(&[("a", map_of(&[("b", Ipld::Integer(5))]))]);
        let selection = parse(".a.b").select(&value).unwrap();
        assert_eq!(selection, Selection::One(Ipld::Integer(5)));
    }

    #[test]
    fn optional_absence_is_not_an_error() {
        let value = map_of(&[("a", map_of(&[]))]);
        assert_eq!(
            parse(".a.missing?").select(&value).unwrap(),
            Selection::Absent
        );
        assert_eq!(
            parse(".a.missing").select(&value).unwrap_err(),
            ResolutionError::MissingField {
                at: ".missing".to_string()
            }
        );
    }

    #[test]
    fn absence_rides_through_later_segments() {
        let value = map_of(&[("a", map_of(&[]))]);
        assert_eq!(
            parse(".a.missing?.deeper[3]").select(&value).unwrap(),
            Selection::Absent
        );
    }

    #[test]
    fn negative_index_counts_from_the_end() {
        let value = Ipld::List(vec![Ipld::Integer(1), Ipld::Integer(2), Ipld::Integer(3)]);
        assert_eq!(
            parse(".[-1]").select(&value).unwrap(),
            Selection::One(Ipld::Integer(3))
        );
        assert!(matches!(
            parse(".[3]").select(&value),
            Err(ResolutionError::OutOfBounds { .. })
        ));
        assert_eq!(parse(".[3]?").select(&value).unwrap(), Selection::Absent);
    }

    #[test]
    fn iterator_flattens_one_level() {
        let value = Ipld::List(vec![
            map_of(&[("x", Ipld::Integer(1))]),
            map_of(&[("x", Ipld::Integer(2))]),
        ]);
        assert_eq!(
            parse(".[].x").select(&value).unwrap(),
            Selection::Many(vec![Ipld::Integer(1), Ipld::Integer(2)])
        );
    }

    #[test]
    fn nested_iterators_flatten_into_one_list() {
        let value = Ipld::List(vec![
            Ipld::List(vec![Ipld::Integer(1), Ipld::Integer(2)]),
            Ipld::List(vec![Ipld::Integer(3)]),
        ]);
        assert_eq!(
            parse(".[].[]").select(&value).unwrap(),
            Selection::Many(vec![
                Ipld::Integer(1),
                Ipld::Integer(2),
                Ipld::Integer(3)
            ])
        );
    }

    #[test]
    fn iterator_over_map_yields_values() {
        let value = map_of(&[("a", Ipld::Integer(1)), ("b", Ipld::Integer(2))]);
        assert_eq!(
            parse(".[]").select(&value).unwrap(),
            Selection::Many(vec![Ipld::Integer(1), Ipld::Integer(2)])
        );
    }

    #[test]
    fn optional_iterator_over_absence_is_empty() {
        let value = map_of(&[]);
        assert_eq!(
            parse(".missing?.[]?").select(&value).unwrap(),
            Selection::Many(Vec::new())
        );
        assert!(matches!(
            parse(".missing?.[]").select(&value),
            Err(ResolutionError::NotIterable { .. })
        ));
    }

    #[test]
    fn iterator_over_scalar_errors() {
        assert!(matches!(
            parse(".[]").select(&Ipld::Integer(1)),
            Err(ResolutionError::NotIterable { .. })
        ));
    }

    #[test]
    fn slices_parse_but_do_not_resolve() {
        let value = Ipld::List(vec![Ipld::Integer(1), Ipld::Integer(2)]);
        assert!(matches!(
            parse(".[0:1]").select(&value),
            Err(ResolutionError::SliceUnimplemented { .. })
        ));
        assert!(matches!(
            parse(".[0:1]?").select(&value),
            Err(ResolutionError::SliceUnimplemented { .. })
        ));
    }

    #[test]
    fn quoted_field_allows_any_characters() {
        let value = map_of(&[("with \"quotes\"", Ipld::Bool(true))]);
        let selector = parse(".[\"with \\\"quotes\\\"\"]");
        assert_eq!(
            selector.select(&value).unwrap(),
            Selection::One(Ipld::Bool(true))
        );
    }

    #[test]
    fn identity_selects_the_whole_value() {
        let value = Ipld::String("hello".to_string());
        assert_eq!(
            parse(".").select(&value).unwrap(),
            Selection::One(value.clone())
        );
    }

    #[test]
    fn serde_as_string() {
        let selector = parse(".to[0].email?");
        let json = serde_json::to_string(&selector).unwrap();
        assert_eq!(json, "\".to[0].email?\"");
        let decoded: Selector = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, selector);
    }
}
