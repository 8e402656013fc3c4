//! Argument policies for delegations and capabilities.
//!
//! A policy is an ordered list of [`Predicate`]s, all of which must hold
//! against an invocation's arguments. On the wire each predicate is an
//! array whose first element is the operator tag, mirroring the textual
//! notation: `["==", ".status", "draft"]`, `["any", ".to[]", [...]]`.

pub mod selector;

use ipld_core::ipld::Ipld;
use selector::{ParseError, ResolutionError, Selection, Selector};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use thiserror::Error;

/// A single policy statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Selected value equals the literal, by deep structural equality.
    Equal(Selector, Ipld),
    /// Selected value differs from the literal.
    NotEqual(Selector, Ipld),
    /// Integer comparison; fails on any non-integer operand.
    GreaterThan(Selector, Ipld),
    /// Integer comparison; fails on any non-integer operand.
    GreaterThanOrEqual(Selector, Ipld),
    /// Integer comparison; fails on any non-integer operand.
    LessThan(Selector, Ipld),
    /// Integer comparison; fails on any non-integer operand.
    LessThanOrEqual(Selector, Ipld),
    /// Selected string matches a glob pattern, `*` matching any run of
    /// characters.
    Like(Selector, String),
    /// Inner statement must fail. Its errors are discarded.
    Not(Box<Predicate>),
    /// Every statement must pass. Empty is vacuously true.
    And(Vec<Predicate>),
    /// At least one statement must pass, short-circuiting on the first
    /// success and swallowing earlier failures. Empty is vacuously true.
    Or(Vec<Predicate>),
    /// Every element of the selected collection must satisfy the nested
    /// statements. Zero elements fail.
    All(Selector, Vec<Predicate>),
    /// At least one element of the selected collection must satisfy the
    /// nested statements. Zero elements fail.
    Any(Selector, Vec<Predicate>),
}

/// A policy rejected an invocation's arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// The arguments resolved cleanly but did not satisfy the statement.
    #[error("arguments do not satisfy the policy statement {statement}, selected value: {actual}")]
    Violation {
        /// The failing statement.
        statement: Box<Predicate>,
        /// What the statement's selector actually found.
        actual: Selection,
    },

    /// The statement's selector did not fit the shape of the arguments.
    #[error("arguments are incompatible with the policy statement {statement}: {source}")]
    Incompatible {
        /// The failing statement.
        statement: Box<Predicate>,
        /// The underlying selector failure.
        source: ResolutionError,
    },
}

/// A wire-form policy statement could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidPolicy {
    /// A statement was not an array.
    #[error("policy statement must be a list")]
    NotAList,

    /// The operator tag was not a string.
    #[error("policy operator must be a string")]
    MissingOperator,

    /// The operator tag is not one of the known operators.
    #[error("unknown policy operator {0:?}")]
    UnknownOperator(String),

    /// The statement carried the wrong number of operands.
    #[error("operator {0:?} applied to {1} operands")]
    WrongArity(String, usize),

    /// The selector operand failed to parse.
    #[error(transparent)]
    Selector(#[from] ParseError),

    /// The selector operand was not a string.
    #[error("policy selector must be a string")]
    InvalidSelector,

    /// A `like` pattern was not a string.
    #[error("like pattern must be a string")]
    InvalidPattern,
}

/// Check `args` against every statement of `policy` in order, reporting
/// the first statement that fails.
///
/// # Errors
///
/// [`MatchError::Violation`] when a statement is not satisfied,
/// [`MatchError::Incompatible`] when a statement cannot even be evaluated
/// against the arguments' shape.
pub fn match_args(policy: &[Predicate], args: &Ipld) -> Result<(), MatchError> {
    for statement in policy {
        match statement.run(args) {
            Ok(true) => {}
            Ok(false) => {
                return Err(MatchError::Violation {
                    statement: Box::new(statement.clone()),
                    actual: selected_actual(statement, args),
                });
            }
            Err(source) => {
                return Err(MatchError::Incompatible {
                    statement: Box::new(statement.clone()),
                    source,
                });
            }
        }
    }
    Ok(())
}

impl Predicate {
    /// The selector this statement reads directly, if it reads one.
    /// `not`, `and` and `or` delegate selection to their inner
    /// statements.
    #[must_use]
    pub fn selector(&self) -> Option<&Selector> {
        match self {
            Predicate::Equal(selector, _)
            | Predicate::NotEqual(selector, _)
            | Predicate::GreaterThan(selector, _)
            | Predicate::GreaterThanOrEqual(selector, _)
            | Predicate::LessThan(selector, _)
            | Predicate::LessThanOrEqual(selector, _)
            | Predicate::Like(selector, _)
            | Predicate::All(selector, _)
            | Predicate::Any(selector, _) => Some(selector),
            Predicate::Not(_) | Predicate::And(_) | Predicate::Or(_) => None,
        }
    }

    /// Evaluate this statement against `args`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] when a selector does not fit the
    /// arguments' shape, except inside `not`, `or` and `any`, which
    /// treat evaluation failure as non-satisfaction.
    pub fn run(&self, args: &Ipld) -> Result<bool, ResolutionError> {
        match self {
            Predicate::Equal(selector, expected) => {
                Ok(selected_value(selector, args)?.is_some_and(|found| found == *expected))
            }
            Predicate::NotEqual(selector, expected) => {
                Ok(selected_value(selector, args)?.is_some_and(|found| found != *expected))
            }
            Predicate::GreaterThan(selector, expected) => {
                compare_integers(selector, args, expected, |a, b| a > b)
            }
            Predicate::GreaterThanOrEqual(selector, expected) => {
                compare_integers(selector, args, expected, |a, b| a >= b)
            }
            Predicate::LessThan(selector, expected) => {
                compare_integers(selector, args, expected, |a, b| a < b)
            }
            Predicate::LessThanOrEqual(selector, expected) => {
                compare_integers(selector, args, expected, |a, b| a <= b)
            }
            Predicate::Like(selector, pattern) => Ok(matches!(
                selector.select(args)?,
                Selection::One(Ipld::String(found)) if glob(pattern, &found)
            )),
            Predicate::Not(inner) => match inner.run(args) {
                Ok(satisfied) => Ok(!satisfied),
                Err(_) => Ok(true),
            },
            Predicate::And(statements) => {
                for statement in statements {
                    if !statement.run(args)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(statements) => {
                if statements.is_empty() {
                    return Ok(true);
                }
                Ok(statements
                    .iter()
                    .any(|statement| statement.run(args).unwrap_or(false)))
            }
            Predicate::All(selector, statements) => {
                let Some(elements) = selected_elements(selector, args)? else {
                    return Ok(false);
                };
                if elements.is_empty() {
                    return Ok(false);
                }
                for element in &elements {
                    if match_args(statements, element).is_err() {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(selector, statements) => {
                let Some(elements) = selected_elements(selector, args)? else {
                    return Ok(false);
                };
                Ok(elements
                    .iter()
                    .any(|element| match_args(statements, element).is_ok()))
            }
        }
    }
}

/// What a failing statement actually saw: its selector's selection, or
/// the whole argument value for combinators that carry no selector.
fn selected_actual(statement: &Predicate, args: &Ipld) -> Selection {
    match statement.selector() {
        Some(selector) => selector.select(args).unwrap_or(Selection::Absent),
        None => Selection::One(args.clone()),
    }
}

/// Resolve a comparison operand; `Many` compares as a list, absence as
/// no value.
fn selected_value(selector: &Selector, args: &Ipld) -> Result<Option<Ipld>, ResolutionError> {
    Ok(match selector.select(args)? {
        Selection::One(found) => Some(found),
        Selection::Many(found) => Some(Ipld::List(found)),
        Selection::Absent => None,
    })
}

fn compare_integers(
    selector: &Selector,
    args: &Ipld,
    expected: &Ipld,
    ordering: fn(i128, i128) -> bool,
) -> Result<bool, ResolutionError> {
    match (selector.select(args)?, expected) {
        (Selection::One(Ipld::Integer(found)), Ipld::Integer(expected)) => {
            Ok(ordering(found, *expected))
        }
        _ => Ok(false),
    }
}

/// The collection a quantifier ranges over, or `None` when the selection
/// is absent or not a collection.
fn selected_elements(
    selector: &Selector,
    args: &Ipld,
) -> Result<Option<Vec<Ipld>>, ResolutionError> {
    Ok(match selector.select(args)? {
        Selection::Many(elements) => Some(elements),
        Selection::One(Ipld::List(elements)) => Some(elements),
        Selection::One(Ipld::Map(map)) => Some(map.into_values().collect()),
        Selection::One(_) | Selection::Absent => None,
    })
}

/// Match `input` against `pattern`, where `*` matches any run of
/// characters (including none).
fn glob(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = input.chars().collect();

    let (mut p, mut i) = (0, 0);
    let mut retry: Option<(usize, usize)> = None;

    while i < input.len() {
        if p < pattern.len() && pattern[p] == '*' {
            retry = Some((p, i));
            p += 1;
        } else if p < pattern.len() && pattern[p] == input[i] {
            p += 1;
            i += 1;
        } else if let Some((star, matched)) = retry {
            // Let the last star absorb one more character.
            p = star + 1;
            i = matched + 1;
            retry = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

impl Predicate {
    const TAG_EQUAL: &'static str = "==";
    const TAG_NOT_EQUAL: &'static str = "!=";
    const TAG_GREATER: &'static str = ">";
    const TAG_GREATER_OR_EQUAL: &'static str = ">=";
    const TAG_LESS: &'static str = "<";
    const TAG_LESS_OR_EQUAL: &'static str = "<=";
    const TAG_LIKE: &'static str = "like";
    const TAG_NOT: &'static str = "not";
    const TAG_AND: &'static str = "and";
    const TAG_OR: &'static str = "or";
    const TAG_ALL: &'static str = "all";
    const TAG_ANY: &'static str = "any";

    fn tag(&self) -> &'static str {
        match self {
            Predicate::Equal(..) => Self::TAG_EQUAL,
            Predicate::NotEqual(..) => Self::TAG_NOT_EQUAL,
            Predicate::GreaterThan(..) => Self::TAG_GREATER,
            Predicate::GreaterThanOrEqual(..) => Self::TAG_GREATER_OR_EQUAL,
            Predicate::LessThan(..) => Self::TAG_LESS,
            Predicate::LessThanOrEqual(..) => Self::TAG_LESS_OR_EQUAL,
            Predicate::Like(..) => Self::TAG_LIKE,
            Predicate::Not(..) => Self::TAG_NOT,
            Predicate::And(..) => Self::TAG_AND,
            Predicate::Or(..) => Self::TAG_OR,
            Predicate::All(..) => Self::TAG_ALL,
            Predicate::Any(..) => Self::TAG_ANY,
        }
    }

    fn to_ipld(&self) -> Ipld {
        let tag = Ipld::String(self.tag().to_string());
        let elements = match self {
            Predicate::Equal(selector, operand)
            | Predicate::NotEqual(selector, operand)
            | Predicate::GreaterThan(selector, operand)
            | Predicate::GreaterThanOrEqual(selector, operand)
            | Predicate::LessThan(selector, operand)
            | Predicate::LessThanOrEqual(selector, operand) => vec![
                tag,
                Ipld::String(selector.to_string()),
                operand.clone(),
            ],
            Predicate::Like(selector, pattern) => vec![
                tag,
                Ipld::String(selector.to_string()),
                Ipld::String(pattern.clone()),
            ],
            Predicate::Not(inner) => vec![tag, inner.to_ipld()],
            Predicate::And(statements) | Predicate::Or(statements) => vec![
                tag,
                Ipld::List(statements.iter().map(Predicate::to_ipld).collect()),
            ],
            Predicate::All(selector, statements) | Predicate::Any(selector, statements) => vec![
                tag,
                Ipld::String(selector.to_string()),
                Ipld::List(statements.iter().map(Predicate::to_ipld).collect()),
            ],
        };
        Ipld::List(elements)
    }
}

fn selector_operand(operand: &Ipld) -> Result<Selector, InvalidPolicy> {
    let Ipld::String(text) = operand else {
        return Err(InvalidPolicy::InvalidSelector);
    };
    Ok(text.parse()?)
}

fn statement_list(operand: &Ipld) -> Result<Vec<Predicate>, InvalidPolicy> {
    let Ipld::List(elements) = operand else {
        return Err(InvalidPolicy::NotAList);
    };
    elements.iter().map(Predicate::try_from).collect()
}

impl TryFrom<&Ipld> for Predicate {
    type Error = InvalidPolicy;

    fn try_from(ipld: &Ipld) -> Result<Self, Self::Error> {
        let Ipld::List(elements) = ipld else {
            return Err(InvalidPolicy::NotAList);
        };
        let Some(Ipld::String(tag)) = elements.first() else {
            return Err(InvalidPolicy::MissingOperator);
        };
        let operands = &elements[1..];

        let arity = |expected: usize| {
            if operands.len() == expected {
                Ok(())
            } else {
                Err(InvalidPolicy::WrongArity(tag.clone(), operands.len()))
            }
        };

        match tag.as_str() {
            Self::TAG_EQUAL
            | Self::TAG_NOT_EQUAL
            | Self::TAG_GREATER
            | Self::TAG_GREATER_OR_EQUAL
            | Self::TAG_LESS
            | Self::TAG_LESS_OR_EQUAL => {
                arity(2)?;
                let selector = selector_operand(&operands[0])?;
                let operand = operands[1].clone();
                Ok(match tag.as_str() {
                    Self::TAG_EQUAL => Predicate::Equal(selector, operand),
                    Self::TAG_NOT_EQUAL => Predicate::NotEqual(selector, operand),
                    Self::TAG_GREATER => Predicate::GreaterThan(selector, operand),
                    Self::TAG_GREATER_OR_EQUAL => Predicate::GreaterThanOrEqual(selector, operand),
                    Self::TAG_LESS => Predicate::LessThan(selector, operand),
                    _ => Predicate::LessThanOrEqual(selector, operand),
                })
            }
            Self::TAG_LIKE => {
                arity(2)?;
                let selector = selector_operand(&operands[0])?;
                let Ipld::String(pattern) = &operands[1] else {
                    return Err(InvalidPolicy::InvalidPattern);
                };
                Ok(Predicate::Like(selector, pattern.clone()))
            }
            Self::TAG_NOT => {
                arity(1)?;
                Ok(Predicate::Not(Box::new(Predicate::try_from(
                    &operands[0],
                )?)))
            }
            Self::TAG_AND => {
                arity(1)?;
                Ok(Predicate::And(statement_list(&operands[0])?))
            }
            Self::TAG_OR => {
                arity(1)?;
                Ok(Predicate::Or(statement_list(&operands[0])?))
            }
            Self::TAG_ALL => {
                arity(2)?;
                Ok(Predicate::All(
                    selector_operand(&operands[0])?,
                    statement_list(&operands[1])?,
                ))
            }
            Self::TAG_ANY => {
                arity(2)?;
                Ok(Predicate::Any(
                    selector_operand(&operands[0])?,
                    statement_list(&operands[1])?,
                ))
            }
            unknown => Err(InvalidPolicy::UnknownOperator(unknown.to_string())),
        }
    }
}

impl TryFrom<Ipld> for Predicate {
    type Error = InvalidPolicy;

    fn try_from(ipld: Ipld) -> Result<Self, Self::Error> {
        Predicate::try_from(&ipld)
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_ipld().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ipld = Ipld::deserialize(deserializer)?;
        Predicate::try_from(&ipld).map_err(de::Error::custom)
    }
}

fn write_ipld(f: &mut fmt::Formatter<'_>, ipld: &Ipld) -> fmt::Result {
    match ipld {
        Ipld::Null => write!(f, "null"),
        Ipld::Bool(b) => write!(f, "{b}"),
        Ipld::Integer(i) => write!(f, "{i}"),
        Ipld::Float(x) => write!(f, "{x}"),
        Ipld::String(s) => write!(f, "{s:?}"),
        Ipld::Bytes(bytes) => {
            write!(f, "0x")?;
            for byte in bytes {
                write!(f, "{byte:02x}")?;
            }
            Ok(())
        }
        Ipld::List(items) => {
            write!(f, "[")?;
            for (position, item) in items.iter().enumerate() {
                if position > 0 {
                    write!(f, ", ")?;
                }
                write_ipld(f, item)?;
            }
            write!(f, "]")
        }
        Ipld::Map(map) => {
            write!(f, "{{")?;
            for (position, (key, item)) in map.iter().enumerate() {
                if position > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key:?}: ")?;
                write_ipld(f, item)?;
            }
            write!(f, "}}")
        }
        Ipld::Link(cid) => write!(f, "{cid}"),
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ipld(f, &self.to_ipld())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sel(text: &str) -> Selector {
        text.parse().unwrap()
    }

    fn args(entries: &[(&str, Ipld)]) -> Ipld {
        Ipld::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn equality_is_type_sensitive() {
        let statement = Predicate::Equal(sel("."), Ipld::Integer(138));
        assert!(statement.run(&Ipld::Integer(138)).unwrap());
        assert!(!statement.run(&Ipld::String("138".to_string())).unwrap());
    }

    #[test]
    fn equality_fails_on_absence() {
        let statement = Predicate::Equal(sel(".missing?"), Ipld::Integer(1));
        assert!(!statement.run(&args(&[])).unwrap());
        let statement = Predicate::NotEqual(sel(".missing?"), Ipld::Integer(1));
        assert!(!statement.run(&args(&[])).unwrap());
    }

    #[test]
    fn comparisons_only_hold_between_integers() {
        let payload = args(&[("n", Ipld::Integer(5)), ("s", Ipld::String("5".into()))]);
        assert!(
            Predicate::GreaterThan(sel(".n"), Ipld::Integer(4))
                .run(&payload)
                .unwrap()
        );
        assert!(
            !Predicate::GreaterThan(sel(".n"), Ipld::Integer(5))
                .run(&payload)
                .unwrap()
        );
        assert!(
            Predicate::GreaterThanOrEqual(sel(".n"), Ipld::Integer(5))
                .run(&payload)
                .unwrap()
        );
        assert!(
            Predicate::LessThan(sel(".n"), Ipld::Integer(6))
                .run(&payload)
                .unwrap()
        );
        assert!(
            !Predicate::GreaterThan(sel(".s"), Ipld::Integer(4))
                .run(&payload)
                .unwrap()
        );
        assert!(
            !Predicate::LessThan(sel(".n"), Ipld::String("6".into()))
                .run(&payload)
                .unwrap()
        );
    }

    #[test]
    fn like_matches_globs() {
        let payload = args(&[("email", Ipld::String("alice@example.com".into()))]);
        assert!(
            Predicate::Like(sel(".email"), "*@example.com".into())
                .run(&payload)
                .unwrap()
        );
        assert!(
            !Predicate::Like(sel(".email"), "*@other.com".into())
                .run(&payload)
                .unwrap()
        );
        assert!(
            Predicate::Like(sel(".email"), "alice@*.com".into())
                .run(&payload)
                .unwrap()
        );
        // Non-string selections never match.
        let payload = args(&[("email", Ipld::Integer(1))]);
        assert!(
            !Predicate::Like(sel(".email"), "*".into())
                .run(&payload)
                .unwrap()
        );
    }

    #[test]
    fn glob_star_matches_empty_runs() {
        assert!(glob("*", ""));
        assert!(glob("a*", "a"));
        assert!(glob("*a*", "banana"));
        assert!(glob("a*b*c", "abc"));
        assert!(glob("a*b*c", "axxbyyc"));
        assert!(!glob("a*b", "a"));
        assert!(!glob("abc", "abd"));
    }

    #[test]
    fn vacuous_and_or_pass() {
        let payload = args(&[]);
        assert!(Predicate::And(vec![]).run(&payload).unwrap());
        assert!(Predicate::Or(vec![]).run(&payload).unwrap());
    }

    #[test]
    fn not_discards_inner_errors() {
        // .a on a non-map errors; `not` treats that as non-satisfaction.
        let statement = Predicate::Not(Box::new(Predicate::Equal(sel(".a"), Ipld::Integer(1))));
        assert!(statement.run(&Ipld::Integer(7)).unwrap());
    }

    #[test]
    fn or_swallows_failing_branch_errors() {
        let statement = Predicate::Or(vec![
            Predicate::Equal(sel(".a"), Ipld::Integer(1)),
            Predicate::Equal(sel("."), Ipld::Integer(7)),
        ]);
        assert!(statement.run(&Ipld::Integer(7)).unwrap());
    }

    #[test]
    fn and_propagates_errors() {
        let statement = Predicate::And(vec![Predicate::Equal(sel(".a"), Ipld::Integer(1))]);
        assert!(statement.run(&Ipld::Integer(7)).is_err());
    }

    #[test]
    fn quantifiers_fail_on_zero_elements() {
        let payload = args(&[("to", Ipld::List(vec![]))]);
        let inner = vec![Predicate::Like(sel("."), "*".into())];
        assert!(
            !Predicate::All(sel(".to[]"), inner.clone())
                .run(&payload)
                .unwrap()
        );
        assert!(!Predicate::Any(sel(".to[]"), inner).run(&payload).unwrap());
    }

    #[test]
    fn all_requires_every_element() {
        let payload = args(&[(
            "to",
            Ipld::List(vec![
                Ipld::String("a@example.com".into()),
                Ipld::String("b@other.com".into()),
            ]),
        )]);
        let example_only = vec![Predicate::Like(sel("."), "*@example.com".into())];
        assert!(
            !Predicate::All(sel(".to[]"), example_only.clone())
                .run(&payload)
                .unwrap()
        );
        assert!(
            Predicate::Any(sel(".to[]"), example_only)
                .run(&payload)
                .unwrap()
        );
        let any_mail = vec![Predicate::Like(sel("."), "*@*".into())];
        assert!(Predicate::All(sel(".to[]"), any_mail).run(&payload).unwrap());
    }

    #[test]
    fn match_args_reports_the_first_violation() {
        let policy = vec![
            Predicate::Equal(sel(".status"), Ipld::String("draft".into())),
            Predicate::GreaterThan(sel(".size"), Ipld::Integer(10)),
        ];
        let payload = args(&[
            ("status", Ipld::String("draft".into())),
            ("size", Ipld::Integer(5)),
        ]);
        let err = match_args(&policy, &payload).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Violation { statement, actual }
                if *statement == policy[1] && actual == Selection::One(Ipld::Integer(5))
        ));
        let payload = args(&[
            ("status", Ipld::String("draft".into())),
            ("size", Ipld::Integer(11)),
        ]);
        assert!(match_args(&policy, &payload).is_ok());
    }

    #[test]
    fn violations_name_the_selected_value() {
        let policy = vec![Predicate::Equal(sel(".status"), Ipld::String("draft".into()))];
        let payload = args(&[("status", Ipld::String("final".into()))]);
        let err = match_args(&policy, &payload).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"arguments do not satisfy the policy statement ["==", ".status", "draft"], selected value: "final""#
        );

        let policy = vec![Predicate::Equal(sel(".status?"), Ipld::String("draft".into()))];
        let err = match_args(&policy, &args(&[])).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Violation {
                actual: Selection::Absent,
                ..
            }
        ));
    }

    #[test]
    fn shape_mismatch_is_reported_as_incompatible() {
        let policy = vec![Predicate::Equal(sel(".status"), Ipld::Null)];
        let err = match_args(&policy, &Ipld::Integer(1)).unwrap_err();
        assert!(matches!(err, MatchError::Incompatible { .. }));
    }

    #[test]
    fn wire_form_round_trips() {
        let policy = Predicate::And(vec![
            Predicate::Equal(sel(".status"), Ipld::String("draft".into())),
            Predicate::Any(
                sel(".to[]"),
                vec![Predicate::Like(sel("."), "*@example.com".into())],
            ),
            Predicate::Not(Box::new(Predicate::LessThan(
                sel(".size"),
                Ipld::Integer(1),
            ))),
        ]);
        let ipld = policy.to_ipld();
        assert_eq!(Predicate::try_from(&ipld).unwrap(), policy);
    }

    #[test]
    fn wire_form_rejects_unknown_operators() {
        let ipld = Ipld::List(vec![
            Ipld::String("~=".into()),
            Ipld::String(".a".into()),
            Ipld::Integer(1),
        ]);
        assert!(matches!(
            Predicate::try_from(&ipld),
            Err(InvalidPolicy::UnknownOperator(op)) if op == "~="
        ));
        let ipld = Ipld::List(vec![Ipld::String("==".into())]);
        assert!(matches!(
            Predicate::try_from(&ipld),
            Err(InvalidPolicy::WrongArity(..))
        ));
        assert!(matches!(
            Predicate::try_from(&Ipld::Integer(1)),
            Err(InvalidPolicy::NotAList)
        ));
    }

    #[test]
    fn display_uses_array_notation() {
        let statement = Predicate::Equal(sel(".status"), Ipld::String("draft".into()));
        assert_eq!(statement.to_string(), r#"["==", ".status", "draft"]"#);
    }
}
