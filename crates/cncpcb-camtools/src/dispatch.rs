//! Command dispatch: a table of `{prefix, parser}` entries replacing the
//! source's template-metaprogramming overload resolution with a plain
//! sum-type command table, matched by fixed prefix then argument parse
//! success.

use cncpcb_core::error::DispatchError;
use cncpcb_core::Result;

/// One overload of a dispatchable command: a fixed leading token and a
/// parser for the remaining tokens into `T`.
pub struct Command<T> {
    pub prefix: &'static str,
    pub parse: fn(&[&str]) -> std::result::Result<T, String>,
}

impl<T> Command<T> {
    pub const fn new(prefix: &'static str, parse: fn(&[&str]) -> std::result::Result<T, String>) -> Self {
        Command { prefix, parse }
    }
}

/// Find the first command whose `prefix` equals `tokens[0]` and whose
/// parser accepts `tokens[1..]`. Overloads are tried in table order; if
/// every overload matching the prefix fails to parse, the **first**
/// overload's error is surfaced (not the last).
pub fn dispatch<T>(table: &[Command<T>], tokens: &[&str]) -> Result<T> {
    let Some((&prefix, rest)) = tokens.split_first() else {
        return Err(DispatchError::NoMatch { prefix: String::new() }.into());
    };

    let mut first_error: Option<String> = None;
    let mut matched_prefix = false;
    for cmd in table.iter().filter(|c| c.prefix == prefix) {
        matched_prefix = true;
        match (cmd.parse)(rest) {
            Ok(value) => return Ok(value),
            Err(reason) => {
                if first_error.is_none() {
                    first_error = Some(reason);
                }
            }
        }
    }

    if let Some(reason) = first_error {
        return Err(DispatchError::ArgumentParse {
            handler: prefix.to_string(),
            reason,
        }
        .into());
    }
    let _ = matched_prefix;
    Err(DispatchError::NoMatch {
        prefix: prefix.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Move {
        Xyz(f64, f64, f64),
        Xy(f64, f64),
    }

    fn parse_f64(tok: &str) -> std::result::Result<f64, String> {
        tok.parse().map_err(|_| format!("not a number: {tok:?}"))
    }

    fn move_xyz(rest: &[&str]) -> std::result::Result<Move, String> {
        match rest {
            [x, y, z] => Ok(Move::Xyz(parse_f64(x)?, parse_f64(y)?, parse_f64(z)?)),
            _ => Err("expected X Y Z".into()),
        }
    }

    fn move_xy(rest: &[&str]) -> std::result::Result<Move, String> {
        match rest {
            [x, y] => Ok(Move::Xy(parse_f64(x)?, parse_f64(y)?)),
            _ => Err("expected X Y".into()),
        }
    }

    fn table() -> Vec<Command<Move>> {
        vec![Command::new("move", move_xyz), Command::new("move", move_xy)]
    }

    #[test]
    fn selects_first_overload_that_parses() {
        let result = dispatch(&table(), &["move", "1", "2", "3"]).unwrap();
        assert_eq!(result, Move::Xyz(1.0, 2.0, 3.0));
    }

    #[test]
    fn falls_through_to_second_overload_on_arity() {
        let result = dispatch(&table(), &["move", "1", "2"]).unwrap();
        assert_eq!(result, Move::Xy(1.0, 2.0));
    }

    #[test]
    fn surfaces_first_overloads_error_when_all_fail() {
        let err = dispatch(&table(), &["move", "a", "b", "c", "d"]).unwrap_err();
        match err {
            cncpcb_core::Error::Dispatch(DispatchError::ArgumentParse { handler, reason }) => {
                assert_eq!(handler, "move");
                assert_eq!(reason, "expected X Y Z");
            }
            other => panic!("expected argument-parse error, got {other:?}"),
        }
    }

    #[test]
    fn no_match_for_unknown_prefix() {
        let err = dispatch(&table(), &["spin", "100"]).unwrap_err();
        assert!(matches!(err, cncpcb_core::Error::Dispatch(DispatchError::NoMatch { .. })));
    }
}
