use super::instruction::{CamInstruction, Letter};
use crate::error::CamError;
use crate::geometry::Point;

/// Parse one non-blank CAM source line into an instruction, resolving any
/// undefined X/Y/Z axis against `last_point`. `line_no` is 1-based, used
/// only for error reporting.
pub fn parse_line(last_point: Point, line_no: usize, text: &str) -> Result<CamInstruction, CamError> {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("(MSG,") {
        let message = rest.strip_suffix(')').unwrap_or(rest).trim().to_string();
        return Ok(CamInstruction::message(message));
    }

    let tokens = tokenize(trimmed, line_no)?;
    let mut tokens = tokens.into_iter();

    let (first_letter_ch, first_value) = tokens.next().ok_or_else(|| CamError::InvalidSyntax {
        line: line_no,
        text: text.to_string(),
    })?;

    let letter = Letter::from_char(first_letter_ch).ok_or_else(|| CamError::InvalidSyntax {
        line: line_no,
        text: text.to_string(),
    })?;
    let arg = first_value.trunc() as i64;

    let mut x = f64::NAN;
    let mut y = f64::NAN;
    let mut z = f64::NAN;
    let mut touched_axis = false;
    let mut inst = CamInstruction::new(letter, arg);

    for (ch, value) in tokens {
        match ch.to_ascii_uppercase() {
            'X' => {
                x = value;
                touched_axis = true;
            }
            'Y' => {
                y = value;
                touched_axis = true;
            }
            'Z' => {
                z = value;
                touched_axis = true;
            }
            other => {
                inst = inst.with_extra(other, value);
            }
        }
    }

    if touched_axis {
        let resolved = Point::new(
            if x.is_nan() { last_point.x } else { x },
            if y.is_nan() { last_point.y } else { y },
            if z.is_nan() { last_point.z } else { z },
        );
        inst = inst.with_endpoint(resolved);
    }

    Ok(inst)
}

/// Split a line into (letter, numeric-value) pairs, e.g. `"G1 X10Y0"` into
/// `[('G', 1.0), ('X', 10.0), ('Y', 0.0)]`.
fn tokenize(line: &str, line_no: usize) -> Result<Vec<(char, f64)>, CamError> {
    let chars: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let letter = chars[i];
        if !letter.is_ascii_alphabetic() {
            return Err(CamError::InvalidSyntax {
                line: line_no,
                text: line.to_string(),
            });
        }
        i += 1;
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '-' || chars[i] == '+') {
            i += 1;
        }
        let field: String = chars[start..i].iter().collect();
        let value = field.parse::<f64>().map_err(|_| CamError::InvalidNumber {
            line: line_no,
            field,
        })?;
        tokens.push((letter, value));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_move() {
        let last = Point::new(0.0, 0.0, 0.0);
        let inst = parse_line(last, 1, "G1 X10Y0").unwrap();
        assert_eq!(inst.letter, Letter::G);
        assert_eq!(inst.arg, 1);
        let ep = inst.endpoint.unwrap();
        assert_eq!(ep.x, 10.0);
        assert_eq!(ep.y, 0.0);
        assert_eq!(ep.z, 0.0);
    }

    #[test]
    fn inherits_undefined_axes() {
        let last = Point::new(1.0, 2.0, 3.0);
        let inst = parse_line(last, 1, "G1 X5").unwrap();
        let ep = inst.endpoint.unwrap();
        assert_eq!(ep.x, 5.0);
        assert_eq!(ep.y, 2.0);
        assert_eq!(ep.z, 3.0);
    }

    #[test]
    fn no_axis_means_no_endpoint() {
        let last = Point::new(0.0, 0.0, 0.0);
        let inst = parse_line(last, 1, "M5").unwrap();
        assert!(inst.endpoint.is_none());
    }

    #[test]
    fn residual_args_captured() {
        let last = Point::new(0.0, 0.0, 0.0);
        let inst = parse_line(last, 1, "G1 X1Y2I0.5J-0.25").unwrap();
        assert_eq!(inst.extra.get(&'I'), Some(&0.5));
        assert_eq!(inst.extra.get(&'J'), Some(&-0.25));
    }

    #[test]
    fn message_comment() {
        let last = Point::new(0.0, 0.0, 0.0);
        let inst = parse_line(last, 1, "(MSG,Change to tool dia=0.4)").unwrap();
        assert_eq!(inst.letter, Letter::Star);
        assert_eq!(inst.message.as_deref(), Some("Change to tool dia=0.4"));
    }

    #[test]
    fn rejects_malformed_line() {
        let last = Point::new(0.0, 0.0, 0.0);
        assert!(parse_line(last, 1, "123").is_err());
    }
}
