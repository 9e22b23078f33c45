//! Parsing of GRBL `<...>` status reports and `[GC:...]` parser-state
//! reports into the session's state mirror.

use cncpcb_core::{Point, Vector};

/// The fields recognised in a `?` status report, per the wire protocol.
#[derive(Debug, Clone, Default)]
pub struct StatusFields {
    pub idle: bool,
    pub alarm: bool,
    pub wpos: Option<Point>,
    pub mpos: Option<Point>,
    pub wco: Option<Vector>,
    pub feed_rate: Option<f64>,
    pub spindle_speed: Option<f64>,
    pub spindle_on: Option<bool>,
    pub touches_ground: bool,
}

fn extract_field<'a>(status_line: &'a str, prefix: &str) -> Option<&'a str> {
    let inner = status_line
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(status_line);
    let start = inner.find(prefix)? + prefix.len();
    let rest = &inner[start..];
    let end = rest.find('|').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn parse_triple(s: &str) -> Option<(f64, f64, f64)> {
    let mut parts = s.split(',');
    let x = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    let z = parts.next()?.trim().parse().ok()?;
    Some((x, y, z))
}

/// Parse one `<...>` realtime status report.
pub fn parse_status_line(line: &str) -> StatusFields {
    let mut fields = StatusFields::default();

    let inner = line.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(line);
    for part in inner.split('|') {
        if part == "Idle" {
            fields.idle = true;
        } else if part == "Alarm" {
            fields.alarm = true;
        }
    }

    if let Some(s) = extract_field(line, "WPos:") {
        if let Some((x, y, z)) = parse_triple(s) {
            fields.wpos = Some(Point::new(x, y, z));
        }
    }
    if let Some(s) = extract_field(line, "MPos:") {
        if let Some((x, y, z)) = parse_triple(s) {
            fields.mpos = Some(Point::new(x, y, z));
        }
    }
    if let Some(s) = extract_field(line, "WCO:") {
        if let Some((x, y, z)) = parse_triple(s) {
            fields.wco = Some(Vector::new(x, y, z));
        }
    }
    if let Some(s) = extract_field(line, "FS:") {
        let mut parts = s.split(',');
        if let Some(f) = parts.next().and_then(|v| v.trim().parse::<f64>().ok()) {
            fields.feed_rate = Some(f);
        }
        if let Some(sp) = parts.next().and_then(|v| v.trim().parse::<f64>().ok()) {
            fields.spindle_speed = Some(sp);
            fields.spindle_on = Some(sp >= 1.0);
        }
    }
    if let Some(s) = extract_field(line, "Pn:") {
        fields.touches_ground = s.contains('P');
    }

    fields
}

/// The fields recognised in a `[GC:...]` parser-state report, harvested
/// after a `$G` request.
#[derive(Debug, Clone, Default)]
pub struct ParserState {
    pub feed_rate: Option<f64>,
    pub spindle_speed: Option<f64>,
    pub wcs: Option<u8>,
}

/// Parse a `[GC:...]` line's space-separated tokens.
pub fn parse_gc_line(line: &str) -> ParserState {
    let mut state = ParserState::default();
    let inner = line
        .trim()
        .strip_prefix("[GC:")
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(line);

    for token in inner.split_whitespace() {
        if let Some(rest) = token.strip_prefix('F') {
            if let Ok(f) = rest.parse::<f64>() {
                state.feed_rate = Some(f);
            }
        } else if let Some(rest) = token.strip_prefix('S') {
            if let Ok(s) = rest.parse::<f64>() {
                state.spindle_speed = Some(s);
            }
        } else if let Some(rest) = token.strip_prefix('G') {
            if let Ok(code) = rest.parse::<u32>() {
                if (54..=59).contains(&code) {
                    state.wcs = Some((code - 54) as u8);
                }
            }
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_idle_with_wpos() {
        let f = parse_status_line("<Idle|WPos:1,2,3|FS:0,0>");
        assert!(f.idle);
        let p = f.wpos.unwrap();
        assert_eq!((p.x, p.y, p.z), (1.0, 2.0, 3.0));
        assert_eq!(f.spindle_on, Some(false));
    }

    #[test]
    fn parses_run_with_mpos_wco() {
        let f = parse_status_line("<Run|MPos:10,10,0|WCO:5,5,0|FS:100,1000>");
        assert!(!f.idle);
        assert_eq!(f.mpos.unwrap().x, 10.0);
        assert_eq!(f.wco.unwrap().x, 5.0);
        assert_eq!(f.spindle_on, Some(true));
    }

    #[test]
    fn parses_probe_pin() {
        let f = parse_status_line("<Idle|Pn:P|FS:0,0>");
        assert!(f.touches_ground);
    }

    #[test]
    fn parses_parser_state() {
        let s = parse_gc_line("[GC:G0 G54 G17 G21 G90 G94 F500 S1000]");
        assert_eq!(s.feed_rate, Some(500.0));
        assert_eq!(s.spindle_speed, Some(1000.0));
        assert_eq!(s.wcs, Some(0));
    }
}
