use super::instruction::{CamInstruction, Letter};
use super::parse::parse_line;
use crate::constants::MAX_LEG_LENGTH;
use crate::error::CamError;
use crate::geometry::{BoundingBox, Point};

/// An ordered sequence of CAM instructions plus a resume cursor (an index
/// into the sequence; 0 on load).
#[derive(Debug, Clone, Default)]
pub struct CamStream {
    instructions: Vec<CamInstruction>,
    resume_cursor: usize,
}

impl CamStream {
    pub fn new(instructions: Vec<CamInstruction>) -> Self {
        CamStream {
            instructions,
            resume_cursor: 0,
        }
    }

    /// Parse CAM source text. Whitespace-only and empty lines are skipped;
    /// any line whose instruction is not in the accepted set aborts the
    /// whole load (parse failures are atomic — no partial stream).
    pub fn parse(text: &str) -> Result<CamStream, CamError> {
        let mut last_point = Point::new(0.0, 0.0, 0.0);
        let mut instructions = Vec::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if raw_line.trim().is_empty() {
                continue;
            }
            let inst = parse_line(last_point, line_no, raw_line)?;
            if !inst.is_kept() {
                return Err(CamError::Rejected {
                    line: line_no,
                    letter: inst.letter.to_char(),
                    arg: inst.arg,
                });
            }
            if let Some(ep) = inst.endpoint {
                last_point = ep;
            }
            instructions.push(inst);
        }

        Ok(CamStream::new(instructions))
    }

    pub fn instructions(&self) -> &[CamInstruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn resume_cursor(&self) -> usize {
        self.resume_cursor
    }

    pub fn set_resume_cursor(&mut self, idx: usize) {
        self.resume_cursor = idx;
    }

    /// Bounding box over defined endpoints only.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.instructions.iter().filter_map(|i| i.endpoint))
    }

    /// Split every `(G,1)` leg longer than `max_leg_length` into evenly
    /// spaced intermediate `(G,1)` instructions, each cloned from the
    /// original (so residual args survive) with a rewritten endpoint.
    pub fn break_long_legs(&self, max_leg_length: f64) -> CamStream {
        let mut out = Vec::with_capacity(self.instructions.len());
        let mut current: Option<Point> = None;

        for inst in &self.instructions {
            let Some(ep) = inst.endpoint else {
                out.push(inst.clone());
                continue;
            };

            if inst.is(Letter::G, 1) {
                if let Some(cur) = current {
                    let distance = cur.distance_to(&ep);
                    if distance > max_leg_length {
                        let segments = (distance / max_leg_length).ceil() as u32;
                        for k in 1..segments {
                            let t = k as f64 / segments as f64;
                            let p = Point::new(
                                cur.x + (ep.x - cur.x) * t,
                                cur.y + (ep.y - cur.y) * t,
                                cur.z + (ep.z - cur.z) * t,
                            );
                            out.push(inst.transform(|_| p));
                        }
                    }
                }
            }
            out.push(inst.clone());
            current = Some(ep);
        }

        CamStream {
            instructions: out,
            resume_cursor: self.resume_cursor,
        }
    }

    /// Apply `f` to every defined endpoint; letters, args, and residual
    /// args are untouched.
    pub fn transform(&self, f: impl Fn(Point) -> Point + Copy) -> CamStream {
        CamStream {
            instructions: self.instructions.iter().map(|i| i.transform(f)).collect(),
            resume_cursor: self.resume_cursor,
        }
    }
}

/// Default leg-splitting threshold, per the named constant.
pub fn break_long_legs_default(stream: &CamStream) -> CamStream {
    stream.break_long_legs(MAX_LEG_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_bounding_box() {
        let stream = CamStream::parse("G0 X0Y0Z0\nG1 X10Y0\nG1 X10Y10\n").unwrap();
        let bbox = stream.bounding_box();
        assert_eq!(bbox.size(), (10.0, 10.0));
    }

    #[test]
    fn rejects_unclassified_instruction() {
        assert!(CamStream::parse("G2 X1Y1\n").is_err());
    }

    #[test]
    fn skips_blank_lines() {
        let stream = CamStream::parse("G0 X0Y0Z0\n\n  \nG1 X1Y1\n").unwrap();
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn break_long_legs_matches_scenario() {
        let stream = CamStream::parse("G0 X0Y0Z0\nG1 X10Y0\nG1 X10Y10\n").unwrap();
        let split = stream.break_long_legs(2.0);
        let g1_count = split.instructions().iter().filter(|i| i.is(Letter::G, 1)).count();
        assert_eq!(g1_count, 10);
    }

    #[test]
    fn break_long_legs_preserves_order_and_non_g1() {
        let stream = CamStream::parse("G0 X0Y0Z0\nG1 X10Y0\nM5\n").unwrap();
        let split = stream.break_long_legs(2.0);
        assert!(split.instructions().last().unwrap().is(Letter::M, 5));
        let last_g1 = split
            .instructions()
            .iter()
            .filter(|i| i.is(Letter::G, 1))
            .last()
            .unwrap();
        assert_eq!(last_g1.endpoint.unwrap().x, 10.0);
    }

    #[test]
    fn transform_remaps_endpoints_only() {
        let stream = CamStream::parse("G1 X1Y2Z3I0.5\n").unwrap();
        let shifted = stream.transform(|p| Point::new(p.x + 10.0, p.y, p.z));
        let inst = &shifted.instructions()[0];
        assert_eq!(inst.endpoint.unwrap().x, 11.0);
        assert_eq!(inst.extra.get(&'I'), Some(&0.5));
    }
}
