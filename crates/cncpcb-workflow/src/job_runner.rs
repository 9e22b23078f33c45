//! The job runner: CAM stream pipeline, per-instruction send semantics,
//! tool-change gating, and the resume cursor.

use crate::interactive::Interactive;
use cncpcb_camtools::HeightMap;
use cncpcb_controller::session::Session;
use cncpcb_controller::transport::LineTransport;
use cncpcb_core::constants::{MAX_LEG_LENGTH, TOOL_CHANGE_POSITION_TOLERANCE};
use cncpcb_core::error::WorkflowError;
use cncpcb_core::{BoundingBox, CamStream, Error, Letter, Orientation, Point, Result};
use tracing::{debug, info};

/// A loaded, pipeline-prepared CAM stream plus the resume/tool-change state
/// the job runner tracks while sending it.
pub struct JobRunner {
    stream: CamStream,
    tool_change_pending: bool,
    pending_prompt: Option<String>,
}

impl JobRunner {
    /// Run the full load pipeline: parse, reject if the stream's bbox
    /// escapes `border`, split long legs, warp through `height_map` (if
    /// given), apply `orientation`, then the constant Z adjustment.
    pub fn load(
        text: &str,
        border: BoundingBox,
        height_map: Option<&HeightMap>,
        orientation: &Orientation,
        z_adjust: f64,
    ) -> Result<JobRunner> {
        let stream = CamStream::parse(text)?;
        if !border.contains_box(&stream.bounding_box()) {
            return Err(WorkflowError::LayerExceedsBorder.into());
        }

        let mut stream = stream.break_long_legs(MAX_LEG_LENGTH);
        if let Some(map) = height_map {
            stream = warp_stream(&stream, map)?;
        }
        let stream = stream.transform(|p| orientation.apply(p));
        let stream = stream.transform(|p| Point::new(p.x, p.y, p.z + z_adjust));

        Ok(JobRunner {
            stream,
            tool_change_pending: false,
            pending_prompt: None,
        })
    }

    pub fn stream(&self) -> &CamStream {
        &self.stream
    }

    /// Run from the beginning.
    pub fn run<T: LineTransport>(&mut self, session: &mut Session<T>, ui: &mut impl Interactive) -> Result<()> {
        self.run_from(0, session, ui)
    }

    /// Resume after an abort: rewind to the last recorded `(G,0)` cursor,
    /// then fast-forward (without sending anything) through the `(G,0)`/
    /// `(G,1)` instructions already physically executed up to, but not
    /// including, the next `(G,0)` — then resume normal sending from there.
    pub fn resume<T: LineTransport>(&mut self, session: &mut Session<T>, ui: &mut impl Interactive) -> Result<()> {
        let start = self.fast_forward_index();
        self.run_from(start, session, ui)
    }

    fn fast_forward_index(&self) -> usize {
        let cursor = self.stream.resume_cursor();
        let instructions = self.stream.instructions();
        let mut idx = cursor + 1;
        while idx < instructions.len() && !instructions[idx].is(Letter::G, 0) {
            idx += 1;
        }
        idx.min(instructions.len())
    }

    fn run_from<T: LineTransport>(&mut self, start: usize, session: &mut Session<T>, ui: &mut impl Interactive) -> Result<()> {
        let len = self.stream.len();
        for idx in start..len {
            let inst = self.stream.instructions()[idx].clone();

            if inst.is(Letter::G, 0) {
                self.stream.set_resume_cursor(idx);
            }

            if inst.letter == Letter::T || inst.is(Letter::M, 6) {
                self.tool_change_pending = true;
                continue;
            }

            if inst.letter == Letter::Star {
                let text = inst.message.clone().unwrap_or_default();
                if self.tool_change_pending {
                    self.pending_prompt = Some(text);
                } else {
                    ui.message(&text);
                }
                continue;
            }

            if inst.is(Letter::M, 0) {
                if self.tool_change_pending {
                    session.set_spindle_off()?;
                    let prompt = self.pending_prompt.take().unwrap_or_else(|| "change tool".to_string());
                    self.run_tool_change(&prompt, session, ui)?;
                    self.tool_change_pending = false;
                } else if !ui.confirm("program paused — resume?") {
                    return Err(Error::other("job aborted by the user at a program pause"));
                }
                continue;
            }

            debug!(instruction = %inst, index = idx, "send_raw");
            session.send_raw(&inst)?;
        }
        info!("job stream complete");
        Ok(())
    }

    fn run_tool_change<T: LineTransport>(&self, prompt: &str, session: &mut Session<T>, ui: &mut impl Interactive) -> Result<()> {
        loop {
            if ui.change_tool(prompt) {
                let pos = session.position()?;
                if (pos.x * pos.x + pos.y * pos.y).sqrt() <= TOOL_CHANGE_POSITION_TOLERANCE {
                    return Ok(());
                }
            }
        }
    }
}

/// Bilinearly warp every defined endpoint through `map`. Unlike
/// [`CamStream::transform`], this is fallible (the map may not be fully
/// probed yet), so instructions are rebuilt by hand rather than through
/// the infallible `transform` closure.
fn warp_stream(stream: &CamStream, map: &HeightMap) -> Result<CamStream> {
    let mut out = Vec::with_capacity(stream.len());
    for inst in stream.instructions() {
        let mut inst = inst.clone();
        if let Some(ep) = inst.endpoint {
            inst.endpoint = Some(map.apply(ep)?);
        }
        out.push(inst);
    }
    Ok(CamStream::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactive::test_support::ScriptedInteractive;
    use cncpcb_controller::transport::MockTransport;
    use cncpcb_core::CancelToken;

    fn border() -> BoundingBox {
        BoundingBox::from_points([Point::new(-100.0, -100.0, 0.0), Point::new(100.0, 100.0, 0.0)])
    }

    fn session_with(lines: &[&str]) -> Session<MockTransport> {
        let transport = MockTransport::with_responses(lines.iter().map(|s| s.to_string()));
        Session::new(transport, CancelToken::new(), false)
    }

    #[test]
    fn load_rejects_layer_outside_border() {
        let small = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 0.0)]);
        let err = JobRunner::load("G1 X10Y10\n", small, None, &Orientation::identity(), 0.0);
        assert!(err.is_err());
    }

    #[test]
    fn run_sends_every_instruction() {
        let mut runner = JobRunner::load("G0 X0Y0Z1\nG1 X1Y0\nM5\n", border(), None, &Orientation::identity(), 0.0).unwrap();
        let mut session = session_with(&["ok", "ok", "ok"]);
        let mut ui = ScriptedInteractive::default();
        runner.run(&mut session, &mut ui).unwrap();
        assert_eq!(session.transport.written.len(), 3);
    }

    #[test]
    fn tool_change_cycle_waits_for_position_and_ok() {
        let text = "T1\n(MSG,Change to tool dia=0.4)\nM0\nG1 X0Y0\n";
        let mut runner = JobRunner::load(text, border(), None, &Orientation::identity(), 0.0).unwrap();
        let mut session = session_with(&["ok", "<Idle|WPos:0,0,0|FS:0,0>", "ok", "[GC:G54]", "ok", "ok"]);
        let mut ui = ScriptedInteractive::default();
        // first attempt: reports done but out of position tolerance is skipped by always returning true
        ui.tool_changes.push_back(true);
        runner.run(&mut session, &mut ui).unwrap();
        assert_eq!(session.transport.written[0], "M5");
    }

    #[test]
    fn program_pause_without_pending_tool_change_requires_confirm() {
        let text = "M0\nG1 X1Y1\n";
        let mut runner = JobRunner::load(text, border(), None, &Orientation::identity(), 0.0).unwrap();
        let mut session = session_with(&["ok"]);
        let mut ui = ScriptedInteractive::default();
        ui.confirms.push_back(false);
        let err = runner.run(&mut session, &mut ui).unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn z_adjust_shifts_every_endpoint() {
        let runner = JobRunner::load("G1 X1Y1Z0\n", border(), None, &Orientation::identity(), 0.25).unwrap();
        let ep = runner.stream().instructions()[0].endpoint.unwrap();
        assert!((ep.z - 0.25).abs() < 1e-9);
    }

    #[test]
    fn fast_forward_skips_to_next_rapid_after_cursor() {
        let text = "G0 X0Y0Z1\nG1 X1Y0\nG1 X2Y0\nG0 X5Y5Z1\nG1 X6Y5\n";
        let mut runner = JobRunner::load(text, border(), None, &Orientation::identity(), 0.0).unwrap();
        runner.stream.set_resume_cursor(0);
        assert_eq!(runner.fast_forward_index(), 3);
    }
}
