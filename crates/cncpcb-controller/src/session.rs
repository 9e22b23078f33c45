//! The blocking GRBL controller session: wire protocol, cached state
//! mirror, and the motion/settings contract.

use crate::error_codes::{decode_alarm, decode_error};
use crate::status::{parse_gc_line, parse_status_line};
use crate::transport::LineTransport;
use cncpcb_core::constants::{
    ALARM_SETTLE_DELAY_MS, MIN_SAFE_HEIGHT, SAFE_Z_FLOOR, STATUS_POLL_INTERVAL_MS,
};
use cncpcb_core::error::{ControllerError, ProtocolError};
use cncpcb_core::{CamInstruction, CancelToken, Error, Point, Result, Vector};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Which axis a `home`/move clamp applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Whether a move respects the safe-Z floor/clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    Safe,
    Unsafe,
}

/// The session's lazily-populated, invalidate-on-motion state mirror.
#[derive(Debug, Clone, Copy)]
pub struct StatusMirror {
    pub wcs: u8,
    pub position: Point,
    pub feed_rate: f64,
    pub spindle_speed: f64,
    pub spindle_on: bool,
    pub touches_ground: bool,
    pub idle: bool,
    pub alarm: bool,
}

/// A GRBL controller session bound to a blocking [`LineTransport`].
///
/// Single-threaded cooperative: every method writes one command and reads
/// its response to completion before returning, per the concurrency model.
pub struct Session<T: LineTransport> {
    transport: T,
    cancel: CancelToken,
    dump_wire: bool,
    cache: Option<StatusMirror>,
    wco_cache: Option<Vector>,
    settings_cache: HashMap<i64, f64>,
}

impl<T: LineTransport> Session<T> {
    pub fn new(transport: T, cancel: CancelToken, dump_wire: bool) -> Self {
        Session {
            transport,
            cancel,
            dump_wire,
            cache: None,
            wco_cache: None,
            settings_cache: HashMap::new(),
        }
    }

    fn io_err(e: std::io::Error) -> Error {
        ProtocolError::Violation { reason: e.to_string() }.into()
    }

    /// Send one command line and read its response to completion, per the
    /// wire protocol's line classification table.
    pub fn talk(&mut self, cmd: &str) -> Result<Vec<String>> {
        if self.dump_wire {
            trace!(">> {}", cmd);
        }
        self.transport.write_line(cmd).map_err(Self::io_err)?;

        let mut resp = Vec::new();
        loop {
            if self.cancel.is_cancelled() {
                return Err(ProtocolError::Cancelled.into());
            }
            let line = self.transport.read_line().map_err(Self::io_err)?;
            let Some(line) = line else {
                if self.cancel.is_cancelled() {
                    return Err(ProtocolError::Cancelled.into());
                }
                return Err(ProtocolError::Violation {
                    reason: "stream closed".into(),
                }
                .into());
            };
            let line = line.trim_end_matches('\r').to_string();
            if self.dump_wire {
                trace!("<< {}", line);
            }

            if line == "ok" {
                return Ok(resp);
            }
            if let Some(rest) = line.strip_prefix("error:") {
                let code: u32 = rest.parse().unwrap_or(0);
                return Err(ControllerError::Error {
                    code,
                    message: decode_error(code).to_string(),
                }
                .into());
            }
            if let Some(rest) = line.strip_prefix("ALARM:") {
                let code: u32 = rest.parse().unwrap_or(0);
                std::thread::sleep(Duration::from_millis(ALARM_SETTLE_DELAY_MS));
                return Err(ControllerError::Alarm {
                    code,
                    message: decode_alarm(code).to_string(),
                }
                .into());
            }
            if line.starts_with("[MSG:") && line.ends_with(']') {
                info!(message = %line, "controller message");
                continue;
            }
            if line.starts_with('<') && line.ends_with('>') {
                resp.push(line[..line.len() - 1].to_string());
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                resp.push(line[..line.len() - 1].to_string());
                continue;
            }
            if line.starts_with("Grbl ") {
                warn!("unsolicited controller reset observed mid-command");
                self.reset()?;
                return Err(ProtocolError::UnsolicitedReset.into());
            }
            if line.starts_with('$') && line.contains('=') {
                resp.push(line);
                continue;
            }
            // anything else: ignore
        }
    }

    /// Drain incoming lines until the `Grbl ` banner, iteratively (never by
    /// recursing back through `talk`, which is what the original's
    /// reset-inside-talk call risked).
    fn drain_until_banner(&mut self) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(ProtocolError::Cancelled.into());
            }
            let line = self.transport.read_line().map_err(Self::io_err)?;
            let Some(line) = line else {
                return Err(ProtocolError::Violation {
                    reason: "stream closed while waiting for Grbl banner".into(),
                }
                .into());
            };
            if self.dump_wire {
                trace!("<< {}", line);
            }
            if line.starts_with("Grbl ") {
                return Ok(());
            }
        }
    }

    /// Clear any half-parsed state, send the soft-reset byte, and drain
    /// until the banner reappears.
    pub fn reset(&mut self) -> Result<()> {
        self.cache = None;
        self.wco_cache = None;
        self.transport.send_realtime_byte(0x18).map_err(Self::io_err)?;
        self.drain_until_banner()
    }

    /// Startup sequence: reset, then (unless alarmed) initialise mm/absolute.
    pub fn rebind(&mut self) -> Result<()> {
        self.reset()?;
        let status = *self.status()?;
        if status.alarm {
            warn!("controller reports alarm state; homing required, leaving in alarm");
        } else {
            self.talk("G21")?;
            self.talk("G90")?;
        }
        Ok(())
    }

    fn refill_status(&mut self) -> Result<()> {
        let mut status_line = None;
        while status_line.is_none() {
            let resp = self.talk("?")?;
            status_line = resp.into_iter().find(|l| l.starts_with('<'));
        }
        let fields = parse_status_line(&status_line.unwrap());

        if let Some(w) = fields.wco {
            self.wco_cache = Some(w);
        }
        let position = if let Some(w) = fields.wpos {
            w
        } else if let (Some(m), Some(wco)) = (fields.mpos, self.wco_cache) {
            Point::new(m.x - wco.x, m.y - wco.y, m.z - wco.z)
        } else if let Some(m) = fields.mpos {
            m
        } else {
            return Err(ProtocolError::Violation {
                reason: "status report missing position".into(),
            }
            .into());
        };

        let mut gc_line = None;
        while gc_line.is_none() {
            let resp = self.talk("$G")?;
            gc_line = resp.into_iter().find(|l| l.starts_with("[GC:"));
        }
        let parser = parse_gc_line(&gc_line.unwrap());

        let prior_wcs = self.cache.map(|c| c.wcs).unwrap_or(0);

        self.cache = Some(StatusMirror {
            wcs: parser.wcs.unwrap_or(prior_wcs),
            position,
            feed_rate: parser.feed_rate.or(fields.feed_rate).unwrap_or(0.0),
            spindle_speed: fields.spindle_speed.or(parser.spindle_speed).unwrap_or(0.0),
            spindle_on: fields.spindle_on.unwrap_or(false),
            touches_ground: fields.touches_ground,
            idle: fields.idle,
            alarm: fields.alarm,
        });
        Ok(())
    }

    /// Cached status, refilling lazily.
    pub fn status(&mut self) -> Result<&StatusMirror> {
        if self.cache.is_none() {
            self.refill_status()?;
        }
        Ok(self.cache.as_ref().unwrap())
    }

    /// Invalidate the cached mirror; the next [`Session::status`] call
    /// refills it.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn wait_until_idle(&mut self) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(ProtocolError::Cancelled.into());
            }
            self.invalidate();
            if self.status()?.idle {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(STATUS_POLL_INTERVAL_MS));
        }
    }

    pub fn position(&mut self) -> Result<Point> {
        Ok(self.status()?.position)
    }

    pub fn absolute_position(&mut self) -> Result<Point> {
        let wco = self.wco()?;
        let pos = self.position()?;
        Ok(Point::new(pos.x + wco.x, pos.y + wco.y, pos.z + wco.z))
    }

    pub fn redefine_position(&mut self, p: Point) -> Result<()> {
        self.talk(&format!("G10 P0 L20 X{:.3} Y{:.3} Z{:.3}", p.x, p.y, p.z))?;
        self.wco_cache = None;
        if let Some(c) = self.cache.as_mut() {
            c.position = p;
        }
        Ok(())
    }

    pub fn move_point(&mut self, mut p: Point, mode: MoveMode) -> Result<()> {
        if mode == MoveMode::Safe && p.z < MIN_SAFE_HEIGHT {
            self.move_z(MIN_SAFE_HEIGHT, MoveMode::Unsafe)?;
            p.z = MIN_SAFE_HEIGHT;
        }
        self.talk(&format!("G0 X{:.3} Y{:.3} Z{:.3}", p.x, p.y, p.z))?;
        self.invalidate();
        Ok(())
    }

    pub fn move_xy(&mut self, xy: Point, mode: MoveMode) -> Result<()> {
        let z = self.position()?.z;
        self.move_point(Point::new(xy.x, xy.y, z), mode)
    }

    pub fn move_z(&mut self, z: f64, mode: MoveMode) -> Result<()> {
        let z = if mode == MoveMode::Safe { z.max(SAFE_Z_FLOOR) } else { z };
        self.talk(&format!("G0 Z{:.3}", z))?;
        self.invalidate();
        Ok(())
    }

    pub fn feed(&mut self, p: Point) -> Result<()> {
        self.talk(&format!("G1 X{:.3} Y{:.3} Z{:.3}", p.x, p.y, p.z))?;
        self.invalidate();
        Ok(())
    }

    pub fn feed_z(&mut self, z: f64) -> Result<()> {
        self.talk(&format!("G1 Z{:.3}", z))?;
        self.invalidate();
        Ok(())
    }

    fn read_hash(&mut self, name: &str, index: usize) -> Result<String> {
        self.wait_until_idle()?;
        let resp = self.talk("$#")?;
        for line in &resp {
            let parts: Vec<&str> = line.split(':').collect();
            if parts.first() == Some(&name) {
                if let Some(v) = parts.get(index) {
                    return Ok((*v).to_string());
                }
            }
        }
        Err(ProtocolError::Violation {
            reason: format!("$# response missing {name}"),
        }
        .into())
    }

    fn parse_csv_triple(s: &str) -> (f64, f64, f64) {
        let mut it = s.split(',').map(|v| v.trim().parse::<f64>().unwrap_or(0.0));
        (it.next().unwrap_or(0.0), it.next().unwrap_or(0.0), it.next().unwrap_or(0.0))
    }

    /// Work coordinate offset, cached until invalidated by a WCS change.
    pub fn wco(&mut self) -> Result<Vector> {
        if let Some(w) = self.wco_cache {
            return Ok(w);
        }
        let s = self.read_hash("[G54", 1)?;
        let (x, y, z) = Self::parse_csv_triple(&s);
        let v = Vector::new(x, y, z);
        self.wco_cache = Some(v);
        Ok(v)
    }

    pub fn probe(&mut self) -> Result<f64> {
        let saved_feed = self.status()?.feed_rate;
        let max_travel = self.max_travel()?;
        let wco = self.wco()?;
        let target_z = -(max_travel.z + wco.z - 1.0);
        self.talk(&format!("G38.2 F15 Z{:.3}", target_z))?;
        self.wait_until_idle()?;
        let s = self.read_hash("[PRB", 1)?;
        let (_, _, z) = Self::parse_csv_triple(&s);
        self.set_feed_rate(saved_feed)?;
        self.invalidate();
        Ok(z - wco.z)
    }

    pub fn home(&mut self, axis: Axis) -> Result<()> {
        let name = match axis {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        self.talk(&format!("$H{name}"))?;
        self.invalidate();
        Ok(())
    }

    pub fn home_all(&mut self) -> Result<()> {
        self.talk("$X")?;
        self.home(Axis::Z)?;
        let wco = self.wco()?;
        self.move_z(-0.1 - wco.z, MoveMode::Unsafe)?;
        self.wait_until_idle()?;
        self.home(Axis::X)?;
        self.home(Axis::Y)?;
        self.talk("G21")?;
        self.talk("G90")?;
        self.invalidate();
        Ok(())
    }

    pub fn select_wcs(&mut self, wcs: u8) -> Result<()> {
        if wcs > 5 {
            return Err(Error::other(format!("wcs out of range: {wcs}")));
        }
        self.talk(&format!("G{}", 54 + wcs))?;
        self.wco_cache = None;
        self.invalidate();
        Ok(())
    }

    /// Select `wcs` for the duration of `f`, restoring the prior WCS
    /// afterward even if `f` fails.
    pub fn with_temporary_wcs<R>(&mut self, wcs: u8, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let prior = self.status()?.wcs;
        self.select_wcs(wcs)?;
        let result = f(self);
        self.select_wcs(prior)?;
        result
    }

    pub fn set_spindle_speed(&mut self, speed: f64) -> Result<()> {
        self.talk(&format!("S{:.0}", speed))?;
        if let Some(c) = self.cache.as_mut() {
            c.spindle_speed = speed;
        }
        Ok(())
    }

    pub fn set_spindle_on(&mut self) -> Result<()> {
        if self.status()?.spindle_speed < 1.0 {
            self.set_spindle_speed(100.0)?;
        }
        self.talk("M3")?;
        if let Some(c) = self.cache.as_mut() {
            c.spindle_on = true;
        }
        Ok(())
    }

    /// Faithfully reproduces the source's `set_spindle_off`, which leaves
    /// `spindle_on = true` in the mirror (flagged as an apparent typo, not
    /// corrected here — see the design notes' open question).
    pub fn set_spindle_off(&mut self) -> Result<()> {
        self.talk("M5")?;
        if let Some(c) = self.cache.as_mut() {
            c.spindle_on = true;
        }
        Ok(())
    }

    pub fn set_feed_rate(&mut self, feed: f64) -> Result<()> {
        self.talk(&format!("F{:.0}", feed))?;
        if let Some(c) = self.cache.as_mut() {
            c.feed_rate = feed;
        }
        Ok(())
    }

    pub fn dwell(&mut self, seconds: f64) -> Result<()> {
        self.talk(&format!("G4 P{seconds:.3}"))?;
        Ok(())
    }

    pub fn send_raw(&mut self, inst: &CamInstruction) -> Result<()> {
        debug!(instruction = %inst, "send_raw");
        self.talk(&format!("{inst}"))?;
        self.invalidate();
        Ok(())
    }

    pub fn setting(&mut self, index: i64) -> Result<f64> {
        if self.settings_cache.is_empty() {
            let resp = self.talk("$$")?;
            for line in resp {
                if let Some(rest) = line.strip_prefix('$') {
                    if let Some((idx, val)) = rest.split_once('=') {
                        if let (Ok(i), Ok(v)) = (idx.parse::<i64>(), val.parse::<f64>()) {
                            self.settings_cache.insert(i, v);
                        }
                    }
                }
            }
        }
        Ok(*self.settings_cache.get(&index).unwrap_or(&0.0))
    }

    pub fn vector_setting(&mut self, index: i64) -> Result<Vector> {
        Ok(Vector::new(
            self.setting(index)?,
            self.setting(index + 1)?,
            self.setting(index + 2)?,
        ))
    }

    /// `(int)setting(index)` interpreted as a 3-bit mask, returning
    /// per-axis signs (`-1` if the bit is set, else `+1`).
    pub fn mask_setting(&mut self, index: i64) -> Result<Vector> {
        let mask = self.setting(index)? as i64;
        let sign = |bit: i64| if mask & bit != 0 { -1.0 } else { 1.0 };
        Ok(Vector::new(sign(1), sign(2), sign(4)))
    }

    pub fn max_travel(&mut self) -> Result<Vector> {
        self.vector_setting(130)
    }

    pub fn homing_direction(&mut self) -> Result<Vector> {
        self.mask_setting(23)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn session_with(lines: &[&str]) -> Session<MockTransport> {
        let transport = MockTransport::with_responses(lines.iter().map(|s| s.to_string()));
        Session::new(transport, CancelToken::new(), false)
    }

    #[test]
    fn scenario_1_rebind_sends_g21_g90_after_banner() {
        let mut session = session_with(&[
            "Grbl 1.1h",
            "<Idle|WPos:0,0,0|FS:0,0>",
            "ok",
            "[GC:G0 G54 G17 G21 G90 G94]",
            "ok",
            "ok",
            "ok",
        ]);
        session.rebind().unwrap();
        assert!(!session.status().unwrap().alarm);
        assert_eq!(session.transport.written[session.transport.written.len() - 2], "G21");
        assert_eq!(session.transport.written[session.transport.written.len() - 1], "G90");
    }

    #[test]
    fn scenario_2_position_from_wpos() {
        let mut session = session_with(&["<Idle|WPos:1,2,3|FS:0,0>", "ok", "[GC:G54]", "ok"]);
        let p = session.position().unwrap();
        assert_eq!((p.x, p.y, p.z), (1.0, 2.0, 3.0));
    }

    #[test]
    fn scenario_3_position_from_mpos_minus_wco() {
        let mut session = session_with(&[
            "<Run|MPos:10,10,0|WCO:5,5,0|FS:100,1000>",
            "ok",
            "[GC:G54]",
            "ok",
        ]);
        let p = session.position().unwrap();
        assert_eq!((p.x, p.y, p.z), (5.0, 5.0, 0.0));
        assert!(session.status().unwrap().spindle_on);
    }

    #[test]
    fn scenario_7_controller_error_code_is_typed_and_session_stays_usable() {
        let mut session = session_with(&["error:9", "ok"]);
        let err = session.talk("G0").unwrap_err();
        match err {
            Error::Controller(ControllerError::Error { code, .. }) => assert_eq!(code, 9),
            other => panic!("expected controller error, got {other:?}"),
        }
        // session remains usable for the next command
        assert!(session.talk("G0").is_ok());
    }

    #[test]
    fn scenario_8_cancellation_during_wait() {
        let mut session = session_with(&[]);
        session.cancel.cancel();
        let err = session.wait_until_idle().unwrap_err();
        assert!(err.is_cancellation());
    }

    #[test]
    fn alarm_carries_code_and_settles() {
        let mut session = session_with(&["ALARM:1"]);
        let err = session.talk("$H").unwrap_err();
        match err {
            Error::Controller(ControllerError::Alarm { code, .. }) => assert_eq!(code, 1),
            other => panic!("expected controller alarm, got {other:?}"),
        }
    }

    #[test]
    fn move_safe_raises_before_descending() {
        let mut session = session_with(&["<Idle|WPos:0,0,1.0|FS:0,0>", "ok", "[GC:G54]", "ok", "ok", "ok"]);
        session.move_point(Point::new(5.0, 5.0, 0.0), MoveMode::Safe).unwrap();
        assert_eq!(session.transport.written[0], "?");
        assert_eq!(session.transport.written[2], "$G");
        assert_eq!(session.transport.written[4], "G0 Z0.600");
        assert_eq!(session.transport.written[5], "G0 X5.000 Y5.000 Z0.600");
    }
}
