use crate::playback::events::{ListenerList, PlaybackEvent};

/// Normalized-progress state machine (`Idle` / `Running`).
///
/// Progress always moves monotonically from the start bound to the end bound chosen when playback
/// starts; the sign of `speed` (flipped by a reverse request) picks `0 -> 1` or `1 -> 0`. Looping
/// restarts from the start bound each cycle.
pub struct PlaybackController {
    progress: f64,
    speed: f64,
    duration_ms: f64,
    looping: bool,
    running: bool,
    reversed: bool,
    pub(crate) listeners: ListenerList,
    events: Vec<PlaybackEvent>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            progress: 0.0,
            speed: 1.0,
            duration_ms: 0.0,
            looping: false,
            running: false,
            reversed: false,
            listeners: ListenerList::default(),
            events: Vec::new(),
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Composition duration at speed 1.
    pub fn set_duration_ms(&mut self, duration_ms: f64) {
        self.duration_ms = duration_ms.abs();
    }

    /// Wall-clock duration of one cycle: `duration / |speed|` (infinite at speed 0).
    pub fn effective_duration_ms(&self) -> f64 {
        if self.speed == 0.0 {
            return f64::INFINITY;
        }
        self.duration_ms / self.speed.abs()
    }

    /// Store a signed speed; a running animation follows the new direction immediately.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_finite() { speed } else { 1.0 };
    }

    fn forward(&self) -> bool {
        (self.speed >= 0.0) != self.reversed
    }

    fn bounds(&self) -> (f64, f64) {
        if self.forward() { (0.0, 1.0) } else { (1.0, 0.0) }
    }

    /// Start running in the chosen direction.
    ///
    /// `continuation` always keeps the current progress, even on the end bound, where the next
    /// advance completes the run. Otherwise progress is kept only strictly inside `(0, 1)` and
    /// reset to the start bound.
    pub fn start(&mut self, reversed: bool, continuation: bool) {
        self.reversed = reversed;
        let (start, _) = self.bounds();
        let keep = continuation || (self.progress > 0.0 && self.progress < 1.0);
        if !keep {
            self.set_progress_inner(start);
        }
        self.running = true;
        self.events.push(PlaybackEvent::Started { reversed });
    }

    /// Stop immediately. Emits `Cancelled` when playback was running.
    pub fn cancel(&mut self) {
        if self.running {
            self.running = false;
            self.events.push(PlaybackEvent::Cancelled);
        }
    }

    /// Jump to `progress` (clamped to `[0, 1]`, NaN treated as `0`). Returns the stored value.
    pub fn set_progress(&mut self, progress: f64) -> f64 {
        let p = clamp_progress(progress);
        self.set_progress_inner(p);
        p
    }

    fn set_progress_inner(&mut self, p: f64) {
        if p != self.progress {
            self.progress = p;
            self.events.push(PlaybackEvent::ProgressChanged(p));
        }
    }

    /// Advance by `elapsed_ms` of wall time. Returns the new progress when running.
    pub fn advance(&mut self, elapsed_ms: f64) -> Option<f64> {
        if !self.running {
            return None;
        }
        let duration = self.effective_duration_ms();
        if !duration.is_finite() || !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return Some(self.progress);
        }
        let delta = if duration > 0.0 {
            elapsed_ms / duration
        } else {
            1.0
        };

        let (start, end) = self.bounds();
        let dir = end - start;
        let next = self.progress + dir * delta;
        let finished = if dir > 0.0 { next >= end } else { next <= end };

        if !finished {
            self.set_progress_inner(next);
            return Some(self.progress);
        }

        if self.looping {
            let overshoot = ((next - end).abs()) % 1.0;
            self.set_progress_inner(start + dir * overshoot);
            self.events.push(PlaybackEvent::Repeated);
        } else {
            self.set_progress_inner(end);
            self.running = false;
            self.events.push(PlaybackEvent::Ended);
        }
        Some(self.progress)
    }

    /// Take events produced since the last call.
    pub(crate) fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Clamp to `[0, 1]`; NaN becomes `0`.
pub(crate) fn clamp_progress(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
