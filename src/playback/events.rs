use std::sync::Arc;

/// Notifications emitted by a player. Listeners run after the player's lock is released.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    /// Playback started or resumed.
    Started {
        /// Progress runs toward `0`.
        reversed: bool,
    },
    /// Normalized progress changed.
    ProgressChanged(f64),
    /// The tree holds a new frame; the host should redraw.
    FrameUpdated,
    /// A looping cycle finished and restarted.
    Repeated,
    /// Playback reached its end bound and stopped.
    Ended,
    /// Playback was stopped by `cancel`.
    Cancelled,
}

/// Receiver of [`PlaybackEvent`]s.
pub trait PlaybackListener: Send + Sync {
    fn on_event(&self, event: &PlaybackEvent);
}

impl<F> PlaybackListener for F
where
    F: Fn(&PlaybackEvent) + Send + Sync,
{
    fn on_event(&self, event: &PlaybackEvent) {
        self(event)
    }
}

/// Handle returned by `add_listener`, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Host frame clock. Told when ticks are needed; calls back into the player's `tick`.
pub trait Scheduler: Send + Sync {
    /// Start (`true`) or stop (`false`) delivering ticks.
    fn set_active(&self, active: bool);
}

/// Play/reverse request waiting for a composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PendingStart {
    #[default]
    None,
    PlayPending,
    ReversePending,
}

#[derive(Default)]
pub(crate) struct ListenerList {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn PlaybackListener>)>,
}

impl ListenerList {
    pub(crate) fn add(&mut self, listener: Arc<dyn PlaybackListener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(i, _)| *i != id);
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Listener handles to notify outside the lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn PlaybackListener>> {
        self.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}
