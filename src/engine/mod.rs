//! Branching engine.
//!
//! Depth-first walk over a reusable, grow-only stack of layers, driving
//! the period sampler and event sampler and firing callbacks on a
//! caller-supplied [`PathObserver`]. The stack is an explicit per-frame
//! cursor rather than a `todo: Vec<Branch>` worklist so each frame's
//! allocation is reused across paths instead of reallocated per descent.

use crate::core::{Time, INITIAL_STACK_CAPACITY, STACK_GROWTH_FACTOR};
use crate::event::{sample_events, EventSample};
use crate::params::ModelParams;
use crate::period::{sample_period, PeriodSample};
use crate::rng::Substream;

/// One stack slot: the sampled state of a single infectious individual on
/// the active descent path, plus the engine's cursor into its events.
pub struct Frame<D> {
    pub generation: u32,
    pub parent_event_time: Time,
    pub period: PeriodSample,
    pub events: Vec<EventSample>,
    cur_event_i: usize,
    cur_infection_i: u32,
    event_started: bool,
    /// Per-frame scratch owned by the observer, allocated once when this
    /// depth is first reached ([`PathObserver::on_layers_grown`]) and
    /// reused thereafter.
    pub user_data: D,
}

impl<D: Default> Frame<D> {
    fn new() -> Self {
        Self {
            generation: 0,
            parent_event_time: 0.0,
            period: PeriodSample {
                latent_period: 0.0,
                comm_period: 0.0,
                end_comm_period: 0.0,
                commper_type: 0,
                truncated_by_tmax: false,
            },
            events: Vec::new(),
            cur_event_i: 0,
            cur_infection_i: 0,
            event_started: false,
            user_data: D::default(),
        }
    }

    fn fill<S: Substream + ?Sized>(&mut self, generation: u32, parent_event_time: Time, params: &ModelParams, rng: &mut S) {
        self.generation = generation;
        self.parent_event_time = parent_event_time;
        self.period = sample_period(params, parent_event_time, rng);
        self.events = sample_events(params, self.period.comm_period, self.period.end_comm_period, rng);
        self.cur_event_i = 0;
        self.cur_infection_i = 0;
        self.event_started = false;
    }
}

/// What the engine should do after a path completes.
pub enum PathOutcome {
    Done,
    Retry,
}

/// The callback set a branching-engine instance drives. A single trait
/// groups every callback so the compiler can devirtualize a concrete
/// implementor, rather than many small polymorphic holders.
pub trait PathObserver {
    /// Per-frame scratch allocated once per stack depth
    /// ([`Frame::user_data`]).
    type FrameData: Default;

    /// `parent` is the virtual parent frame for a primary (`None` when the
    /// primary has no modeled parent).
    fn on_primary_init(&mut self, child: &Frame<Self::FrameData>, parent: Option<&Frame<Self::FrameData>>);
    /// Called once per transmission event before its children are visited.
    /// Returning `false` skips the event's children entirely; an observer
    /// that has hit `nimax` should latch internally and keep returning
    /// `false` for the remainder of the path.
    fn on_new_event(&mut self, frame: &mut Frame<Self::FrameData>, event: EventSample) -> bool;
    fn on_infectious_noevent(&mut self, frame: &Frame<Self::FrameData>, parent: Option<&Frame<Self::FrameData>>);
    fn on_infectious_done(&mut self, frame: &Frame<Self::FrameData>, parent: Option<&Frame<Self::FrameData>>);
    /// Fired when the stack grows; `new_frames` is the newly appended
    /// suffix, letting the observer lazily initialize `FrameData`.
    fn on_layers_grown(&mut self, new_frames: &mut [Frame<Self::FrameData>]);
    fn on_path_end(&mut self) -> PathOutcome;
}

/// Owns the reusable layer stack and drives one [`PathObserver`] through
/// `nstart`-primary paths.
pub struct Engine<O: PathObserver> {
    frames: Vec<Frame<O::FrameData>>,
}

impl<O: PathObserver> Engine<O> {
    pub fn new() -> Self {
        let mut frames = Vec::with_capacity(INITIAL_STACK_CAPACITY);
        for _ in 0..INITIAL_STACK_CAPACITY {
            frames.push(Frame::new());
        }
        Self { frames }
    }

    fn ensure_capacity(&mut self, depth: usize, observer: &mut O) {
        if depth + 1 < self.frames.len() {
            return;
        }
        let old_len = self.frames.len();
        let new_len = ((old_len as f64) * STACK_GROWTH_FACTOR).ceil() as usize + 1;
        self.frames.resize_with(new_len, Frame::new);
        observer.on_layers_grown(&mut self.frames[old_len..]);
    }

    /// Runs one full path: `nstart` primaries descended to extinction or
    /// `tmax`, with observer-driven retry.
    pub fn run_path<S: Substream + ?Sized>(&mut self, params: &ModelParams, rng: &mut S, observer: &mut O) {
        loop {
            for _ in 0..params.nstart {
                self.ensure_capacity(1, observer);
                self.frames[1].fill(1, 0.0, params, rng);
                observer.on_primary_init(&self.frames[1], Some(&self.frames[0]));
                self.descend(1, params, rng, observer);
            }
            match observer.on_path_end() {
                PathOutcome::Done => return,
                PathOutcome::Retry => continue,
            }
        }
    }

    /// Iterative depth-first descent starting at `start_depth`, returning
    /// once the subtree rooted there is fully visited and popped.
    fn descend<S: Substream + ?Sized>(
        &mut self,
        start_depth: usize,
        params: &ModelParams,
        rng: &mut S,
        observer: &mut O,
    ) {
        let mut depth = start_depth;
        loop {
            let n_events = self.frames[depth].events.len();
            let cur_event_i = self.frames[depth].cur_event_i;

            if cur_event_i >= n_events {
                let parent = Some(&self.frames[depth - 1]);
                if n_events == 0 {
                    observer.on_infectious_noevent(&self.frames[depth], parent);
                } else {
                    observer.on_infectious_done(&self.frames[depth], parent);
                }
                if depth == start_depth {
                    return;
                }
                depth -= 1;
                continue;
            }

            if !self.frames[depth].event_started {
                let event = self.frames[depth].events[cur_event_i];
                let accepted = observer.on_new_event(&mut self.frames[depth], event);
                self.frames[depth].event_started = true;
                if !accepted {
                    self.frames[depth].event_started = false;
                    self.frames[depth].cur_event_i += 1;
                    continue;
                }
            }

            let event = self.frames[depth].events[cur_event_i];
            let cur_infection_i = self.frames[depth].cur_infection_i;
            if cur_infection_i >= event.n_infections {
                self.frames[depth].event_started = false;
                self.frames[depth].cur_infection_i = 0;
                self.frames[depth].cur_event_i += 1;
                continue;
            }

            self.frames[depth].cur_infection_i += 1;
            let child_depth = depth + 1;
            let generation = self.frames[depth].generation + 1;
            self.ensure_capacity(child_depth, observer);
            self.frames[child_depth].fill(generation, event.event_time, params, rng);
            depth = child_depth;
        }
    }
}

impl<O: PathObserver> Default for Engine<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{resolve, GroupDist, RawParams};
    use crate::rng::RngStream;

    #[derive(Default)]
    struct Counts {
        primaries: u32,
        events_seen: u32,
        frames_ended: u32,
    }

    struct CountingObserver {
        counts: Counts,
    }

    impl PathObserver for CountingObserver {
        type FrameData = ();

        fn on_primary_init(&mut self, _child: &Frame<()>, _parent: Option<&Frame<()>>) {
            self.counts.primaries += 1;
        }

        fn on_new_event(&mut self, _frame: &mut Frame<()>, _event: EventSample) -> bool {
            self.counts.events_seen += 1;
            true
        }

        fn on_infectious_noevent(&mut self, _frame: &Frame<()>, _parent: Option<&Frame<()>>) {
            self.counts.frames_ended += 1;
        }

        fn on_infectious_done(&mut self, _frame: &Frame<()>, _parent: Option<&Frame<()>>) {
            self.counts.frames_ended += 1;
        }

        fn on_layers_grown(&mut self, _new_frames: &mut [Frame<()>]) {}

        fn on_path_end(&mut self) -> PathOutcome {
            PathOutcome::Done
        }
    }

    fn small_params() -> ModelParams {
        let raw = RawParams {
            tbar: Some(2.0),
            kappa: Some(f64::INFINITY),
            g_ave: Some(2.5),
            r0: Some(0.3),
            pinf: Some(1.0),
            group: GroupDist::LogPlus1,
            tmax: Some(10.0),
            nstart: Some(1),
            ..Default::default()
        };
        resolve(&raw).unwrap()
    }

    #[test]
    fn path_terminates_and_visits_every_primary() {
        let params = small_params();
        let mut rng = RngStream::split(9, 0);
        let mut engine: Engine<CountingObserver> = Engine::new();
        let mut observer = CountingObserver { counts: Counts::default() };
        engine.run_path(&params, &mut rng, &mut observer);
        assert_eq!(observer.counts.primaries, 1);
        assert!(observer.counts.frames_ended >= 1);
    }

    #[test]
    fn many_paths_all_terminate() {
        let params = small_params();
        let mut rng = RngStream::split(10, 0);
        let mut engine: Engine<CountingObserver> = Engine::new();
        for _ in 0..200 {
            let mut observer = CountingObserver { counts: Counts::default() };
            engine.run_path(&params, &mut rng, &mut observer);
            assert_eq!(observer.counts.primaries, 1);
        }
    }
}
