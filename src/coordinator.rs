//! Generation-counted coordination of analytic recomputation.
//!
//! Each analytic view owns a [`Coordinator`]. Whenever the selection changes,
//! the coordinator's generation is bumped. Recomputation is requested by
//! [issuing](Coordinator::issue) a [`Ticket`] stamped with the current
//! generation, and the result is handed back through
//! [`Coordinator::complete()`]. Results whose ticket does not carry the
//! current generation are discarded without being rendered, which resolves
//! races between overlapping requests that finish out of order.
//!
//! ```
//! use cellsets::coordinator::Arity;
//! use cellsets::coordinator::Coordinator;
//! use cellsets::coordinator::Outcome;
//! use cellsets::coordinator::Rendered;
//!
//! let mut coordinator = Coordinator::<&str>::new(Arity::Exactly(2));
//!
//! coordinator.selection_changed();
//! let first = coordinator.issue(&[10, 20]).unwrap();
//!
//! coordinator.selection_changed();
//! let second = coordinator.issue(&[10, 30]).unwrap();
//!
//! // The second request finishes first.
//! assert_eq!(coordinator.complete(second, Some("second")), Outcome::Applied);
//! assert_eq!(
//!     coordinator.complete(first, Some("first")),
//!     Outcome::Discarded { refire: false }
//! );
//!
//! assert_eq!(coordinator.rendered(), &Rendered::Ready("second"));
//! ```

use tracing::debug;

/// The number of non-empty groups a view requires before it can recompute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    /// Exactly this many groups, each of which must be non-empty.
    Exactly(usize),

    /// At least this many non-empty groups.
    AtLeast(usize),
}

impl Arity {
    /// Returns whether groups of the given sizes satisfy the requirement.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::coordinator::Arity;
    ///
    /// assert!(Arity::Exactly(2).is_satisfied_by(&[3, 4]));
    /// assert!(!Arity::Exactly(2).is_satisfied_by(&[3, 0]));
    /// assert!(!Arity::Exactly(2).is_satisfied_by(&[3, 4, 5]));
    ///
    /// assert!(Arity::AtLeast(2).is_satisfied_by(&[3, 0, 5]));
    /// assert!(!Arity::AtLeast(2).is_satisfied_by(&[3, 0]));
    /// ```
    pub fn is_satisfied_by(&self, sizes: &[usize]) -> bool {
        match self {
            Arity::Exactly(n) => sizes.len() == *n && sizes.iter().all(|size| *size > 0),
            Arity::AtLeast(n) => sizes.iter().filter(|size| **size > 0).count() >= *n,
        }
    }
}

/// The state of a coordinator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// Nothing is pending or in flight for the current selection.
    Idle,

    /// The selection changed and recomputation has not yet been issued.
    SelectionPending,

    /// A request for the current selection is in flight.
    Recomputing,
}

/// An event that drives a coordinator between states.
#[derive(Debug)]
enum Event {
    /// The selection changed.
    SelectionChanged,

    /// Recomputation was requested. `satisfied` reports whether the resolved
    /// selection met the view's arity.
    Issued { satisfied: bool },

    /// The request for the current generation completed.
    Completed,
}

/// What a view should display.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Rendered<T> {
    /// The selection does not satisfy the view's arity (e.g., "select two
    /// groups").
    #[default]
    Prompt,

    /// A request is in flight.
    Loading,

    /// A request completed without usable data.
    NoData,

    /// A request completed with data.
    Ready(T),
}

/// A handle for an issued request.
///
/// Tickets are not [`Clone`], so each issued request completes
/// at most once.
#[derive(Debug, Eq, PartialEq)]
pub struct Ticket {
    /// The generation at the time the request was issued.
    generation: u64,
}

impl Ticket {
    /// Gets the generation the ticket was issued for.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The outcome of completing a request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The result was for the current generation and is now rendered.
    Applied,

    /// The result was stale and was dropped.
    Discarded {
        /// Whether the selection has changed since the last issue, meaning a
        /// fresh request should be issued now.
        refire: bool,
    },
}

/// Coordinates recomputation for a single analytic view.
#[derive(Debug)]
pub struct Coordinator<T> {
    /// The arity the view requires.
    arity: Arity,

    /// The current state.
    state: State,

    /// The current selection generation.
    generation: u64,

    /// What the view is displaying.
    rendered: Rendered<T>,
}

impl<T> Coordinator<T> {
    /// Creates a new coordinator for a view with the given arity.
    pub fn new(arity: Arity) -> Self {
        Self {
            arity,
            state: State::Idle,
            generation: 0,
            rendered: Rendered::Prompt,
        }
    }

    /// Gets the arity.
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Gets the current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Gets the current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Gets what the view is displaying.
    pub fn rendered(&self) -> &Rendered<T> {
        &self.rendered
    }

    /// Records that the selection changed.
    ///
    /// Any request that is in flight becomes stale.
    pub fn selection_changed(&mut self) {
        self.generation += 1;
        self.state = get_state(self.state, Event::SelectionChanged);
    }

    /// Requests recomputation for a selection whose groups have the given
    /// sizes.
    ///
    /// If the sizes do not satisfy the view's arity, no request should be
    /// dispatched: the view renders a prompt and `None` is returned.
    /// Otherwise, the view renders as loading and a ticket for the current
    /// generation is returned.
    pub fn issue(&mut self, sizes: &[usize]) -> Option<Ticket> {
        let satisfied = self.arity.is_satisfied_by(sizes);
        self.state = get_state(self.state, Event::Issued { satisfied });

        match satisfied {
            true => {
                self.rendered = Rendered::Loading;
                Some(Ticket {
                    generation: self.generation,
                })
            }
            false => {
                self.rendered = Rendered::Prompt;
                None
            }
        }
    }

    /// Hands back the result of an issued request.
    ///
    /// A result of `None` renders as [`Rendered::NoData`]. Results for any
    /// generation other than the current one are discarded.
    pub fn complete(&mut self, ticket: Ticket, result: Option<T>) -> Outcome {
        if ticket.generation != self.generation {
            debug!(
                "discarding stale result for generation {} (current: {})",
                ticket.generation, self.generation
            );

            return Outcome::Discarded {
                refire: self.state == State::SelectionPending,
            };
        }

        self.state = get_state(self.state, Event::Completed);
        self.rendered = match result {
            Some(result) => Rendered::Ready(result),
            None => Rendered::NoData,
        };

        Outcome::Applied
    }

    /// Returns to the initial state, invalidating any request in flight.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = State::Idle;
        self.rendered = Rendered::Prompt;
    }
}

/// Gets the next state given the previous state and the event that occurred.
fn get_state(last: State, event: Event) -> State {
    match (last, event) {
        // A change at any point leaves a recomputation owed for the new
        // selection. A request still in flight is now stale.
        (_, Event::SelectionChanged) => State::SelectionPending,
        (_, Event::Issued { satisfied: true }) => State::Recomputing,
        (_, Event::Issued { satisfied: false }) => State::Idle,
        (State::Recomputing, Event::Completed) => State::Idle,
        // Completion is only reported for the current generation, which
        // cannot be outstanding unless a request is in flight.
        (state, Event::Completed) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsatisfied_selections_render_a_prompt() {
        let mut coordinator = Coordinator::<()>::new(Arity::Exactly(2));

        coordinator.selection_changed();
        assert_eq!(coordinator.state(), State::SelectionPending);

        assert!(coordinator.issue(&[5]).is_none());
        assert_eq!(coordinator.state(), State::Idle);
        assert_eq!(coordinator.rendered(), &Rendered::Prompt);
    }

    #[test]
    fn completion_returns_to_idle() {
        let mut coordinator = Coordinator::new(Arity::AtLeast(2));

        coordinator.selection_changed();
        let ticket = coordinator.issue(&[1, 1]).unwrap();
        assert_eq!(coordinator.state(), State::Recomputing);
        assert_eq!(coordinator.rendered(), &Rendered::Loading);

        assert_eq!(coordinator.complete(ticket, Some(42)), Outcome::Applied);
        assert_eq!(coordinator.state(), State::Idle);
        assert_eq!(coordinator.rendered(), &Rendered::Ready(42));
    }

    #[test]
    fn empty_results_render_no_data() {
        let mut coordinator = Coordinator::<Vec<u8>>::new(Arity::Exactly(2));

        coordinator.selection_changed();
        let ticket = coordinator.issue(&[1, 1]).unwrap();
        coordinator.complete(ticket, None);

        assert_eq!(coordinator.rendered(), &Rendered::NoData);
    }

    #[test]
    fn changes_during_recomputation_are_not_lost() {
        let mut coordinator = Coordinator::new(Arity::Exactly(2));

        coordinator.selection_changed();
        let stale = coordinator.issue(&[1, 1]).unwrap();

        coordinator.selection_changed();
        assert_eq!(coordinator.state(), State::SelectionPending);

        assert_eq!(
            coordinator.complete(stale, Some("s1")),
            Outcome::Discarded { refire: true }
        );
        assert_eq!(coordinator.rendered(), &Rendered::Loading);

        let fresh = coordinator.issue(&[2, 2]).unwrap();
        assert_eq!(coordinator.complete(fresh, Some("s2")), Outcome::Applied);
        assert_eq!(coordinator.rendered(), &Rendered::Ready("s2"));
    }

    #[test]
    fn reset_invalidates_requests_in_flight() {
        let mut coordinator = Coordinator::new(Arity::Exactly(2));

        coordinator.selection_changed();
        let ticket = coordinator.issue(&[1, 1]).unwrap();
        coordinator.reset();

        assert_eq!(
            coordinator.complete(ticket, Some(1)),
            Outcome::Discarded { refire: false }
        );
        assert_eq!(coordinator.state(), State::Idle);
        assert_eq!(coordinator.rendered(), &Rendered::Prompt);
    }
}
