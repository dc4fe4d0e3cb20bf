//! Layout vote arbiter

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::pixy::Detection;
use log::{debug, info, warn};
use std::fmt::Display;

use super::{Layout, LayoutClassifier, LayoutParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Decides on a layout from many cycles of classifier errors.
///
/// Each cycle where exactly one layout has an error below the match threshold is a vote for that
/// layout. The first layout (in configured order) whose tally reaches the win score is decided.
#[derive(Debug, Clone)]
pub struct VoteArbiter {
    classifiers: Vec<LayoutClassifier>,

    /// Votes per classifier, same order as `classifiers`.
    tallies: Vec<u32>,

    match_error_threshold: i64,
    win_score: u32,

    state: ArbiterState,
}

/// Summary of one arbiter cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Error of each layout this cycle
    pub errors: Vec<(Layout, i64)>,

    /// Outcome of the cycle
    pub vote: CycleVote,

    /// Tally of each layout after the cycle
    pub tallies: Vec<(Layout, u32)>,

    /// State of the arbiter after the cycle
    pub state: ArbiterState,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    #[error("No layouts have been configured")]
    NoLayouts,

    #[error("Layout {0} is configured more than once")]
    DuplicateLayout(Layout),

    #[error("The win score must be at least 1")]
    ZeroWinScore,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArbiterState {
    /// Not yet started
    Idle,

    /// Collecting votes
    Accumulating,

    /// A layout has reached the win score
    Decided(Layout),

    /// Stopped before a decision was reached
    Aborted,
}

/// Outcome of a single cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CycleVote {
    /// No layout was below the match threshold
    NoMatch,

    /// More than one layout was below the match threshold
    Confused,

    /// Exactly one layout was below the match threshold
    Vote(Layout),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VoteArbiter {
    pub fn new(params: &LayoutParams) -> Result<Self, ArbiterError> {
        if params.layouts.is_empty() {
            return Err(ArbiterError::NoLayouts);
        }
        if params.win_score == 0 {
            return Err(ArbiterError::ZeroWinScore);
        }
        for (i, config) in params.layouts.iter().enumerate() {
            if params.layouts[..i].iter().any(|c| c.layout == config.layout) {
                return Err(ArbiterError::DuplicateLayout(config.layout));
            }
        }

        let classifiers: Vec<_> = params
            .layouts
            .iter()
            .map(|c| LayoutClassifier::new(c.clone(), params.young_age_limit, params.old_age_limit))
            .collect();

        Ok(Self {
            tallies: vec![0; classifiers.len()],
            classifiers,
            match_error_threshold: params.match_error_threshold,
            win_score: params.win_score,
            state: ArbiterState::Idle,
        })
    }

    /// Start a new classification attempt, clearing all tracks and tallies.
    pub fn start(&mut self) {
        for c in self.classifiers.iter_mut() {
            c.reset();
        }
        self.tallies.iter_mut().for_each(|t| *t = 0);
        self.state = ArbiterState::Accumulating;

        debug!("VoteArbiter started");
    }

    /// Stop the current attempt without a decision.
    ///
    /// Has no effect if a layout has already been decided.
    pub fn abort(&mut self) {
        match self.state {
            ArbiterState::Decided(_) => (),
            _ => {
                self.state = ArbiterState::Aborted;
                info!("VoteArbiter aborted without a decision");
            }
        }
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// The decided layout, if any.
    pub fn decision(&self) -> Option<Layout> {
        match self.state {
            ArbiterState::Decided(l) => Some(l),
            _ => None,
        }
    }

    /// Current tally for the given layout.
    pub fn tally(&self, layout: Layout) -> u32 {
        self.classifiers
            .iter()
            .position(|c| c.layout() == layout)
            .map_or(0, |i| self.tallies[i])
    }

    pub fn classifiers(&self) -> &[LayoutClassifier] {
        &self.classifiers
    }

    /// Run one cycle on a batch of detections.
    ///
    /// All classifiers process the batch before any error is read.
    pub fn process(&mut self, dets: &[Detection]) -> CycleReport {
        for c in self.classifiers.iter_mut() {
            c.process(dets);
        }

        let errors: Vec<_> = self
            .classifiers
            .iter()
            .map(|c| (c.layout(), c.error()))
            .collect();

        let vote = self.cast_vote(&errors);

        CycleReport {
            errors,
            vote,
            tallies: self
                .classifiers
                .iter()
                .zip(self.tallies.iter())
                .map(|(c, t)| (c.layout(), *t))
                .collect(),
            state: self.state,
        }
    }

    /// Cast the vote for one cycle from the given layout errors.
    ///
    /// Tallies are only changed while accumulating. Errors for layouts which are not configured
    /// are ignored.
    pub fn cast_vote(&mut self, errors: &[(Layout, i64)]) -> CycleVote {
        let vote = find_best(errors, self.match_error_threshold);

        if self.state != ArbiterState::Accumulating {
            warn!("VoteArbiter is not accumulating ({}), vote {:?} ignored", self.state, vote);
            return vote;
        }

        if let CycleVote::Vote(layout) = vote {
            match self.classifiers.iter().position(|c| c.layout() == layout) {
                Some(i) => self.tallies[i] += 1,
                None => warn!("Vote for unconfigured layout {} ignored", layout),
            }
        }

        if let Some(i) = self.tallies.iter().position(|&t| t >= self.win_score) {
            let layout = self.classifiers[i].layout();
            self.state = ArbiterState::Decided(layout);
            info!("VoteArbiter decided on layout {}", layout);
        }

        vote
    }
}

impl Display for ArbiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArbiterState::Idle => write!(f, "Idle"),
            ArbiterState::Accumulating => write!(f, "Accumulating"),
            ArbiterState::Decided(l) => write!(f, "Decided({})", l),
            ArbiterState::Aborted => write!(f, "Aborted"),
        }
    }
}

impl Display for CycleVote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleVote::NoMatch => write!(f, "NONE"),
            CycleVote::Confused => write!(f, "CONFUSED"),
            CycleVote::Vote(l) => write!(f, "{}", l),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Find the single layout whose error is strictly below the threshold.
pub fn find_best(errors: &[(Layout, i64)], threshold: i64) -> CycleVote {
    let mut matches = errors.iter().filter(|(_, e)| *e < threshold);

    match (matches.next(), matches.next()) {
        (None, _) => CycleVote::NoMatch,
        (Some((layout, _)), None) => CycleVote::Vote(*layout),
        (Some(_), Some(_)) => CycleVote::Confused,
    }
}
