//! Session state machine
//!
//! `Session::apply` is the whole rule set: a pure function from the current
//! value and a transition to the next value. `SessionEngine` is the driver
//! that draws randomness, feeds transitions in, and keeps the latest value.
//! A rejected transition leaves the stored session untouched.

use crate::errors::SessionError;
use crate::games::{
    randomness::{draw_chambers, RandomnessSource},
    types::{
        bullets_for_level, ChamberSet, Phase, PlayerIdentity, ScoreSubmission, Session,
        CHAMBERS, STARTING_POINTS, SURVIVAL_MULTIPLIER,
    },
};
use crate::submission::address::Address;
use tracing::debug;

/// Input to the state machine. Randomness is drawn before a transition is
/// built, so applying one never performs I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start { bullets: ChamberSet },
    BeginSpin,
    /// `next_bullets` is only read when the roll misses.
    ResolveSpin { roll: u8, next_bullets: ChamberSet },
    CashOut,
}

impl Session {
    pub fn apply(self, transition: Transition) -> Result<Session, SessionError> {
        match transition {
            Transition::Start { bullets } => {
                if self.phase.is_live() {
                    return Err(SessionError::SessionInProgress { phase: self.phase });
                }
                check_draw(1, bullets)?;
                Ok(Session {
                    phase: Phase::Armed,
                    level: 1,
                    points: STARTING_POINTS,
                    bullet_positions: bullets,
                    last_roll: None,
                })
            }
            Transition::BeginSpin => {
                match self.phase {
                    Phase::Armed => {}
                    Phase::Resolving => return Err(SessionError::SpinInFlight),
                    phase => return Err(SessionError::NotArmed { phase }),
                }
                if self.points.checked_mul(SURVIVAL_MULTIPLIER).is_none() {
                    return Err(SessionError::ScoreCeiling { level: self.level });
                }
                Ok(Session {
                    phase: Phase::Resolving,
                    ..self
                })
            }
            Transition::ResolveSpin { roll, next_bullets } => {
                if self.phase != Phase::Resolving {
                    return Err(SessionError::NotResolving { phase: self.phase });
                }
                if roll >= CHAMBERS {
                    return Err(SessionError::RollOutOfRange { roll });
                }
                if self.bullet_positions.contains(roll) {
                    return Ok(Session {
                        phase: Phase::Dead,
                        points: 0,
                        last_roll: Some(roll),
                        ..self
                    });
                }
                let level = self.level + 1;
                check_draw(level, next_bullets)?;
                let points = self
                    .points
                    .checked_mul(SURVIVAL_MULTIPLIER)
                    .ok_or(SessionError::ScoreCeiling { level: self.level })?;
                Ok(Session {
                    phase: Phase::Armed,
                    level,
                    points,
                    bullet_positions: next_bullets,
                    last_roll: Some(roll),
                })
            }
            Transition::CashOut => {
                if self.phase != Phase::Armed {
                    return Err(SessionError::NotArmed { phase: self.phase });
                }
                if self.points <= STARTING_POINTS {
                    return Err(SessionError::NothingToCashOut { points: self.points });
                }
                Ok(Session {
                    phase: Phase::CashedOut,
                    ..self
                })
            }
        }
    }
}

fn check_draw(level: u32, bullets: ChamberSet) -> Result<(), SessionError> {
    let expected = bullets_for_level(level);
    if bullets.len() != expected {
        return Err(SessionError::InvalidDraw {
            expected,
            actual: bullets.len(),
        });
    }
    Ok(())
}

/// Drives one player's session with an injected randomness source
#[derive(Debug)]
pub struct SessionEngine<R> {
    randomness: R,
    session: Session,
    player: Option<Address>,
}

impl<R: RandomnessSource> SessionEngine<R> {
    pub fn new(randomness: R) -> Self {
        Self {
            randomness,
            session: Session::IDLE,
            player: None,
        }
    }

    /// Current session value
    pub fn session(&self) -> Session {
        self.session
    }

    /// Player bound at the last successful `start`
    pub fn player(&self) -> Option<Address> {
        self.player
    }

    /// Begin a fresh session. Terminal sessions are discarded; a live one is not.
    pub fn start(&mut self, identity: Option<&PlayerIdentity>) -> Result<Session, SessionError> {
        let player = match identity {
            Some(identity) if identity.confirmed => identity.address,
            _ => return Err(SessionError::AuthRequired),
        };
        if self.session.phase.is_live() {
            return Err(SessionError::SessionInProgress {
                phase: self.session.phase,
            });
        }

        let bullets = draw_chambers(&mut self.randomness, bullets_for_level(1));
        self.session = self.session.apply(Transition::Start { bullets })?;
        self.player = Some(player);
        debug!(%player, "session started");
        Ok(self.session)
    }

    /// Enter `Resolving`. The loaded chambers are fixed from here until the
    /// draw resolves.
    pub fn begin_spin(&mut self) -> Result<Session, SessionError> {
        self.session = self.session.apply(Transition::BeginSpin)?;
        Ok(self.session)
    }

    /// Draw the roll and settle the round.
    pub fn resolve_spin(&mut self) -> Result<Session, SessionError> {
        if self.session.phase != Phase::Resolving {
            return Err(SessionError::NotResolving {
                phase: self.session.phase,
            });
        }

        let roll = self.randomness.draw() % CHAMBERS;
        let next_bullets = if self.session.bullet_positions.contains(roll) {
            self.session.bullet_positions
        } else {
            draw_chambers(&mut self.randomness, bullets_for_level(self.session.level + 1))
        };
        self.session = self
            .session
            .apply(Transition::ResolveSpin { roll, next_bullets })?;

        debug!(
            roll,
            level = self.session.level,
            phase = %self.session.phase,
            "spin resolved"
        );
        Ok(self.session)
    }

    /// `begin_spin` followed by `resolve_spin`.
    pub fn spin(&mut self) -> Result<Session, SessionError> {
        self.begin_spin()?;
        self.resolve_spin()
    }

    /// Freeze the score. Returns the single submission for this session.
    pub fn cash_out(&mut self) -> Result<ScoreSubmission, SessionError> {
        let player = self.player.ok_or(SessionError::AuthRequired)?;
        let next = self.session.apply(Transition::CashOut)?;
        self.session = next;
        debug!(%player, score = %next.points, "session cashed out");
        Ok(ScoreSubmission::new(player, next.points))
    }
}
