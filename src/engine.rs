//! The raffle state machine.
//!
//! `RaffleEngine` is the only code that mutates a [`Raffle`]. Every
//! operation runs all fallible collaborator calls first and touches the
//! raffle only once nothing can fail anymore, so an error always leaves the
//! raffle exactly as it was.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    config::NUM_WORDS,
    error::RaffleError,
    events::{EntryRecorded, WinnerPicked, WinnerRequested},
    ledger::Ledger,
    oracle::RandomnessOracle,
    state::{Raffle, RaffleState},
    utils,
};

/// Reason an upkeep is not allowed to run
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpkeepBlocker {
    NotOpen,
    IntervalNotElapsed,
    NoPlayers,
    NoBalance,
}

/// Result of an upkeep eligibility check
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub blockers: Vec<UpkeepBlocker>,
}

impl UpkeepCheck {
    pub fn upkeep_needed(&self) -> bool {
        self.blockers.is_empty()
    }
}

pub struct RaffleEngine<'r> {
    raffle: &'r mut Raffle,
}

impl<'r> RaffleEngine<'r> {
    pub fn new(raffle: &'r mut Raffle) -> Self {
        Self { raffle }
    }

    pub fn raffle(&self) -> &Raffle {
        &*self.raffle
    }

    /// Add `participant` to the current round after collecting `amount_paid`
    pub fn enter<L: Ledger>(
        &mut self,
        ledger: &mut L,
        participant: &Pubkey,
        amount_paid: u64,
    ) -> Result<EntryRecorded, ProgramError> {
        if amount_paid < self.raffle.entrance_fee {
            msg!(
                "Entrance fee is {} lamports, received {}",
                self.raffle.entrance_fee,
                amount_paid
            );
            return Err(RaffleError::InsufficientPayment.into());
        }

        if self.raffle.state != RaffleState::Open {
            msg!("Raffle is calculating a winner, entries are closed");
            return Err(RaffleError::RaffleNotOpen.into());
        }

        if self.raffle.is_full() {
            msg!("Raffle already holds {} players", self.raffle.num_players());
            return Err(RaffleError::RaffleFull.into());
        }

        ledger.credit(participant, amount_paid)?;
        self.raffle.players.push(*participant);

        Ok(EntryRecorded {
            player: *participant,
            amount: amount_paid,
            round: self.raffle.round,
        })
    }

    /// Read-only eligibility check, reports every condition that blocks upkeep
    pub fn check_upkeep<L: Ledger>(
        &self,
        ledger: &L,
        now: UnixTimestamp,
    ) -> Result<UpkeepCheck, ProgramError> {
        let mut check = UpkeepCheck::default();

        if self.raffle.state != RaffleState::Open {
            check.blockers.push(UpkeepBlocker::NotOpen);
        }
        if !self.raffle.interval_elapsed(now) {
            check.blockers.push(UpkeepBlocker::IntervalNotElapsed);
        }
        if self.raffle.players.is_empty() {
            check.blockers.push(UpkeepBlocker::NoPlayers);
        }
        if ledger.round_balance()? == 0 {
            check.blockers.push(UpkeepBlocker::NoBalance);
        }

        Ok(check)
    }

    /// Close the round and request one random word.
    ///
    /// Eligibility is re-evaluated here; a check done earlier by the caller
    /// is never trusted.
    pub fn perform_upkeep<L: Ledger, O: RandomnessOracle>(
        &mut self,
        ledger: &L,
        oracle: &mut O,
        now: UnixTimestamp,
    ) -> Result<WinnerRequested, ProgramError> {
        let check = self.check_upkeep(ledger, now)?;
        if !check.upkeep_needed() {
            msg!(
                "Upkeep not needed: {:?} (balance={}, players={}, state={:?})",
                check.blockers,
                ledger.round_balance()?,
                self.raffle.num_players(),
                self.raffle.state
            );
            return Err(RaffleError::UpkeepNotNeeded.into());
        }

        let request_id = oracle.request_random_words(NUM_WORDS)?;

        self.raffle.state = RaffleState::Calculating;
        self.raffle.pending_request_id = Some(request_id);

        Ok(WinnerRequested {
            request_id,
            round: self.raffle.round,
        })
    }

    /// Consume the fulfillment for the pending request: pay the winner and reopen.
    ///
    /// Fulfillments for any other request are rejected without side effects.
    pub fn on_randomness_received<L: Ledger>(
        &mut self,
        ledger: &mut L,
        request_id: u64,
        random_value: u64,
        now: UnixTimestamp,
    ) -> Result<WinnerPicked, ProgramError> {
        if self.raffle.state != RaffleState::Calculating
            || self.raffle.pending_request_id != Some(request_id)
        {
            msg!(
                "SECURITY: rejected fulfillment for request {} (pending: {:?}, state: {:?})",
                request_id,
                self.raffle.pending_request_id,
                self.raffle.state
            );
            return Err(RaffleError::UnknownRequest.into());
        }

        let index = utils::winner_index(random_value, self.raffle.num_players())
            .ok_or(RaffleError::NoPlayers)?;
        let winner = *self
            .raffle
            .player(index)
            .ok_or(RaffleError::NoPlayers)?;
        let prize = ledger.round_balance()?;
        let round = self.raffle.round;
        let next_round = round.checked_add(1).ok_or(RaffleError::Overflow)?;

        if let Err(err) = ledger.payout(&winner, prize) {
            msg!("Payout of {} lamports to {} rejected: {}", prize, winner, err);
            return Err(RaffleError::PayoutFailed.into());
        }

        self.raffle.recent_winner = Some(winner);
        self.raffle.players.clear();
        self.raffle.state = RaffleState::Open;
        self.raffle.pending_request_id = None;
        self.raffle.last_timestamp = now;
        self.raffle.round = next_round;

        Ok(WinnerPicked {
            winner,
            prize,
            round,
        })
    }
}
