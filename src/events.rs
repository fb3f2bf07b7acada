use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// A player was added to the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct EntryRecorded {
    pub player: Pubkey,
    pub amount: u64,
    pub round: u64,
}

/// Upkeep closed the round and asked the coordinator for randomness
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct WinnerRequested {
    pub request_id: u64,
    pub round: u64,
}

/// Randomness arrived, the pot was paid and the raffle reopened
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct WinnerPicked {
    pub winner: Pubkey,
    pub prize: u64,
    pub round: u64,
}

/// Coordinator accepted a request on behalf of a consumer
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomWordsRequested {
    pub request_id: u64,
    pub consumer: Pubkey,
    pub num_words: u32,
}

/// Everything the program reports through the transaction log
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    EntryRecorded(EntryRecorded),
    WinnerRequested(WinnerRequested),
    WinnerPicked(WinnerPicked),
    RandomWordsRequested(RandomWordsRequested),
}

impl RaffleEvent {
    /// Logs a readable line and the borsh encoding of the event
    pub fn emit(&self) {
        match self {
            RaffleEvent::EntryRecorded(e) => {
                msg!("EntryRecorded: player={} amount={} round={}", e.player, e.amount, e.round)
            }
            RaffleEvent::WinnerRequested(e) => {
                msg!("WinnerRequested: request_id={} round={}", e.request_id, e.round)
            }
            RaffleEvent::WinnerPicked(e) => {
                msg!("WinnerPicked: winner={} prize={} round={}", e.winner, e.prize, e.round)
            }
            RaffleEvent::RandomWordsRequested(e) => msg!(
                "RandomWordsRequested: request_id={} consumer={} num_words={}",
                e.request_id,
                e.consumer,
                e.num_words
            ),
        }

        match self.try_to_vec() {
            Ok(data) => sol_log_data(&[&data]),
            Err(err) => msg!("Failed to encode event: {}", err),
        }
    }
}

impl From<EntryRecorded> for RaffleEvent {
    fn from(e: EntryRecorded) -> Self {
        RaffleEvent::EntryRecorded(e)
    }
}

impl From<WinnerRequested> for RaffleEvent {
    fn from(e: WinnerRequested) -> Self {
        RaffleEvent::WinnerRequested(e)
    }
}

impl From<WinnerPicked> for RaffleEvent {
    fn from(e: WinnerPicked) -> Self {
        RaffleEvent::WinnerPicked(e)
    }
}

impl From<RandomWordsRequested> for RaffleEvent {
    fn from(e: RandomWordsRequested) -> Self {
        RaffleEvent::RandomWordsRequested(e)
    }
}
