use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};
use std::convert::TryFrom;

use crate::config::{RaffleConfig, MAX_PLAYERS};

const PUBKEY_LEN: usize = 32;
const PLAYERS_LEN: usize = PUBKEY_LEN * MAX_PLAYERS;

/// Status of a raffle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// Randomness requested, waiting for the coordinator to fulfill
    Calculating,
}

impl TryFrom<u8> for RaffleState {
    type Error = &'static str;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RaffleState::Open),
            1 => Ok(RaffleState::Calculating),
            _ => Err("Invalid raffle state"),
        }
    }
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

/// Raffle account data
#[derive(Debug, Clone, PartialEq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Account that created the raffle
    pub authority: Pubkey,
    /// Randomness coordinator this raffle accepts fulfillments from
    pub coordinator: Pubkey,
    /// Minimum payment to enter, in lamports
    pub entrance_fee: u64,
    /// Minimum seconds between draws
    pub interval: u64,
    /// Current state of the round
    pub state: RaffleState,
    /// Time of initialization or of the last winner selection
    pub last_timestamp: UnixTimestamp,
    /// Winner of the last completed round
    pub recent_winner: Option<Pubkey>,
    /// Outstanding randomness request, set only while calculating
    pub pending_request_id: Option<u64>,
    /// Index of the current round, starting at 0
    pub round: u64,
    /// PDA bump seed
    pub bump: u8,
    /// Entrants of the current round, in entry order
    pub players: Vec<Pubkey>,
}

impl Raffle {
    pub fn new(
        config: RaffleConfig,
        authority: Pubkey,
        coordinator: Pubkey,
        now: UnixTimestamp,
        bump: u8,
    ) -> Self {
        Self {
            is_initialized: true,
            authority,
            coordinator,
            entrance_fee: config.entrance_fee,
            interval: config.interval,
            state: RaffleState::Open,
            last_timestamp: now,
            recent_winner: None,
            pending_request_id: None,
            round: 0,
            bump,
            players: Vec::with_capacity(MAX_PLAYERS),
        }
    }

    pub fn player(&self, index: usize) -> Option<&Pubkey> {
        self.players.get(index)
    }

    pub fn players(&self) -> &[Pubkey] {
        &self.players
    }

    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    /// True once at least `interval` seconds have passed since `last_timestamp`
    pub fn interval_elapsed(&self, now: UnixTimestamp) -> bool {
        match now.checked_sub(self.last_timestamp) {
            Some(elapsed) if elapsed >= 0 => elapsed as u64 >= self.interval,
            _ => false,
        }
    }
}

/// Randomness coordinator account data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinator {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Only key allowed to deliver fulfillments
    pub authority: Pubkey,
    /// Id handed to the next request, ids start at 1
    pub next_request_id: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl Coordinator {
    pub fn new(authority: Pubkey, bump: u8) -> Self {
        Self {
            is_initialized: true,
            authority,
            next_request_id: 1,
            bump,
        }
    }

    /// Whether `request_id` was handed out by this coordinator
    pub fn has_issued(&self, request_id: u64) -> bool {
        request_id != 0 && request_id < self.next_request_id
    }
}

impl Sealed for Raffle {}
impl Sealed for Coordinator {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for Coordinator {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Raffle {
    const LEN: usize = 1 + 32 + 32 + 8 + 8 + 1 + 8 + 1 + 32 + 1 + 8 + 8 + 1 + 2 + PLAYERS_LEN;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Raffle::LEN];
        let (
            is_initialized,
            authority,
            coordinator,
            entrance_fee,
            interval,
            state,
            last_timestamp,
            has_winner,
            recent_winner,
            has_pending,
            pending_request_id,
            round,
            bump,
            player_count,
            players,
        ) = array_refs![src, 1, 32, 32, 8, 8, 1, 8, 1, 32, 1, 8, 8, 1, 2, PLAYERS_LEN];

        let state = RaffleState::try_from(state[0]).map_err(|_| ProgramError::InvalidAccountData)?;

        let player_count = u16::from_le_bytes(*player_count) as usize;
        if player_count > MAX_PLAYERS {
            return Err(ProgramError::InvalidAccountData);
        }
        let players = players
            .chunks_exact(PUBKEY_LEN)
            .take(player_count)
            .map(|chunk| {
                let mut key = [0u8; PUBKEY_LEN];
                key.copy_from_slice(chunk);
                Pubkey::new_from_array(key)
            })
            .collect();

        Ok(Raffle {
            is_initialized: is_initialized[0] != 0,
            authority: Pubkey::new_from_array(*authority),
            coordinator: Pubkey::new_from_array(*coordinator),
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: u64::from_le_bytes(*interval),
            state,
            last_timestamp: UnixTimestamp::from_le_bytes(*last_timestamp),
            recent_winner: (has_winner[0] != 0).then(|| Pubkey::new_from_array(*recent_winner)),
            pending_request_id: (has_pending[0] != 0)
                .then(|| u64::from_le_bytes(*pending_request_id)),
            round: u64::from_le_bytes(*round),
            bump: bump[0],
            players,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Raffle::LEN];
        let (
            is_initialized_dst,
            authority_dst,
            coordinator_dst,
            entrance_fee_dst,
            interval_dst,
            state_dst,
            last_timestamp_dst,
            has_winner_dst,
            recent_winner_dst,
            has_pending_dst,
            pending_request_id_dst,
            round_dst,
            bump_dst,
            player_count_dst,
            players_dst,
        ) = mut_array_refs![dst, 1, 32, 32, 8, 8, 1, 8, 1, 32, 1, 8, 8, 1, 2, PLAYERS_LEN];

        is_initialized_dst[0] = self.is_initialized as u8;
        authority_dst.copy_from_slice(self.authority.as_ref());
        coordinator_dst.copy_from_slice(self.coordinator.as_ref());
        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        state_dst[0] = self.state.into();
        *last_timestamp_dst = self.last_timestamp.to_le_bytes();

        has_winner_dst[0] = self.recent_winner.is_some() as u8;
        let winner = self.recent_winner.unwrap_or_default();
        recent_winner_dst.copy_from_slice(winner.as_ref());

        has_pending_dst[0] = self.pending_request_id.is_some() as u8;
        *pending_request_id_dst = self.pending_request_id.unwrap_or(0).to_le_bytes();

        *round_dst = self.round.to_le_bytes();
        bump_dst[0] = self.bump;

        // The engine never lets the list grow past MAX_PLAYERS
        let count = self.players.len().min(MAX_PLAYERS);
        *player_count_dst = (count as u16).to_le_bytes();
        players_dst.fill(0);
        for (slot, player) in players_dst
            .chunks_exact_mut(PUBKEY_LEN)
            .zip(self.players.iter().take(count))
        {
            slot.copy_from_slice(player.as_ref());
        }
    }
}

impl Pack for Coordinator {
    const LEN: usize = 1 + 32 + 8 + 1;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Coordinator::LEN];
        let (is_initialized, authority, next_request_id, bump) = array_refs![src, 1, 32, 8, 1];

        Ok(Coordinator {
            is_initialized: is_initialized[0] != 0,
            authority: Pubkey::new_from_array(*authority),
            next_request_id: u64::from_le_bytes(*next_request_id),
            bump: bump[0],
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Coordinator::LEN];
        let (is_initialized_dst, authority_dst, next_request_id_dst, bump_dst) =
            mut_array_refs![dst, 1, 32, 8, 1];

        is_initialized_dst[0] = self.is_initialized as u8;
        authority_dst.copy_from_slice(self.authority.as_ref());
        *next_request_id_dst = self.next_request_id.to_le_bytes();
        bump_dst[0] = self.bump;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raffle() -> Raffle {
        let mut raffle = Raffle::new(
            RaffleConfig::new(100, 30),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            1_000,
            254,
        );
        raffle.players = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        raffle.state = RaffleState::Calculating;
        raffle.pending_request_id = Some(7);
        raffle
    }

    #[test]
    fn raffle_layout_preserves_players_and_optional_fields() {
        let raffle = sample_raffle();
        let mut data = vec![0u8; Raffle::LEN];
        Raffle::pack(raffle.clone(), &mut data).unwrap();

        let unpacked = Raffle::unpack(&data).unwrap();
        assert_eq!(unpacked, raffle);
        assert_eq!(unpacked.recent_winner, None);
        assert_eq!(unpacked.pending_request_id, Some(7));
        assert_eq!(unpacked.num_players(), 2);
    }

    #[test]
    fn shrinking_player_list_clears_stale_slots() {
        let mut raffle = sample_raffle();
        let mut data = vec![0u8; Raffle::LEN];
        Raffle::pack(raffle.clone(), &mut data).unwrap();

        raffle.players.clear();
        raffle.recent_winner = Some(Pubkey::new_unique());
        raffle.pending_request_id = None;
        Raffle::pack(raffle.clone(), &mut data).unwrap();

        assert!(data[Raffle::LEN - PLAYERS_LEN..].iter().all(|b| *b == 0));
        assert_eq!(Raffle::unpack(&data).unwrap(), raffle);
    }

    #[test]
    fn rejects_unknown_state_byte() {
        let raffle = sample_raffle();
        let mut data = vec![0u8; Raffle::LEN];
        Raffle::pack(raffle, &mut data).unwrap();
        // state byte follows is_initialized, authority, coordinator, fee, interval
        data[1 + 32 + 32 + 8 + 8] = 9;
        assert_eq!(
            Raffle::unpack(&data).unwrap_err(),
            ProgramError::InvalidAccountData
        );
    }

    #[test]
    fn interval_elapsed_uses_inclusive_bound() {
        let raffle = sample_raffle();
        assert!(!raffle.interval_elapsed(1_029));
        assert!(raffle.interval_elapsed(1_030));
        assert!(!raffle.interval_elapsed(900));
    }

    #[test]
    fn coordinator_tracks_issued_ids() {
        let mut coordinator = Coordinator::new(Pubkey::new_unique(), 255);
        assert!(!coordinator.has_issued(0));
        assert!(!coordinator.has_issued(1));
        coordinator.next_request_id = 3;
        assert!(coordinator.has_issued(1));
        assert!(coordinator.has_issued(2));
        assert!(!coordinator.has_issued(3));
    }
}
