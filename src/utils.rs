use solana_program::pubkey::Pubkey;

pub const RAFFLE_SEED: &[u8] = b"raffle";
pub const COORDINATOR_SEED: &[u8] = b"coordinator";

/// Map a random word onto a player index.
///
/// Plain modulus: lower indices are very slightly favoured when the word
/// range is not a multiple of `player_count`.
pub fn winner_index(random_value: u64, player_count: usize) -> Option<usize> {
    if player_count == 0 {
        return None;
    }
    Some((random_value % player_count as u64) as usize)
}

/// Find the program derived address of the raffle created by `authority`
pub fn find_raffle_address(program_id: &Pubkey, authority: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED, authority.as_ref()], program_id)
}

/// Find the program derived address of the randomness coordinator
pub fn find_coordinator_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[COORDINATOR_SEED], program_id)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}
