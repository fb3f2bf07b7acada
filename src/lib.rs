// Upkeep-driven raffle program
// Players pay a flat fee into the pot; once the interval has passed a keeper
// closes the round, the coordinator delivers randomness and the pot goes to
// the drawn player.

pub mod config;
pub mod engine;
pub mod entrypoint;
pub mod error;
pub mod events;
pub mod instruction;
pub mod ledger;
pub mod oracle;
pub mod processor;
pub mod state;
pub mod utils;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
