use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;
use std::mem::size_of;

use crate::{config::MAX_RANDOM_WORDS, error::RaffleError, utils};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the randomness coordinator
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority that will fulfill requests, pays for the account
    /// 1. `[writable]` The coordinator account (PDA)
    /// 2. `[]` The system program
    InitializeCoordinator,

    /// Create a raffle bound to the coordinator
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority/creator of the raffle, pays for the account
    /// 1. `[writable]` The raffle account (PDA)
    /// 2. `[]` The coordinator account
    /// 3. `[]` The system program
    InitializeRaffle {
        /// Minimum payment to enter, in lamports
        entrance_fee: u64,
        /// Minimum seconds between draws
        interval: u64,
    },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays the entrance fee
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports to pay, at least the entrance fee
        amount: u64,
    },

    /// Report whether upkeep may run; the result is set as return data
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep,

    /// Close the round and request randomness (anyone may call this)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The keeper triggering the upkeep
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The coordinator account
    PerformUpkeep,

    /// Deliver random words for an outstanding request
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator authority
    /// 1. `[]` The coordinator account
    /// 2. `[writable]` The raffle account
    /// 3. `[writable]` The winner, must be the drawn player
    FulfillRandomWords {
        /// Request being fulfilled
        request_id: u64,
        /// Random words, the first one picks the winner
        random_words: Vec<u64>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstruction)?;

        Ok(match tag {
            0 => Self::InitializeCoordinator,
            1 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, _) = Self::unpack_u64(rest)?;
                Self::InitializeRaffle {
                    entrance_fee,
                    interval,
                }
            }
            2 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            3 => Self::CheckUpkeep,
            4 => Self::PerformUpkeep,
            5 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (count, mut rest) = rest
                    .split_first()
                    .ok_or(RaffleError::InvalidInstruction)?;
                let count = *count as usize;
                if count == 0 || count > MAX_RANDOM_WORDS {
                    return Err(RaffleError::InvalidInstruction.into());
                }
                let mut random_words = Vec::with_capacity(count);
                for _ in 0..count {
                    let (word, next) = Self::unpack_u64(rest)?;
                    random_words.push(word);
                    rest = next;
                }
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(RaffleError::InvalidInstruction.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::InitializeCoordinator => buf.push(0),
            Self::InitializeRaffle {
                entrance_fee,
                interval,
            } => {
                buf.push(1);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
            }
            Self::EnterRaffle { amount } => {
                buf.push(2);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(3),
            Self::PerformUpkeep => buf.push(4),
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                buf.push(5);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.push(random_words.len() as u8);
                for word in random_words {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(RaffleError::InvalidInstruction.into());
        }
        let (value, rest) = input.split_at(8);
        let value = value
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| RaffleError::InvalidInstruction)?;
        Ok((value, rest))
    }
}

/// Create initialize_coordinator instruction
pub fn initialize_coordinator(
    program_id: &Pubkey,
    authority: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = utils::find_coordinator_address(program_id);
    let data = RaffleInstruction::InitializeCoordinator.pack();

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(coordinator, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    entrance_fee: u64,
    interval: u64,
) -> Result<Instruction, ProgramError> {
    let (raffle, _) = utils::find_raffle_address(program_id, authority);
    let (coordinator, _) = utils::find_coordinator_address(program_id);
    let data = RaffleInstruction::InitializeRaffle {
        entrance_fee,
        interval,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(coordinator, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::EnterRaffle { amount }.pack();

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(*raffle, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle: &Pubkey) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle, false)],
        data: RaffleInstruction::CheckUpkeep.pack(),
    })
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    keeper: &Pubkey,
    raffle: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = utils::find_coordinator_address(program_id);
    let data = RaffleInstruction::PerformUpkeep.pack();

    let accounts = vec![
        AccountMeta::new_readonly(*keeper, true),
        AccountMeta::new(*raffle, false),
        AccountMeta::new(coordinator, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Result<Instruction, ProgramError> {
    let (coordinator, _) = utils::find_coordinator_address(program_id);
    let data = RaffleInstruction::FulfillRandomWords {
        request_id,
        random_words,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new_readonly(coordinator, false),
        AccountMeta::new(*raffle, false),
        AccountMeta::new(*winner, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}
