use solana_program::{
    account_info::AccountInfo,
    msg,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};

use crate::{
    error::RaffleError,
    events::{RaffleEvent, RandomWordsRequested},
    state::Coordinator,
    utils,
};

/// Source of randomness with a request/fulfill protocol.
///
/// `request_random_words` only records the request and returns its id; the
/// words arrive later through a separate fulfillment carrying that id.
pub trait RandomnessOracle {
    fn request_random_words(&mut self, num_words: u32) -> Result<u64, ProgramError>;
}

/// Oracle backed by the program's coordinator account
pub struct CoordinatorOracle<'a, 'info> {
    coordinator_info: &'a AccountInfo<'info>,
    consumer: Pubkey,
}

impl<'a, 'info> CoordinatorOracle<'a, 'info> {
    pub fn new(
        coordinator_info: &'a AccountInfo<'info>,
        consumer: Pubkey,
        program_id: &Pubkey,
    ) -> Result<Self, ProgramError> {
        check_coordinator_account(coordinator_info, program_id)?;

        if !coordinator_info.is_writable {
            msg!("Coordinator account must be writable to accept requests");
            return Err(ProgramError::InvalidArgument);
        }

        Ok(Self {
            coordinator_info,
            consumer,
        })
    }
}

impl<'a, 'info> RandomnessOracle for CoordinatorOracle<'a, 'info> {
    fn request_random_words(&mut self, num_words: u32) -> Result<u64, ProgramError> {
        let mut coordinator = Coordinator::unpack(&self.coordinator_info.data.borrow())?;

        let request_id = coordinator.next_request_id;
        coordinator.next_request_id = request_id
            .checked_add(1)
            .ok_or(RaffleError::Overflow)?;
        Coordinator::pack(coordinator, &mut self.coordinator_info.data.borrow_mut())?;

        RaffleEvent::from(RandomWordsRequested {
            request_id,
            consumer: self.consumer,
            num_words,
        })
        .emit();

        Ok(request_id)
    }
}

/// Checks that a fulfillment comes from the coordinator's authority and names
/// a request the coordinator actually issued
pub fn verify_fulfillment(
    coordinator_info: &AccountInfo,
    authority_info: &AccountInfo,
    program_id: &Pubkey,
    request_id: u64,
) -> Result<Coordinator, ProgramError> {
    check_coordinator_account(coordinator_info, program_id)?;
    let coordinator = Coordinator::unpack(&coordinator_info.data.borrow())?;

    if !authority_info.is_signer || coordinator.authority != *authority_info.key {
        msg!("Fulfillment must be signed by the coordinator authority");
        return Err(RaffleError::UnauthorizedFulfiller.into());
    }

    if !coordinator.has_issued(request_id) {
        msg!("Nonexistent request: {}", request_id);
        return Err(RaffleError::NonexistentRequest.into());
    }

    Ok(coordinator)
}

fn check_coordinator_account(
    coordinator_info: &AccountInfo,
    program_id: &Pubkey,
) -> Result<(), ProgramError> {
    if coordinator_info.owner != program_id {
        msg!("Coordinator account must be owned by the program");
        return Err(ProgramError::IncorrectProgramId);
    }

    let (expected, _) = utils::find_coordinator_address(program_id);
    if *coordinator_info.key != expected {
        msg!("Invalid coordinator account address");
        return Err(ProgramError::InvalidSeeds);
    }
    Ok(())
}
