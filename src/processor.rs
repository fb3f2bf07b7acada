use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

use crate::{
    config::RaffleConfig,
    engine::RaffleEngine,
    error::RaffleError,
    events::RaffleEvent,
    instruction::RaffleInstruction,
    ledger::LamportLedger,
    oracle::{self, CoordinatorOracle},
    state::{Coordinator, Raffle},
    utils::{self, COORDINATOR_SEED, RAFFLE_SEED},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeCoordinator => {
                msg!("Instruction: Initialize Coordinator");
                Self::process_initialize_coordinator(accounts, program_id)
            }
            RaffleInstruction::InitializeRaffle {
                entrance_fee,
                interval,
            } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(accounts, entrance_fee, interval, program_id)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, amount, program_id)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, &random_words, program_id)
            }
        }
    }

    /// Creates the coordinator PDA; the signer becomes the only key allowed to fulfill
    fn process_initialize_coordinator(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_coordinator, bump_seed) = utils::find_coordinator_address(program_id);
        if *coordinator_info.key != expected_coordinator {
            msg!("Invalid coordinator account address");
            return Err(ProgramError::InvalidSeeds);
        }

        if coordinator_info.owner == program_id {
            msg!("Coordinator account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        Self::create_program_account(
            authority_info,
            coordinator_info,
            system_program_info,
            Coordinator::LEN,
            &[COORDINATOR_SEED, &[bump_seed]],
            program_id,
        )?;

        let coordinator = Coordinator::new(*authority_info.key, bump_seed);
        Coordinator::pack(coordinator, &mut coordinator_info.data.borrow_mut())?;

        msg!("Coordinator initialized: Authority={}", authority_info.key);
        Ok(())
    }

    /// Creates the raffle PDA with its immutable fee and interval
    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        entrance_fee: u64,
        interval: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = RaffleConfig::new(entrance_fee, interval);
        if let Err(err) = config.validate() {
            msg!(
                "Invalid configuration: entrance_fee={} interval={}",
                entrance_fee,
                interval
            );
            return Err(err.into());
        }

        let (expected_raffle, bump_seed) =
            utils::find_raffle_address(program_id, authority_info.key);
        if *raffle_info.key != expected_raffle {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidSeeds);
        }

        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        let (expected_coordinator, _) = utils::find_coordinator_address(program_id);
        if *coordinator_info.key != expected_coordinator || coordinator_info.owner != program_id {
            msg!("Coordinator account must be the program's initialized coordinator");
            return Err(RaffleError::CoordinatorMismatch.into());
        }
        Coordinator::unpack(&coordinator_info.data.borrow())?;

        Self::create_program_account(
            authority_info,
            raffle_info,
            system_program_info,
            Raffle::LEN,
            &[RAFFLE_SEED, authority_info.key.as_ref(), &[bump_seed]],
            program_id,
        )?;

        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(
            config,
            *authority_info.key,
            *coordinator_info.key,
            now,
            bump_seed,
        );
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: EntranceFee={} lamports ({} SOL), Interval={}s",
            entrance_fee,
            utils::lamports_to_sol(entrance_fee),
            interval
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        let mut ledger = LamportLedger::for_entry(raffle_info, player_info, system_program_info)?;

        let event = RaffleEngine::new(&mut raffle).enter(&mut ledger, player_info.key, amount)?;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        RaffleEvent::from(event).emit();
        Ok(())
    }

    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        let ledger = LamportLedger::read_only(raffle_info)?;
        let now = Clock::get()?.unix_timestamp;

        let check = RaffleEngine::new(&mut raffle).check_upkeep(&ledger, now)?;
        if check.upkeep_needed() {
            msg!("Upkeep needed");
        } else {
            msg!("Upkeep not needed: {:?}", check.blockers);
        }

        let data = check
            .try_to_vec()
            .map_err(|_| ProgramError::BorshIoError("UpkeepCheck".to_string()))?;
        set_return_data(&data);
        Ok(())
    }

    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let keeper_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        // Anyone may trigger upkeep, the signature only identifies the keeper
        if !keeper_info.is_signer {
            msg!("Keeper must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        if raffle.coordinator != *coordinator_info.key {
            msg!("Coordinator does not match the one registered with this raffle");
            return Err(RaffleError::CoordinatorMismatch.into());
        }

        let ledger = LamportLedger::read_only(raffle_info)?;
        let mut oracle = CoordinatorOracle::new(coordinator_info, *raffle_info.key, program_id)?;
        let now = Clock::get()?.unix_timestamp;

        let event = RaffleEngine::new(&mut raffle).perform_upkeep(&ledger, &mut oracle, now)?;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!("Upkeep performed by keeper {}", keeper_info.key);
        RaffleEvent::from(event).emit();
        Ok(())
    }

    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        oracle::verify_fulfillment(coordinator_info, authority_info, program_id, request_id)?;

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        if raffle.coordinator != *coordinator_info.key {
            msg!("Coordinator does not match the one registered with this raffle");
            return Err(RaffleError::CoordinatorMismatch.into());
        }

        let random_value = *random_words
            .first()
            .ok_or(RaffleError::InvalidInstruction)?;
        let mut ledger = LamportLedger::for_payout(raffle_info, winner_info)?;
        let now = Clock::get()?.unix_timestamp;

        let event = RaffleEngine::new(&mut raffle).on_randomness_received(
            &mut ledger,
            request_id,
            random_value,
            now,
        )?;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!(
            "Paid {} SOL to {}",
            utils::lamports_to_sol(event.prize),
            event.winner
        );
        RaffleEvent::from(event).emit();
        Ok(())
    }

    fn load_raffle(raffle_info: &AccountInfo, program_id: &Pubkey) -> Result<Raffle, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by the program");
            return Err(ProgramError::IncorrectProgramId);
        }
        Raffle::unpack(&raffle_info.data.borrow())
    }

    fn create_program_account<'a>(
        payer_info: &AccountInfo<'a>,
        new_account_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        space: usize,
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let rent = Rent::get()?;
        let rent_lamports = rent.minimum_balance(space);

        invoke_signed(
            &system_instruction::create_account(
                payer_info.key,
                new_account_info.key,
                rent_lamports,
                space as u64,
                program_id,
            ),
            &[
                payer_info.clone(),
                new_account_info.clone(),
                system_program_info.clone(),
            ],
            &[seeds],
        )
    }
}
