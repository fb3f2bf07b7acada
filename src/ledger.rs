use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::invoke,
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::error::RaffleError;

/// Funds held for the current round.
///
/// Implementations must leave their books untouched when they return an
/// error, so a failed credit or payout never half-applies.
pub trait Ledger {
    /// Take `amount` from `participant` into the round pot
    fn credit(&mut self, participant: &Pubkey, amount: u64) -> ProgramResult;

    /// Lamports currently collected for the round
    fn round_balance(&self) -> Result<u64, ProgramError>;

    /// Send `amount` from the pot to `recipient`
    fn payout(&mut self, recipient: &Pubkey, amount: u64) -> ProgramResult;
}

/// Ledger backed by the raffle account's own lamports.
///
/// The round balance is whatever the vault holds above its rent-exempt
/// reserve, so a full payout leaves the account rent exempt with a zero pot.
pub struct LamportLedger<'a, 'info> {
    vault: &'a AccountInfo<'info>,
    counterparty: Option<&'a AccountInfo<'info>>,
    system_program: Option<&'a AccountInfo<'info>>,
    reserve: u64,
}

impl<'a, 'info> LamportLedger<'a, 'info> {
    /// Ledger that can only report the balance
    pub fn read_only(vault: &'a AccountInfo<'info>) -> Result<Self, ProgramError> {
        Ok(Self {
            vault,
            counterparty: None,
            system_program: None,
            reserve: Rent::get()?.minimum_balance(vault.data_len()),
        })
    }

    /// Ledger that accepts an entry fee from `payer` through the System Program
    pub fn for_entry(
        vault: &'a AccountInfo<'info>,
        payer: &'a AccountInfo<'info>,
        system_program: &'a AccountInfo<'info>,
    ) -> Result<Self, ProgramError> {
        let mut ledger = Self::read_only(vault)?;
        ledger.counterparty = Some(payer);
        ledger.system_program = Some(system_program);
        Ok(ledger)
    }

    /// Ledger that pays the pot out to `recipient`
    pub fn for_payout(
        vault: &'a AccountInfo<'info>,
        recipient: &'a AccountInfo<'info>,
    ) -> Result<Self, ProgramError> {
        let mut ledger = Self::read_only(vault)?;
        ledger.counterparty = Some(recipient);
        Ok(ledger)
    }
}

impl<'a, 'info> Ledger for LamportLedger<'a, 'info> {
    fn credit(&mut self, participant: &Pubkey, amount: u64) -> ProgramResult {
        let (payer_info, system_program_info) = match (self.counterparty, self.system_program) {
            (Some(payer), Some(system_program)) => (payer, system_program),
            _ => return Err(ProgramError::NotEnoughAccountKeys),
        };

        if payer_info.key != participant {
            msg!("Payer account does not match the entrant");
            return Err(ProgramError::InvalidArgument);
        }

        if payer_info.lamports() < amount {
            msg!(
                "Insufficient funds: needed {} lamports, had {} lamports",
                amount,
                payer_info.lamports()
            );
            return Err(ProgramError::InsufficientFunds);
        }

        invoke(
            &system_instruction::transfer(payer_info.key, self.vault.key, amount),
            &[
                payer_info.clone(),
                self.vault.clone(),
                system_program_info.clone(),
            ],
        )
    }

    fn round_balance(&self) -> Result<u64, ProgramError> {
        Ok(self.vault.lamports().saturating_sub(self.reserve))
    }

    fn payout(&mut self, recipient: &Pubkey, amount: u64) -> ProgramResult {
        let recipient_info = self.counterparty.ok_or(ProgramError::NotEnoughAccountKeys)?;

        if recipient_info.key != recipient {
            msg!(
                "Winner account {} does not match drawn player {}",
                recipient_info.key,
                recipient
            );
            return Err(RaffleError::WinnerAccountMismatch.into());
        }

        if !recipient_info.is_writable {
            msg!("Winner account must be writable");
            return Err(RaffleError::PayoutFailed.into());
        }

        if self.round_balance()? < amount {
            msg!("Vault cannot cover a payout of {} lamports", amount);
            return Err(RaffleError::PayoutFailed.into());
        }

        let vault_lamports = self
            .vault
            .lamports()
            .checked_sub(amount)
            .ok_or(RaffleError::Overflow)?;
        let recipient_lamports = recipient_info
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::Overflow)?;

        **self.vault.lamports.borrow_mut() = vault_lamports;
        **recipient_info.lamports.borrow_mut() = recipient_lamports;
        Ok(())
    }
}
