use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction")]
    InvalidInstruction,

    /// Entrance fee or interval out of range
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Payment below the entrance fee
    #[error("Not enough lamports sent to enter the raffle")]
    InsufficientPayment,

    /// Entry attempted while a winner is being drawn
    #[error("Raffle is not open")]
    RaffleNotOpen,

    /// No room left in the player list for this round
    #[error("Raffle is full for this round")]
    RaffleFull,

    /// Upkeep called while the raffle is not eligible
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// Fulfillment for a request the raffle is not waiting on
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Request id was never issued by the coordinator
    #[error("Nonexistent request")]
    NonexistentRequest,

    /// Fulfillment not signed by the coordinator authority
    #[error("Fulfillment signer is not the coordinator authority")]
    UnauthorizedFulfiller,

    /// Coordinator account is not the one bound to the raffle
    #[error("Coordinator does not match the raffle")]
    CoordinatorMismatch,

    /// Winner account supplied does not match the drawn player
    #[error("Winner account does not match the drawn player")]
    WinnerAccountMismatch,

    /// Ledger rejected the payout to the winner
    #[error("Payout to winner failed")]
    PayoutFailed,

    /// Draw attempted with an empty player list
    #[error("No players in the raffle")]
    NoPlayers,

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
