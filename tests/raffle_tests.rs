use borsh::BorshDeserialize;
use solana_program::{program_pack::Pack, pubkey::Pubkey, sysvar::clock::Clock};
use solana_program_test::*;
use solana_sdk::{
    instruction::{Instruction, InstructionError},
    signature::{Keypair, Signer},
    system_instruction,
    transaction::{Transaction, TransactionError},
};

use upkeep_raffle::{
    engine::{UpkeepBlocker, UpkeepCheck},
    error::RaffleError,
    instruction,
    process_instruction,
    state::{Coordinator, Raffle, RaffleState},
    utils,
};

const ENTRANCE_FEE: u64 = 100_000_000; // 0.1 SOL
const INTERVAL: u64 = 30;
const PLAYER_FUNDS: u64 = 1_000_000_000; // 1 SOL

struct TestRaffle {
    context: ProgramTestContext,
    program_id: Pubkey,
    raffle: Pubkey,
}

// Setup program test with an initialized coordinator and raffle, both owned by the payer
async fn setup() -> TestRaffle {
    let program_id = Pubkey::new_unique();

    let program_test = ProgramTest::new(
        "upkeep_raffle",
        program_id,
        processor!(process_instruction),
    );
    let mut context = program_test.start_with_context().await;
    let authority = context.payer.pubkey();

    let init_coordinator = instruction::initialize_coordinator(&program_id, &authority).unwrap();
    let init_raffle =
        instruction::initialize_raffle(&program_id, &authority, ENTRANCE_FEE, INTERVAL).unwrap();
    process(&mut context, &[init_coordinator, init_raffle], &[])
        .await
        .unwrap();

    let (raffle, _) = utils::find_raffle_address(&program_id, &authority);
    TestRaffle {
        context,
        program_id,
        raffle,
    }
}

async fn process(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let mut transaction = Transaction::new_with_payer(instructions, Some(&context.payer.pubkey()));
    transaction.partial_sign(&[&context.payer], context.last_blockhash);
    for signer in signers {
        transaction.partial_sign(&[*signer], context.last_blockhash);
    }
    context.banks_client.process_transaction(transaction).await
}

// Runs the instructions through simulation and returns the program logs and return data
async fn simulate(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> (Vec<String>, Option<Vec<u8>>) {
    let mut transaction = Transaction::new_with_payer(instructions, Some(&context.payer.pubkey()));
    transaction.partial_sign(&[&context.payer], context.last_blockhash);
    for signer in signers {
        transaction.partial_sign(&[*signer], context.last_blockhash);
    }
    let simulation = context
        .banks_client
        .simulate_transaction(transaction)
        .await
        .unwrap();
    assert_eq!(simulation.result, Some(Ok(())));
    let details = simulation.simulation_details.unwrap();
    (details.logs, details.return_data.map(|data| data.data))
}

fn assert_logged(logs: &[String], line: &str) {
    assert!(
        logs.iter().any(|log| log.contains(line)),
        "missing {:?} in {:#?}",
        line,
        logs
    );
}

fn assert_raffle_error(result: Result<(), BanksClientError>, expected: RaffleError) {
    assert_eq!(
        result.unwrap_err().unwrap(),
        TransactionError::InstructionError(0, InstructionError::Custom(expected as u32))
    );
}

impl TestRaffle {
    async fn funded_player(&mut self) -> Keypair {
        let player = Keypair::new();
        let fund = system_instruction::transfer(
            &self.context.payer.pubkey(),
            &player.pubkey(),
            PLAYER_FUNDS,
        );
        process(&mut self.context, &[fund], &[]).await.unwrap();
        player
    }

    async fn enter(&mut self, player: &Keypair, amount: u64) -> Result<(), BanksClientError> {
        let ix =
            instruction::enter_raffle(&self.program_id, &player.pubkey(), &self.raffle, amount)
                .unwrap();
        process(&mut self.context, &[ix], &[player]).await
    }

    // Each call uses a fresh keeper so repeated upkeeps are distinct transactions
    async fn perform_upkeep(&mut self) -> Result<(), BanksClientError> {
        let keeper = Keypair::new();
        let ix =
            instruction::perform_upkeep(&self.program_id, &keeper.pubkey(), &self.raffle).unwrap();
        process(&mut self.context, &[ix], &[&keeper]).await
    }

    async fn fulfill(
        &mut self,
        request_id: u64,
        random_word: u64,
        winner: &Pubkey,
    ) -> Result<(), BanksClientError> {
        let ix = instruction::fulfill_random_words(
            &self.program_id,
            &self.context.payer.pubkey(),
            &self.raffle,
            winner,
            request_id,
            vec![random_word],
        )
        .unwrap();
        process(&mut self.context, &[ix], &[]).await
    }

    async fn check_upkeep(&mut self) -> UpkeepCheck {
        let ix = instruction::check_upkeep(&self.program_id, &self.raffle).unwrap();
        let (_, return_data) = simulate(&mut self.context, &[ix], &[]).await;
        UpkeepCheck::try_from_slice(&return_data.unwrap()).unwrap()
    }

    async fn advance_clock(&mut self, seconds: i64) {
        let mut clock: Clock = self.context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp += seconds;
        self.context.set_sysvar(&clock);
    }

    async fn raffle_state(&mut self) -> Raffle {
        let account = self
            .context
            .banks_client
            .get_account(self.raffle)
            .await
            .unwrap()
            .unwrap();
        Raffle::unpack(&account.data).unwrap()
    }

    async fn balance(&mut self, key: &Pubkey) -> u64 {
        self.context.banks_client.get_balance(*key).await.unwrap()
    }

    async fn rent_reserve(&mut self) -> u64 {
        let rent = self.context.banks_client.get_rent().await.unwrap();
        rent.minimum_balance(Raffle::LEN)
    }
}

#[tokio::test]
async fn test_initialize_raffle() {
    let mut test = setup().await;
    let authority = test.context.payer.pubkey();

    let raffle = test.raffle_state().await;
    let (coordinator_key, _) = utils::find_coordinator_address(&test.program_id);

    assert!(raffle.is_initialized);
    assert_eq!(raffle.authority, authority);
    assert_eq!(raffle.coordinator, coordinator_key);
    assert_eq!(raffle.entrance_fee, ENTRANCE_FEE);
    assert_eq!(raffle.interval, INTERVAL);
    assert_eq!(raffle.state, RaffleState::Open);
    assert_eq!(raffle.round, 0);
    assert_eq!(raffle.recent_winner, None);
    assert_eq!(raffle.pending_request_id, None);
    assert!(raffle.players.is_empty());

    let coordinator_account = test
        .context
        .banks_client
        .get_account(coordinator_key)
        .await
        .unwrap()
        .unwrap();
    let coordinator = Coordinator::unpack(&coordinator_account.data).unwrap();
    assert_eq!(coordinator.authority, authority);
    assert_eq!(coordinator.next_request_id, 1);

    // The vault starts with only its rent reserve
    let reserve = test.rent_reserve().await;
    let raffle_key = test.raffle;
    assert_eq!(test.balance(&raffle_key).await, reserve);
}

#[tokio::test]
async fn test_initialize_raffle_rejects_zero_fee() {
    let program_id = Pubkey::new_unique();
    let program_test = ProgramTest::new(
        "upkeep_raffle",
        program_id,
        processor!(process_instruction),
    );
    let mut context = program_test.start_with_context().await;
    let authority = context.payer.pubkey();

    let init_coordinator = instruction::initialize_coordinator(&program_id, &authority).unwrap();
    process(&mut context, &[init_coordinator], &[]).await.unwrap();

    let init_raffle = instruction::initialize_raffle(&program_id, &authority, 0, INTERVAL).unwrap();
    assert_raffle_error(
        process(&mut context, &[init_raffle], &[]).await,
        RaffleError::InvalidConfig,
    );
}

#[tokio::test]
async fn test_full_round_with_single_player() {
    let mut test = setup().await;
    let player = test.funded_player().await;
    let raffle_key = test.raffle;

    test.enter(&player, ENTRANCE_FEE).await.unwrap();
    let raffle = test.raffle_state().await;
    assert_eq!(raffle.players, vec![player.pubkey()]);
    let started_at = raffle.last_timestamp;

    // Interval has not passed yet
    assert_raffle_error(test.perform_upkeep().await, RaffleError::UpkeepNotNeeded);

    test.advance_clock(INTERVAL as i64).await;
    test.perform_upkeep().await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.state, RaffleState::Calculating);
    assert_eq!(raffle.pending_request_id, Some(1));

    let player_before = test.balance(&player.pubkey()).await;
    test.advance_clock(5).await;
    test.fulfill(1, 42, &player.pubkey()).await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.state, RaffleState::Open);
    assert!(raffle.players.is_empty());
    assert_eq!(raffle.recent_winner, Some(player.pubkey()));
    assert_eq!(raffle.pending_request_id, None);
    assert_eq!(raffle.round, 1);
    assert!(raffle.last_timestamp > started_at);

    assert_eq!(test.balance(&player.pubkey()).await, player_before + ENTRANCE_FEE);
    let reserve = test.rent_reserve().await;
    assert_eq!(test.balance(&raffle_key).await, reserve);
}

#[tokio::test]
async fn test_four_players_draw_uses_modulus() {
    let mut test = setup().await;
    let mut players = Vec::new();
    for _ in 0..4 {
        let player = test.funded_player().await;
        test.enter(&player, ENTRANCE_FEE).await.unwrap();
        players.push(player);
    }

    test.advance_clock(INTERVAL as i64 + 1).await;
    test.perform_upkeep().await.unwrap();

    // 101 mod 4 = 1
    let winner = players[1].pubkey();
    let winner_before = test.balance(&winner).await;
    test.fulfill(1, 101, &winner).await.unwrap();

    assert_eq!(test.balance(&winner).await, winner_before + 4 * ENTRANCE_FEE);
    let raffle = test.raffle_state().await;
    assert_eq!(raffle.recent_winner, Some(winner));
    assert!(raffle.players.is_empty());
}

#[tokio::test]
async fn test_enter_below_fee_fails() {
    let mut test = setup().await;
    let player = test.funded_player().await;
    let raffle_key = test.raffle;
    let vault_before = test.balance(&raffle_key).await;

    assert_raffle_error(
        test.enter(&player, ENTRANCE_FEE / 2).await,
        RaffleError::InsufficientPayment,
    );

    assert_eq!(test.balance(&raffle_key).await, vault_before);
    assert_eq!(test.balance(&player.pubkey()).await, PLAYER_FUNDS);
    assert!(test.raffle_state().await.players.is_empty());
}

#[tokio::test]
async fn test_enter_while_calculating_fails() {
    let mut test = setup().await;
    let first = test.funded_player().await;
    let second = test.funded_player().await;
    test.enter(&first, ENTRANCE_FEE).await.unwrap();

    test.advance_clock(INTERVAL as i64 + 1).await;
    test.perform_upkeep().await.unwrap();

    assert_raffle_error(
        test.enter(&second, ENTRANCE_FEE).await,
        RaffleError::RaffleNotOpen,
    );
    assert_eq!(test.raffle_state().await.players, vec![first.pubkey()]);

    // Upkeep cannot fire twice for the same round
    assert_raffle_error(test.perform_upkeep().await, RaffleError::UpkeepNotNeeded);
}

#[tokio::test]
async fn test_upkeep_without_players_fails() {
    let mut test = setup().await;
    test.advance_clock(10 * INTERVAL as i64).await;
    assert_raffle_error(test.perform_upkeep().await, RaffleError::UpkeepNotNeeded);
}

#[tokio::test]
async fn test_check_upkeep_is_read_only() {
    let mut test = setup().await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRANCE_FEE).await.unwrap();
    test.advance_clock(INTERVAL as i64).await;
    let before = test.raffle_state().await;

    let ix = instruction::check_upkeep(&test.program_id, &test.raffle).unwrap();
    process(&mut test.context, &[ix], &[]).await.unwrap();

    assert_eq!(test.raffle_state().await, before);
}

#[tokio::test]
async fn test_unissued_and_stale_fulfillments_are_rejected() {
    let mut test = setup().await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRANCE_FEE).await.unwrap();
    test.advance_clock(INTERVAL as i64).await;
    test.perform_upkeep().await.unwrap();

    // Never issued by the coordinator
    assert_raffle_error(
        test.fulfill(999, 7, &player.pubkey()).await,
        RaffleError::NonexistentRequest,
    );
    assert_eq!(test.raffle_state().await.state, RaffleState::Calculating);

    test.fulfill(1, 42, &player.pubkey()).await.unwrap();

    // Second round waits on request 2; replaying request 1 must not pay again.
    // A different amount keeps this entry from being a duplicate transaction.
    test.enter(&player, ENTRANCE_FEE + 1).await.unwrap();
    test.advance_clock(INTERVAL as i64).await;
    test.perform_upkeep().await.unwrap();
    let raffle = test.raffle_state().await;
    assert_eq!(raffle.pending_request_id, Some(2));

    let player_before = test.balance(&player.pubkey()).await;
    assert_raffle_error(
        test.fulfill(1, 43, &player.pubkey()).await,
        RaffleError::UnknownRequest,
    );
    assert_eq!(test.raffle_state().await, raffle);
    assert_eq!(test.balance(&player.pubkey()).await, player_before);
}

#[tokio::test]
async fn test_fulfillment_from_wrong_signer_fails() {
    let mut test = setup().await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRANCE_FEE).await.unwrap();
    test.advance_clock(INTERVAL as i64).await;
    test.perform_upkeep().await.unwrap();

    let impostor = Keypair::new();
    let ix = instruction::fulfill_random_words(
        &test.program_id,
        &impostor.pubkey(),
        &test.raffle,
        &player.pubkey(),
        1,
        vec![42],
    )
    .unwrap();
    assert_raffle_error(
        process(&mut test.context, &[ix], &[&impostor]).await,
        RaffleError::UnauthorizedFulfiller,
    );
    assert_eq!(test.raffle_state().await.state, RaffleState::Calculating);
}

#[tokio::test]
async fn test_wrong_winner_account_keeps_round_calculating() {
    let mut test = setup().await;
    let winner = test.funded_player().await;
    let other = test.funded_player().await;
    test.enter(&winner, ENTRANCE_FEE).await.unwrap();
    test.advance_clock(INTERVAL as i64).await;
    test.perform_upkeep().await.unwrap();

    assert_raffle_error(
        test.fulfill(1, 42, &other.pubkey()).await,
        RaffleError::PayoutFailed,
    );
    let raffle = test.raffle_state().await;
    assert_eq!(raffle.state, RaffleState::Calculating);
    assert_eq!(raffle.players, vec![winner.pubkey()]);
    assert_eq!(test.balance(&other.pubkey()).await, PLAYER_FUNDS);

    // The same fulfillment with the drawn player's account goes through
    test.fulfill(1, 42, &winner.pubkey()).await.unwrap();
    assert_eq!(test.raffle_state().await.recent_winner, Some(winner.pubkey()));
}

#[tokio::test]
async fn test_check_upkeep_returns_blockers() {
    let mut test = setup().await;

    let check = test.check_upkeep().await;
    assert_eq!(
        check.blockers,
        vec![
            UpkeepBlocker::IntervalNotElapsed,
            UpkeepBlocker::NoPlayers,
            UpkeepBlocker::NoBalance
        ]
    );

    let player = test.funded_player().await;
    test.enter(&player, ENTRANCE_FEE).await.unwrap();
    let check = test.check_upkeep().await;
    assert_eq!(check.blockers, vec![UpkeepBlocker::IntervalNotElapsed]);

    test.advance_clock(INTERVAL as i64).await;
    let check = test.check_upkeep().await;
    assert!(check.upkeep_needed());
    assert!(check.blockers.is_empty());

    test.perform_upkeep().await.unwrap();
    let check = test.check_upkeep().await;
    assert_eq!(check.blockers, vec![UpkeepBlocker::NotOpen]);
}

#[tokio::test]
async fn test_round_emits_events() {
    let mut test = setup().await;
    let player = test.funded_player().await;

    let enter = instruction::enter_raffle(
        &test.program_id,
        &player.pubkey(),
        &test.raffle,
        ENTRANCE_FEE,
    )
    .unwrap();
    let (logs, _) = simulate(&mut test.context, &[enter.clone()], &[&player]).await;
    assert_logged(
        &logs,
        &format!(
            "EntryRecorded: player={} amount={} round=0",
            player.pubkey(),
            ENTRANCE_FEE
        ),
    );
    process(&mut test.context, &[enter], &[&player])
        .await
        .unwrap();

    test.advance_clock(INTERVAL as i64).await;
    let keeper = Keypair::new();
    let upkeep =
        instruction::perform_upkeep(&test.program_id, &keeper.pubkey(), &test.raffle).unwrap();
    let (logs, _) = simulate(&mut test.context, &[upkeep.clone()], &[&keeper]).await;
    assert_logged(&logs, "RandomWordsRequested: request_id=1");
    assert_logged(&logs, "WinnerRequested: request_id=1 round=0");
    process(&mut test.context, &[upkeep], &[&keeper])
        .await
        .unwrap();

    let fulfill = instruction::fulfill_random_words(
        &test.program_id,
        &test.context.payer.pubkey(),
        &test.raffle,
        &player.pubkey(),
        1,
        vec![42],
    )
    .unwrap();
    let (logs, _) = simulate(&mut test.context, &[fulfill], &[]).await;
    assert_logged(
        &logs,
        &format!(
            "WinnerPicked: winner={} prize={} round=0",
            player.pubkey(),
            ENTRANCE_FEE
        ),
    );
}
