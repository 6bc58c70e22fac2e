//! # Escrow Invariants Under Random Operation Sequences
//!
//! Drives the ledger with arbitrary commands from arbitrary signers across
//! two wagers between the same parties and checks after every step:
//!
//! - every live vault holds exactly `amount` or `2 × amount`;
//! - total supply never changes;
//! - a rejected call leaves the ledger snapshot untouched;
//! - the journal chain verifies.

use friendstake_core::{bet_address, vault_address, Identity, Namespace};
use friendstake_escrow::vault::expected_balance;
use friendstake_escrow::{Accounts, Command, Invocation, Ledger, LedgerConfig};
use proptest::prelude::*;

const START: u64 = 5_000;
const DESCRIPTIONS: [&str; 2] = ["first", "second"];

#[derive(Debug, Clone)]
enum Step {
    Make { wager: usize, amount: u64 },
    Cancel { wager: usize },
    Take { wager: usize },
    Decline { wager: usize },
    Settle { wager: usize, code: u8 },
}

fn step() -> impl Strategy<Value = Step> {
    let wager = 0..DESCRIPTIONS.len();
    prop_oneof![
        (wager.clone(), 0u64..3_000).prop_map(|(wager, amount)| Step::Make { wager, amount }),
        wager.clone().prop_map(|wager| Step::Cancel { wager }),
        wager.clone().prop_map(|wager| Step::Take { wager }),
        wager.clone().prop_map(|wager| Step::Decline { wager }),
        (wager, 0u8..4).prop_map(|(wager, code)| Step::Settle { wager, code }),
    ]
}

fn parties() -> [Identity; 3] {
    [
        Identity::from_bytes([0x10; 32]),
        Identity::from_bytes([0x20; 32]),
        Identity::from_bytes([0x30; 32]),
    ]
}

fn accounts(ns: &Namespace, wager: usize) -> Accounts {
    let [maker, opponent, judge] = parties();
    let bet = bet_address(ns, &maker, &opponent, &judge, DESCRIPTIONS[wager]).unwrap();
    let vault = vault_address(ns, &bet.address).unwrap();
    Accounts {
        maker,
        opponent,
        judge,
        bet: bet.address,
        vault: vault.address,
    }
}

fn command(step: &Step) -> (usize, Command) {
    match step {
        Step::Make { wager, amount } => (
            *wager,
            Command::Make {
                description: DESCRIPTIONS[*wager].to_string(),
                amount: *amount,
            },
        ),
        Step::Cancel { wager } => (*wager, Command::Cancel),
        Step::Take { wager } => (*wager, Command::Take),
        Step::Decline { wager } => (*wager, Command::Decline),
        Step::Settle { wager, code } => (*wager, Command::Settle { winner: *code }),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_sequences_preserve_invariants(
        steps in prop::collection::vec((step(), 0usize..3), 1..40)
    ) {
        let ledger = Ledger::new(Namespace::default(), LedgerConfig { record_deposit: 7 });
        for id in parties() {
            ledger.airdrop(&id, START).unwrap();
        }
        let supply = ledger.total_supply();
        let ns = ledger.namespace();

        for (step, signer_index) in &steps {
            let (wager, cmd) = command(step);
            let signer = parties()[*signer_index];
            let invocation = Invocation { accounts: accounts(&ns, wager), command: cmd };

            let before = ledger.snapshot();
            let result = ledger.submit(&signer, &invocation);
            if result.is_err() {
                prop_assert_eq!(ledger.snapshot(), before);
            }

            prop_assert_eq!(ledger.total_supply(), supply);
            prop_assert!(ledger.check_invariants().is_ok());
            for wager in 0..DESCRIPTIONS.len() {
                let acc = accounts(&ns, wager);
                let vault = ledger.vault_balance(&acc.vault);
                match ledger.fetch(&acc.bet).unwrap() {
                    Some(record) => {
                        let expected = expected_balance(record.amount, record.players_deposited).unwrap();
                        prop_assert_eq!(vault, expected);
                    }
                    None => prop_assert_eq!(vault, 0),
                }
            }
        }
        prop_assert!(ledger.verify_journal().is_ok());
    }

    #[test]
    fn only_the_judge_can_settle(code in any::<u8>(), signer_index in 0usize..2) {
        let ledger = Ledger::new(Namespace::default(), LedgerConfig::without_deposit());
        let [maker, opponent, _] = parties();
        ledger.airdrop(&maker, START).unwrap();
        ledger.airdrop(&opponent, START).unwrap();
        let accounts = accounts(&ledger.namespace(), 0);
        let make = Command::Make { description: DESCRIPTIONS[0].into(), amount: 100 };
        ledger.submit(&maker, &Invocation { accounts, command: make }).unwrap();
        ledger.submit(&opponent, &Invocation { accounts, command: Command::Take }).unwrap();

        let before = ledger.snapshot();
        let signer = parties()[signer_index];
        let cmd = Command::Settle { winner: code };
        let err = ledger.submit(&signer, &Invocation { accounts, command: cmd }).unwrap_err();
        prop_assert_eq!(err.kind(), "Unauthorized");
        prop_assert_eq!(ledger.snapshot(), before);
    }
}
