mod common;

use bytes::Bytes;
use common::*;
use ethereum_types::{H256, U256};
use keel_evm::{
    Engine, ExceptionalHalt, ExecutionStatus, InMemoryHost, Message, Revision, TxContext,
    host::precompiles::IDENTITY_ADDRESS, opcodes::Opcode,
};

#[test]
fn returns_zeroed_memory_word() {
    let code = Program::new()
        .push(0)
        .push(0)
        .push(0)
        .push(0)
        .push(0)
        .push(32)
        .push(0)
        .op(Opcode::RETURN);
    assert_eq!(
        code.clone().bytes().to_vec(),
        hex::decode("6000600060006000600060206000f3").unwrap()
    );
    let (report, _) = run(Revision::Cancun, code);

    assert!(report.is_success());
    assert_eq!(report.output.as_ref(), [0u8; 32]);
    // Seven pushes plus one word of memory.
    assert_eq!(gas_used(&report), 7 * 3 + 3);
    assert_eq!(report.gas_refund, 0);
    assert_eq!(report.created_address, None);
}

#[test]
fn arithmetic_wraps_and_signs() {
    // (2^256 - 1) + 2 == 1
    let code = Program::new().push(2).push(U256::MAX).op(Opcode::ADD).return_top();
    let (report, _) = run(Revision::Cancun, code);
    assert_eq!(report.output.to_vec(), word(1));

    // -8 / 3 == -2 (SDIV truncates toward zero)
    let minus_eight = U256::MAX - U256::from(7);
    let code = Program::new().push(3).push(minus_eight).op(Opcode::SDIV).return_top();
    let (report, _) = run(Revision::Cancun, code);
    assert_eq!(report.output.to_vec(), word(U256::MAX - U256::one()));

    // Division by zero yields zero.
    let code = Program::new().push(0).push(10).op(Opcode::DIV).return_top();
    let (report, _) = run(Revision::Cancun, code);
    assert_eq!(report.output.to_vec(), word(0));

    // ADDMOD does not lose the carry: (2^256 - 1 + 2) % 3
    let code = Program::new()
        .push(3)
        .push(2)
        .push(U256::MAX)
        .op(Opcode::ADDMOD)
        .return_top();
    let (report, _) = run(Revision::Cancun, code);
    // 2^256 + 1 == 2 (mod 3)
    assert_eq!(report.output.to_vec(), word(2));
}

#[test]
fn exp_charges_per_exponent_byte() {
    let code = Program::new().push(0x0100).push(2).op(Opcode::EXP).op(Opcode::STOP);
    let (report, _) = run(Revision::Cancun, code);
    assert!(report.is_success());
    assert_eq!(gas_used(&report), 3 + 3 + 10 + 2 * 50);

    let (report, _) = run(
        Revision::Homestead,
        Program::new().push(0x0100).push(2).op(Opcode::EXP).op(Opcode::STOP),
    );
    assert_eq!(gas_used(&report), 3 + 3 + 10 + 2 * 10);
}

#[test]
fn stack_limit_is_1024() {
    let fits = Program::new().raw(&[0x5f; 1024]);
    let (report, _) = run(Revision::Cancun, fits);
    assert!(report.is_success());

    let overflows = Program::new().raw(&[0x5f; 1025]);
    let (report, _) = run(Revision::Cancun, overflows);
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::StackOverflow)
    );
    assert_eq!(report.gas_left, 0);
}

#[test]
fn stack_underflow_fails() {
    let (report, _) = run(Revision::Cancun, Program::new().push(1).op(Opcode::ADD));
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::StackUnderflow)
    );
}

#[test]
fn jumps_land_only_on_jumpdest() {
    // PUSH1 4 JUMP STOP JUMPDEST STOP
    let valid = Program::new()
        .push(4)
        .op(Opcode::JUMP)
        .op(Opcode::STOP)
        .op(Opcode::JUMPDEST)
        .op(Opcode::STOP);
    let (report, _) = run(Revision::Cancun, valid);
    assert!(report.is_success());
    assert_eq!(gas_used(&report), 3 + 8 + 1);

    // The 0x5b at offset 1 is the immediate of PUSH1.
    let into_immediate = Program::new().push(0x5b).push(1).op(Opcode::JUMP);
    let (report, _) = run(Revision::Cancun, into_immediate);
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::InvalidJump)
    );
    assert_eq!(report.gas_left, 0);

    let past_end = Program::new().push(U256::MAX).op(Opcode::JUMP);
    let (report, _) = run(Revision::Cancun, past_end);
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::InvalidJump)
    );
}

#[test]
fn jumpi_falls_through_on_zero() {
    // PUSH1 0 PUSH1 7 JUMPI PUSH1 1 STOP; offset 7 is not a JUMPDEST but is never taken.
    let code = Program::new()
        .push(0)
        .push(7)
        .op(Opcode::JUMPI)
        .push(1)
        .return_top();
    let (report, _) = run(Revision::Cancun, code);
    assert!(report.is_success());
    assert_eq!(report.output.to_vec(), word(1));
}

#[test]
fn invalid_opcode_consumes_everything() {
    let (report, _) = run(Revision::Cancun, Program::new().op(Opcode::INVALID));
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::InvalidOpcode)
    );
    assert_eq!(report.gas_left, 0);
    assert!(report.output.is_empty());

    // Unassigned byte.
    let (report, _) = run(Revision::Cancun, Program::new().raw(&[0x0c]));
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::InvalidOpcode)
    );
}

#[test]
fn opcodes_follow_revision() {
    let cases = [
        (Opcode::PUSH0, Revision::London, Revision::Shanghai),
        (Opcode::TLOAD, Revision::Shanghai, Revision::Cancun),
        (Opcode::CHAINID, Revision::Constantinople, Revision::Istanbul),
        (Opcode::SHL, Revision::Byzantium, Revision::Constantinople),
        (Opcode::RETURNDATASIZE, Revision::Homestead, Revision::Byzantium),
        (Opcode::DELEGATECALL, Revision::Frontier, Revision::Homestead),
        (Opcode::BASEFEE, Revision::Berlin, Revision::London),
    ];

    for (opcode, before, from) in cases {
        // Enough operands for any of the opcodes above.
        let code = || {
            Program::new()
                .push(0)
                .push(0)
                .push(0)
                .push(0)
                .push(0)
                .push(0)
                .op(opcode)
        };
        let (report, _) = run(before, code());
        assert_eq!(
            report.status,
            ExecutionStatus::Failure(ExceptionalHalt::InvalidOpcode),
            "{opcode:?} in {before}"
        );
        let (report, _) = run(from, code());
        assert!(report.is_success(), "{opcode:?} in {from}: {:?}", report.status);
    }
}

#[test]
fn memory_growth_charges_only_the_delta() {
    let code = Program::new()
        .push(1)
        .push(0)
        .op(Opcode::MSTORE) // 1 word
        .push(1)
        .push(32)
        .op(Opcode::MSTORE) // 2 words
        .push(1)
        .push(0)
        .op(Opcode::MSTORE); // already paid
    let (report, _) = run(Revision::Cancun, code);
    assert_eq!(gas_used(&report), (6 + 3 + 3) + (6 + 3 + 3) + (6 + 3));

    let code = Program::new()
        .push(1)
        .push(0x03e0)
        .op(Opcode::MSTORE) // 32 words: 32 * 32 / 512 + 3 * 32 = 98
        .push(1)
        .push(0x07e0)
        .op(Opcode::MSTORE); // 64 words: 8 + 192 = 200
    let (report, _) = run(Revision::Cancun, code);
    assert_eq!(gas_used(&report), (9 + 98) + (9 + 102));
}

#[test]
fn huge_memory_offsets_run_out_of_gas() {
    let code = Program::new().push(1).push(U256::MAX).op(Opcode::MSTORE);
    let (report, _) = run(Revision::Cancun, code);
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::OutOfGas)
    );

    // Zero sized accesses ignore the offset.
    let code = Program::new()
        .push(0)
        .push(U256::MAX)
        .op(Opcode::RETURN);
    let (report, _) = run(Revision::Cancun, code);
    assert!(report.is_success());
    assert!(report.output.is_empty());
}

#[test]
fn revert_keeps_output_and_unused_gas() {
    let code = Program::new()
        .push(0x2a)
        .push(0)
        .op(Opcode::MSTORE)
        .push(32)
        .push(0)
        .op(Opcode::REVERT);
    let (report, _) = run(Revision::Cancun, code);
    assert!(report.is_revert());
    assert_eq!(report.output.to_vec(), word(0x2a));
    assert_eq!(gas_used(&report), 3 + 3 + 6 + 3 + 3);
    assert_eq!(report.gas_refund, 0);
}

#[test]
fn out_of_gas_reports_nothing_left() {
    let mut host = host_with(Revision::Cancun, Program::new().push(1).push(2).op(Opcode::ADD));
    let message = Message::call(
        sender(),
        contract(),
        host.account(&contract()).unwrap().code.clone(),
        Bytes::new(),
        8,
    );
    let report = Engine::default().execute(Revision::Cancun, &message, &mut host);
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::OutOfGas)
    );
    assert_eq!(report.gas_left, 0);
}

#[test]
fn calldata_is_zero_padded() {
    let code = Program::new().push(30).op(Opcode::CALLDATALOAD).return_top();
    let mut host = host_with(Revision::Cancun, code);
    let message = Message::call(
        sender(),
        contract(),
        host.account(&contract()).unwrap().code.clone(),
        Bytes::from((0u8..32).collect::<Vec<_>>()),
        TEST_GAS,
    );
    let report = Engine::default().execute(Revision::Cancun, &message, &mut host);

    let mut expected = [0u8; 32];
    expected[0] = 30;
    expected[1] = 31;
    assert_eq!(report.output.as_ref(), expected);
}

#[test]
fn keccak_of_empty_input() {
    let code = Program::new().push(0).push(0).op(Opcode::KECCAK256).return_top();
    let (report, _) = run(Revision::Cancun, code);
    assert_eq!(
        report.output.as_ref(),
        hex_literal::hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
    );
}

#[test]
fn block_context_is_visible() {
    let tx = TxContext {
        block_number: 300,
        chain_id: U256::from(1337),
        timestamp: 1_700_000_000,
        prev_randao: H256::repeat_byte(0x77),
        difficulty: U256::from(99),
        ..Default::default()
    };
    let recent = H256::repeat_byte(0xaa);

    let run_with = |revision: Revision, code: Program| {
        let mut host = host_with(revision, code)
            .with_tx_context(tx.clone())
            .with_block_hash(299, recent)
            .with_block_hash(10, H256::repeat_byte(0xbb));
        call_contract(revision, &mut host)
    };

    let report = run_with(Revision::Cancun, Program::new().push(299).op(Opcode::BLOCKHASH).return_top());
    assert_eq!(report.output.as_ref(), recent.as_bytes());

    // Too old, and the current block.
    for number in [10u64, 300] {
        let report = run_with(
            Revision::Cancun,
            Program::new().push(number).op(Opcode::BLOCKHASH).return_top(),
        );
        assert_eq!(report.output.to_vec(), word(0), "block {number}");
    }

    let report = run_with(Revision::Cancun, Program::new().op(Opcode::CHAINID).return_top());
    assert_eq!(report.output.to_vec(), word(1337));

    let report = run_with(Revision::Cancun, Program::new().op(Opcode::PREVRANDAO).return_top());
    assert_eq!(report.output.as_ref(), H256::repeat_byte(0x77).as_bytes());

    let report = run_with(Revision::London, Program::new().op(Opcode::PREVRANDAO).return_top());
    assert_eq!(report.output.to_vec(), word(99));
}

#[test]
fn top_level_checks() {
    let mut host = host_with(Revision::Cancun, Program::new());

    let too_deep = Message {
        depth: 1025,
        ..Message::call(sender(), contract(), Bytes::new(), Bytes::new(), TEST_GAS)
    };
    let report = Engine::default().execute(Revision::Cancun, &too_deep, &mut host);
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::CallDepthExceeded)
    );

    let broke = Message::call(other(), contract(), Bytes::new(), Bytes::new(), TEST_GAS)
        .with_value(U256::from(10));
    let report = Engine::default().execute(Revision::Cancun, &broke, &mut host);
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::InsufficientBalance)
    );

    let paying = Message::call(sender(), contract(), Bytes::new(), Bytes::new(), TEST_GAS)
        .with_value(U256::from(10));
    let report = Engine::default().execute(Revision::Cancun, &paying, &mut host);
    assert!(report.is_success());
    assert_eq!(host.balance(&contract()), U256::from(10));
}

#[test]
fn top_level_precompile() {
    let mut host = InMemoryHost::new(Revision::Cancun);
    let message = Message::call(
        sender(),
        IDENTITY_ADDRESS,
        Bytes::new(),
        Bytes::from_static(b"abc"),
        100,
    );
    let report = Engine::default().execute(Revision::Cancun, &message, &mut host);
    assert!(report.is_success());
    assert_eq!(report.output.as_ref(), b"abc");
    assert_eq!(report.gas_left, 100 - 18);

    let starved = Message { gas: 10, ..message };
    let report = Engine::default().execute(Revision::Cancun, &starved, &mut host);
    assert_eq!(
        report.status,
        ExecutionStatus::Failure(ExceptionalHalt::OutOfGas)
    );
}

#[test]
fn execution_is_deterministic() {
    let code = Program::new()
        .op(Opcode::CALLER)
        .push(0)
        .op(Opcode::SSTORE)
        .push(7)
        .push(1)
        .op(Opcode::SSTORE)
        .op(Opcode::GAS)
        .return_top();
    let host = host_with(Revision::Cancun, code);

    let mut first = host.clone();
    let mut second = host;
    let a = call_contract(Revision::Cancun, &mut first);
    let b = call_contract(Revision::Cancun, &mut second);

    assert_eq!(a, b);
    for key in 0..2u64 {
        assert_eq!(
            first.storage(&contract(), U256::from(key)),
            second.storage(&contract(), U256::from(key))
        );
    }
    assert_eq!(first.storage(&contract(), U256::one()), U256::from(7));
}
