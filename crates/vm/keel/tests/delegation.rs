mod common;

use common::*;
use ethereum_types::{Address, U256};
use keel_evm::{
    InMemoryHost, Revision,
    host::precompiles::IDENTITY_ADDRESS,
    opcodes::Opcode,
    utils::{address_to_word, h256_to_word, keccak},
};

fn delegator() -> Address {
    Address::from_low_u64_be(0xbeef)
}

fn delegate() -> Address {
    Address::from_low_u64_be(0xd00d)
}

/// `0xef0100 ++ target`
fn designator(target: Address) -> Program {
    Program::new().raw(&[0xef, 0x01, 0x00]).raw(target.as_bytes())
}

fn with_delegation(revision: Revision, caller: Program, delegate_code: Program) -> InMemoryHost {
    host_with(revision, caller)
        .with_account(delegator(), account(designator(delegate())))
        .with_account(delegate(), account(delegate_code))
}

#[test]
fn call_runs_delegate_code_in_delegator_context() {
    let delegate_code = Program::new()
        .op(Opcode::ADDRESS)
        .push(0)
        .op(Opcode::SSTORE);
    let caller = Program::new().call(0xffff, delegator(), 0, 0, 0).return_top();
    let mut host = with_delegation(Revision::Prague, caller, delegate_code);
    let report = call_contract(Revision::Prague, &mut host);

    assert!(report.is_success());
    assert_eq!(report.output.to_vec(), word(1));
    assert_eq!(
        host.storage(&delegator(), U256::zero()),
        address_to_word(delegator())
    );
    assert_eq!(host.storage(&delegate(), U256::zero()), U256::zero());
}

#[test]
fn cold_delegate_is_charged_before_forwarding() {
    let caller = Program::new()
        .call(0xffff_ffff, delegator(), 0, 0, 32)
        .return_memory(32);
    let mut host = with_delegation(
        Revision::Prague,
        caller,
        Program::new().op(Opcode::GAS).return_top(),
    );
    let report = call_contract(Revision::Prague, &mut host);
    assert!(report.is_success());

    // Seven pushes and the warm CALL price, then the cold delegate, one word
    // of memory and the cold surcharge of the delegator.
    let gas_at_call = u64::try_from(TEST_GAS).unwrap() - 21 - 100;
    let after_cost = gas_at_call - 2600 - 3 - 2500;
    let forwarded = after_cost - after_cost / 64;
    assert_eq!(report.output.to_vec(), word(forwarded - 2));
}

#[test]
fn designator_is_plain_code_before_prague() {
    // 0xef is not an instruction, so the callee fails.
    let caller = Program::new().call(0xffff, delegator(), 0, 0, 0).return_top();
    let delegate_code = Program::new().push(1).push(0).op(Opcode::SSTORE);
    let mut host = with_delegation(Revision::Cancun, caller, delegate_code);
    let report = call_contract(Revision::Cancun, &mut host);

    assert!(report.is_success());
    assert_eq!(report.output.to_vec(), word(0));
    assert_eq!(host.storage(&delegator(), U256::zero()), U256::zero());
}

#[test]
fn extcode_reads_the_designator() {
    let caller = Program::new()
        .push_address(delegator())
        .op(Opcode::EXTCODESIZE)
        .push(0)
        .op(Opcode::MSTORE)
        .push_address(delegator())
        .op(Opcode::EXTCODEHASH)
        .push(32)
        .op(Opcode::MSTORE)
        .return_memory(64);
    let mut host = with_delegation(Revision::Prague, caller, Program::new().op(Opcode::STOP));
    let report = call_contract(Revision::Prague, &mut host);

    assert!(report.is_success());
    let mut expected = word(23);
    expected.extend(word(h256_to_word(keccak(designator(delegate()).bytes()))));
    assert_eq!(report.output.to_vec(), expected);
}

#[test]
fn top_level_call_to_delegator_runs_delegate_code() {
    let delegate_code = Program::new()
        .op(Opcode::ADDRESS)
        .push(0)
        .op(Opcode::SSTORE);
    let mut host = host_with(Revision::Prague, designator(delegate()))
        .with_account(delegate(), account(delegate_code));
    let report = call_contract(Revision::Prague, &mut host);

    assert!(report.is_success());
    assert_eq!(
        host.storage(&contract(), U256::zero()),
        address_to_word(contract())
    );
}

#[test]
fn delegation_to_precompile_runs_no_code() {
    let caller = Program::new()
        .push(0x61_62_63)
        .push(0)
        .op(Opcode::MSTORE)
        .call_with_value(Opcode::CALL, 0xffff, delegator(), 0, 29, 3, 0, 0)
        .op(Opcode::POP)
        .op(Opcode::RETURNDATASIZE)
        .return_top();
    let mut host = host_with(Revision::Prague, caller)
        .with_account(delegator(), account(designator(IDENTITY_ADDRESS)));
    let report = call_contract(Revision::Prague, &mut host);

    assert!(report.is_success());
    assert_eq!(report.output.to_vec(), word(0));
}
