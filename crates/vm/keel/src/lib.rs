//! # keel
//!
//! An EVM bytecode interpreter that runs against an embedder-provided ledger.
//!
//! ## Overview
//!
//! keel executes one message (a call or a contract creation) and everything
//! it calls into, and reports the outcome. It owns no state: balances,
//! storage, code, logs and snapshots all live behind the [`Host`] trait.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │         (configuration, entry point, tracing span)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            VM                               │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  CallFrame  │  │   Memory    │  │       Stack         │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Substate   │  │ GasSchedule │  │   Environment       │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       dyn Host                              │
//! │     (accounts, storage, code, logs, precompiles, journal)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`Engine`]: entry point, one per configuration
//! - [`vm::VM`]: interpreter for a single call tree
//! - [`call_frame::CallFrame`]: execution context of each call
//! - [`memory::Memory`]: frame memory with expansion tracking
//! - [`gas_cost`]: per-revision cost tables and dynamic cost formulas
//! - [`host`]: the ledger contract and an in-memory implementation
//!
//! ## Supported Revisions
//!
//! Frontier through Prague. See [`Revision`].
//!
//! ## Usage
//!
//! ```
//! use bytes::Bytes;
//! use ethereum_types::Address;
//! use keel_evm::{Engine, InMemoryHost, Message, Revision};
//!
//! let mut host = InMemoryHost::new(Revision::Cancun);
//! // PUSH1 0x2a PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
//! let code = Bytes::from_static(&[0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3]);
//! let message = Message::call(Address::repeat_byte(1), Address::repeat_byte(2), code, Bytes::new(), 100_000);
//!
//! let report = Engine::default().execute(Revision::Cancun, &message, &mut host);
//! assert!(report.is_success());
//! assert_eq!(report.output.last(), Some(&0x2a));
//! ```

pub mod bytecode;
pub mod call_frame;
pub mod constants;
pub mod engine;
pub mod environment;
pub mod errors;
pub mod execution_handlers;
pub mod gas_cost;
pub mod host;
pub mod memory;
pub mod message;
pub mod opcode_handlers;
pub mod opcodes;
pub mod revision;
pub mod substate;
pub mod utils;
pub mod vm;

pub use engine::Engine;
pub use environment::{EVMConfig, Environment};
pub use errors::{
    ExceptionalHalt, ExecutionReport, ExecutionStatus, HostError, InternalError, VMError,
};
pub use host::{AccessListEntry, Host, InMemoryHost, Log, SnapshotId, StorageStatus, TxContext};
pub use message::{CallKind, Message};
pub use revision::Revision;
