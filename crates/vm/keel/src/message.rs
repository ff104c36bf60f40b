use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2 { salt: H256 },
}

impl CallKind {
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2 { .. })
    }

    /// Whether the message moves `value` from sender to recipient. Delegate
    /// calls only carry the caller's value for CALLVALUE and CALLCODE keeps it
    /// inside the same account.
    pub fn transfers_value(&self) -> bool {
        matches!(self, CallKind::Call | CallKind::Create | CallKind::Create2 { .. })
    }

    /// Whether the sender must hold `value`. CALLCODE moves nothing but still
    /// requires the funds.
    pub fn requires_balance(&self) -> bool {
        self.transfers_value() || matches!(self, CallKind::CallCode)
    }
}

/// Immutable description of a requested invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: CallKind,
    pub sender: Address,
    /// Account whose storage and balance the code runs against. `None` for
    /// creates, where it is derived during execution.
    pub recipient: Option<Address>,
    /// Account the code was loaded from. Differs from `recipient` for
    /// CALLCODE and DELEGATECALL.
    pub code_address: Address,
    /// Code to run. Init code for creates.
    pub code: Bytes,
    pub input: Bytes,
    pub value: U256,
    pub gas: i64,
    pub depth: usize,
    pub is_static: bool,
}

impl Message {
    /// Plain top-level call into `recipient` running `code`.
    pub fn call(sender: Address, recipient: Address, code: Bytes, input: Bytes, gas: i64) -> Self {
        Self {
            kind: CallKind::Call,
            sender,
            recipient: Some(recipient),
            code_address: recipient,
            code,
            input,
            value: U256::zero(),
            gas,
            depth: 0,
            is_static: false,
        }
    }

    /// Top-level contract creation running `init_code`.
    pub fn create(sender: Address, init_code: Bytes, value: U256, gas: i64) -> Self {
        Self {
            kind: CallKind::Create,
            sender,
            recipient: None,
            code_address: Address::zero(),
            code: init_code,
            input: Bytes::new(),
            value,
            gas,
            depth: 0,
            is_static: false,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_kind(mut self, kind: CallKind) -> Self {
        self.kind = kind;
        self
    }
}
