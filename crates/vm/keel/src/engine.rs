use crate::{
    environment::{EVMConfig, Environment},
    errors::{ExceptionalHalt, ExecutionReport},
    host::Host,
    message::Message,
    revision::Revision,
    vm::VM,
};
use tracing::{instrument, warn};

/// Entry point for embedders. Holds only configuration, so one engine can
/// serve any number of call trees, each against its own host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engine {
    pub config: EVMConfig,
}

impl Engine {
    pub fn new(config: EVMConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &'static str {
        "keel"
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Executes `message` against `host` under the rules of `revision`.
    ///
    /// Never fails: host errors and broken engine invariants are reported as
    /// [`ExceptionalHalt::InternalHostError`].
    #[instrument(
        level = "trace",
        name = "Message execution",
        skip_all,
        fields(%revision, kind = ?message.kind, depth = message.depth, gas = message.gas)
    )]
    pub fn execute(
        &self,
        revision: Revision,
        message: &Message,
        host: &mut dyn Host,
    ) -> ExecutionReport {
        let tx = match host.get_tx_context() {
            Ok(tx) => tx,
            Err(error) => {
                warn!(%error, "Could not fetch transaction context");
                return ExecutionReport::failure(ExceptionalHalt::InternalHostError);
            }
        };

        let env = Environment::new(revision, self.config, tx);
        VM::new(env, host, message).execute(message)
    }
}
