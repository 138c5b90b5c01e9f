use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    EngineError, InviteCodeSource, Percent, RandomInviteCodes, ResultEngine, SplitPolicy,
};

mod access;
mod goals;
mod groups;
mod invites;
mod settlement;
mod transactions;
mod users;

/// Default number of codes tried before giving up on an invite.
pub const DEFAULT_INVITE_CODE_ATTEMPTS: u32 = 10;

/// Run a block inside a DB transaction, committing on success and rolling
/// back on error. Raw store errors leaving the block are tagged with `$what`.
macro_rules! with_tx {
    ($self:expr, $what:expr, |$tx:ident| $body:expr) => {{
        let outcome = async {
            let $tx = sea_orm::TransactionTrait::begin(&$self.database).await?;
            let result: $crate::ResultEngine<_> = $body;
            let value = result?;
            $tx.commit().await?;
            Ok::<_, $crate::EngineError>(value)
        }
        .await;
        outcome.map_err(|err| err.with_context($what))
    }};
}

pub(crate) use with_tx;

/// Persistence-facing entry point. Every public operation takes the caller's
/// scope explicitly and runs in exactly one store transaction.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    split_policy: SplitPolicy,
    invite_codes: Arc<dyn InviteCodeSource>,
    invite_code_attempts: u32,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn split_policy(&self) -> &SplitPolicy {
        &self.split_policy
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    split_policy: SplitPolicy,
    invite_codes: Arc<dyn InviteCodeSource>,
    invite_code_attempts: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            split_policy: SplitPolicy::default(),
            invite_codes: Arc::new(RandomInviteCodes),
            invite_code_attempts: DEFAULT_INVITE_CODE_ATTEMPTS,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn split_policy(mut self, policy: SplitPolicy) -> EngineBuilder {
        self.split_policy = policy;
        self
    }

    /// Shortcut for a policy that only changes the tolerance.
    pub fn split_tolerance(mut self, tolerance: Percent) -> EngineBuilder {
        self.split_policy.tolerance = tolerance;
        self
    }

    /// Replace the random invite code generator.
    pub fn invite_codes(mut self, source: impl InviteCodeSource + 'static) -> EngineBuilder {
        self.invite_codes = Arc::new(source);
        self
    }

    pub fn invite_code_attempts(mut self, attempts: u32) -> EngineBuilder {
        self.invite_code_attempts = attempts;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.invite_code_attempts == 0 {
            return Err(EngineError::InvalidInput(
                "invite code attempts must be at least 1".to_string(),
            ));
        }
        if self.split_policy.tolerance.basis_points() <= 0 {
            return Err(EngineError::InvalidInput(
                "split tolerance must be > 0".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            split_policy: self.split_policy,
            invite_codes: self.invite_codes,
            invite_code_attempts: self.invite_code_attempts,
        })
    }
}
