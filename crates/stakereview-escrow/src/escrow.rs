//! The escrow facade: one entry point per call, each a single atomic
//! transaction against the [`EscrowStore`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use stakereview_types::{AccountId, EscrowConfig, EscrowEvent, Result};

use crate::{
    clock::Clock,
    conservation::ConservationAudit,
    grant_registry::GrantRegistry,
    joint_registry::JointMatchRegistry,
    ledger::{InMemoryLedger, Ledger},
    pool::LostStakesPool,
};

/// All custodial state: grant records, attempts and joint grants, and the
/// shared lost-stakes pool. Mutated only through the components'
/// operations.
pub struct EscrowStore {
    pub grants: GrantRegistry,
    pub joint: JointMatchRegistry,
    pub pool: LostStakesPool,
}

impl EscrowStore {
    #[must_use]
    pub fn new(config: &EscrowConfig) -> Self {
        Self {
            grants: GrantRegistry::new(config.clone()),
            joint: JointMatchRegistry::new(config.clone()),
            pool: LostStakesPool::new(config.custodian),
        }
    }

    /// Value held in custody on behalf of stakers.
    #[must_use]
    pub fn locked_total(&self) -> Decimal {
        self.grants.locked_total() + self.joint.locked_total()
    }
}

/// A running escrow instance bound to a ledger and a clock.
pub struct StakeEscrow<L: Ledger, C: Clock> {
    store: EscrowStore,
    ledger: L,
    clock: C,
    audit: ConservationAudit,
}

impl<L: Ledger, C: Clock> StakeEscrow<L, C> {
    /// Initialize with a validated config. The custodian is fixed here.
    ///
    /// # Errors
    /// `Configuration` if the config fails validation.
    pub fn new(config: &EscrowConfig, ledger: L, clock: C) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            custodian = %config.custodian,
            max_comment_bytes = config.max_comment_bytes,
            max_grant_duration_secs = config.max_grant_duration_secs,
            "Escrow initialized"
        );
        Ok(Self {
            store: EscrowStore::new(config),
            ledger,
            clock,
            audit: ConservationAudit::new(),
        })
    }

    fn record(&mut self, result: Result<Vec<EscrowEvent>>) -> Result<Vec<EscrowEvent>> {
        match &result {
            Ok(events) => self.audit.observe_all(events),
            Err(err) => tracing::debug!(error = %err, "Escrow call rejected"),
        }
        result
    }

    // --- Single-sided grants -------------------------------------------

    /// # Errors
    /// See [`GrantRegistry::create`].
    pub fn create_grant(
        &mut self,
        staker: AccountId,
        counterparty: AccountId,
        expires_at: DateTime<Utc>,
        amount: Decimal,
    ) -> Result<Vec<EscrowEvent>> {
        let result = self.store.grants.create(
            &mut self.ledger,
            &self.clock,
            staker,
            counterparty,
            expires_at,
            amount,
        );
        self.record(result)
    }

    /// # Errors
    /// See [`GrantRegistry::review`].
    pub fn review_grant(
        &mut self,
        reviewer: AccountId,
        staker: AccountId,
        negative: bool,
        comment: &str,
    ) -> Result<Vec<EscrowEvent>> {
        let result = self.store.grants.review(
            &mut self.store.pool,
            &self.clock,
            reviewer,
            staker,
            negative,
            comment,
        );
        self.record(result)
    }

    /// # Errors
    /// See [`GrantRegistry::reclaim`].
    pub fn reclaim_grant(
        &mut self,
        staker: AccountId,
        counterparty: AccountId,
    ) -> Result<Vec<EscrowEvent>> {
        let result =
            self.store
                .grants
                .reclaim(&mut self.ledger, &self.clock, staker, counterparty);
        self.record(result)
    }

    // --- Joint grants --------------------------------------------------

    /// # Errors
    /// See [`JointMatchRegistry::attempt`].
    pub fn attempt_joint(
        &mut self,
        initiator: AccountId,
        partner: AccountId,
        expires_at: DateTime<Utc>,
        amount: Decimal,
    ) -> Result<Vec<EscrowEvent>> {
        let result = self.store.joint.attempt(
            &mut self.ledger,
            &self.clock,
            initiator,
            partner,
            expires_at,
            amount,
        );
        self.record(result)
    }

    /// # Errors
    /// See [`JointMatchRegistry::cancel`].
    pub fn cancel_joint(
        &mut self,
        initiator: AccountId,
        partner: AccountId,
    ) -> Result<Vec<EscrowEvent>> {
        let result = self.store.joint.cancel(&mut self.ledger, initiator, partner);
        self.record(result)
    }

    /// # Errors
    /// See [`JointMatchRegistry::review`].
    pub fn review_joint(
        &mut self,
        reviewer: AccountId,
        reviewee: AccountId,
        negative: bool,
        comment: &str,
    ) -> Result<Vec<EscrowEvent>> {
        let result = self.store.joint.review(
            &mut self.store.pool,
            &self.clock,
            reviewer,
            reviewee,
            negative,
            comment,
        );
        self.record(result)
    }

    /// # Errors
    /// See [`JointMatchRegistry::reclaim`].
    pub fn reclaim_joint(
        &mut self,
        owner: AccountId,
        counterparty: AccountId,
    ) -> Result<Vec<EscrowEvent>> {
        let result =
            self.store
                .joint
                .reclaim(&mut self.ledger, &self.clock, owner, counterparty);
        self.record(result)
    }

    // --- Lost stakes ---------------------------------------------------

    /// Pay the shared pool to the custodian.
    ///
    /// # Errors
    /// See [`LostStakesPool::withdraw`].
    pub fn withdraw_lost_stakes(&mut self, caller: AccountId) -> Result<Vec<EscrowEvent>> {
        let result = self
            .store
            .pool
            .withdraw(&mut self.ledger, caller)
            .map(|event| vec![event]);
        self.record(result)
    }

    // --- Read paths ----------------------------------------------------

    #[must_use]
    pub fn store(&self) -> &EscrowStore {
        &self.store
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn audit(&self) -> &ConservationAudit {
        &self.audit
    }

    #[must_use]
    pub fn lost_stakes(&self) -> Decimal {
        self.store.pool.balance()
    }

    /// # Errors
    /// `ConservationViolation` if value was created or destroyed.
    pub fn verify_conservation(&self) -> Result<()> {
        self.audit.verify(
            self.store.locked_total(),
            self.store.pool.balance(),
            self.ledger.custody_balance(),
        )
    }
}

impl<C: Clock> StakeEscrow<InMemoryLedger, C> {
    /// Credit an account from outside the escrow. Custody is untouched.
    pub fn fund(&mut self, account: AccountId, amount: Decimal) {
        self.ledger.fund(account, amount);
        tracing::debug!(account = %account, amount = %amount, "Account funded");
    }
}
