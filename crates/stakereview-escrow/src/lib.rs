//! # stakereview-escrow
//!
//! **Custody engine**: a staker locks collateral against a future review
//! from a named counterparty. The review (or elapsed time) decides whether
//! the collateral goes back to the staker or into the lost-stakes pool.
//!
//! ## Architecture
//!
//! 1. **Ledger** / **Clock**: external collaborators behind traits
//! 2. **GrantRegistry**: single-sided grants (create, review, reclaim)
//! 3. **JointMatchRegistry**: pairs reciprocal attempts into joint grants
//!    and resolves them with sealed, simultaneously revealed reviews
//! 4. **LostStakesPool**: forfeited value, withdrawable by the custodian only
//! 5. **ConservationAudit**: checks no value is created or destroyed
//! 6. **StakeEscrow**: facade owning the store, ledger, and clock
//!
//! ## Call model
//!
//! Every operation is one atomic transaction: it validates, then applies
//! its state transition and fund movement together, or changes nothing.
//! Payouts commit the settled status *before* calling the ledger and
//! restore it if the ledger refuses. Expirations are compared lazily at
//! call time; nothing is scheduled.

pub mod clock;
pub mod conservation;
pub mod escrow;
pub mod grant_registry;
pub mod joint_registry;
pub mod ledger;
pub mod pool;

pub use clock::{Clock, ManualClock, SystemClock};
pub use conservation::ConservationAudit;
pub use escrow::{EscrowStore, StakeEscrow};
pub use grant_registry::GrantRegistry;
pub use joint_registry::JointMatchRegistry;
pub use ledger::{InMemoryLedger, Ledger};
pub use pool::LostStakesPool;
