//! # stakereview-types
//!
//! Shared types, errors, and configuration for the **stakereview**
//! reputation escrow.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`JointGrantId`], [`GrantKey`], [`AttemptKey`], [`PairKey`]
//! - **Single-sided escrow**: [`Grant`], [`GrantStatus`], [`Settlement`], [`Review`]
//! - **Two-sided escrow**: [`JointAttempt`], [`JointGrant`], [`JointGrantState`], [`Leg`], [`Outcome`]
//! - **Events**: [`EscrowEvent`] returned by every successful call
//! - **Configuration**: [`EscrowConfig`]
//! - **Errors**: [`EscrowError`] with `SR_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod grant;
pub mod ids;
pub mod joint;
pub mod review;

pub use config::*;
pub use error::*;
pub use event::*;
pub use grant::*;
pub use ids::*;
pub use joint::*;
pub use review::*;

// Constants are accessed via `stakereview_types::constants::FOO`
// (not re-exported to avoid name collisions).
