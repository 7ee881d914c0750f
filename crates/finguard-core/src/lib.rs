//! Hash-chained audit ledger for portfolio-rebalancing advice.
//!
//! finguard-core records every AI-driven and human-driven portfolio action
//! in a per-subject, append-only chain of records. Each record commits to
//! its own content and to its predecessor's commitment, so any later edit,
//! insertion, deletion, or reordering is detectable by re-walking the
//! chain.
//!
//! # Features
//!
//! - **Append-only semantics**: records can only be added, never modified
//!   or deleted; corrections are new records referencing the old one
//! - **Hash chaining**: SHA-256 over a canonical (RFC 8785) encoding of
//!   each record's committed fields plus the previous record's hash
//! - **Per-subject independence**: chains are partitioned by subject and
//!   appended concurrently without coordination
//! - **Structured verification**: [`verify::ChainVerifier`] produces a
//!   report of hash mismatches, chain breaks, and sequence gaps instead of
//!   failing fast
//! - **Pluggable storage**: any engine implementing [`store::AuditStore`]
//!   can back the ledger; `SQLite` with WAL mode is bundled
//!
//! # Example
//!
//! ```rust,no_run
//! use finguard_core::ledger::AuditLedger;
//! use finguard_core::record::{AppendRequest, TriggeredBy};
//! use finguard_core::store::SqliteAuditStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = AuditLedger::new(SqliteAuditStore::open("audit.db")?);
//!
//! ledger.append(
//!     AppendRequest::new(
//!         "user-1",
//!         "rebalance",
//!         "Reduce crypto exposure from 24.7% to 15%",
//!         TriggeredBy::AiAgent,
//!     )
//!     .with_assets(["BTC", "ETH", "AAPL"])
//!     .with_confidence(0.94)
//!     .with_reasoning("Bitcoin volatility increased 32% over 7 days"),
//! )?;
//!
//! let report = ledger.verify("user-1")?;
//! assert!(report.valid);
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod config;
pub mod decision;
pub mod hash;
pub mod ledger;
pub mod record;
pub mod store;
pub mod verify;

pub use canonical::{CANON_ID, CANON_VERSION, CanonicalError, HashEnvelope};
pub use decision::{DecisionSource, Trade, TradeAction, TradeRecommendation};
pub use hash::{GENESIS_HASH, content_hash};
pub use ledger::{AuditLedger, LedgerError};
pub use record::{AppendRequest, AuditRecord, TriggeredBy, ValidationError};
pub use store::{AuditStore, PersistenceError, SqliteAuditStore, StoreStats};
pub use verify::{ChainVerifier, IntegrityIssue, IssueKind, VerificationReport};
