//! Pipeline stages for PDF-to-XML conversion.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the orchestrator in [`crate::convert`] only
//! sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! locate ──▶ fetch ──▶ extract ──▶ segment ──▶ serialize
//! (sign URL)  (GET)    (pdf text)  (tree)      (XML)
//!     │         │          │           │           │
//!     └─────────┴──────────┴───────────┴───────────┴──▶ fallback (on error)
//! ```
//!
//! 1. [`locate`]: turn a stored-file reference into a fetchable URL,
//!    signing it when it points into the content store
//! 2. [`fetch`]: one GET bounded by a timeout and a size cap; the only
//!    stage with network I/O
//! 3. [`extract`]: PDF bytes to plain text; runs in `spawn_blocking`
//! 4. [`segment`]: blank-line paragraph split plus optional heading
//!    detection
//! 5. [`serialize`]: pretty-printed XML from the tree
//! 6. [`fallback`]: minimal valid XML describing a failure

pub mod extract;
pub mod fallback;
pub mod fetch;
pub mod locate;
pub mod segment;
pub mod serialize;
