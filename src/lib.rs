//! An insertion-ordered, string-keyed map of heterogeneous values with
//! typed accessors that never fail on absence or type mismatch.
//!
//! ```
//! use context_map::ContextMap;
//!
//! let mut ctx = ContextMap::new();
//! ctx.put("timeoutSeconds", 30).put("mode", "fast");
//!
//! assert_eq!(ctx.get_long("timeoutSeconds"), 30);
//! assert!(!ctx.get_bool("timeoutSeconds"));
//! assert_eq!(ctx.get_string_or("region", "eu"), "eu");
//! ```

pub mod errors;
pub mod context;
pub mod value;
pub mod view;
pub mod convert;

pub use context::ContextMap;
pub use convert::to_map;
pub use errors::{ContextError, Result};
pub use value::{ContextValue, FromValue, ValueKind};
pub use view::ReadOnlyMap;
