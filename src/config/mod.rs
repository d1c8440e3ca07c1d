//! Configuration merge-and-validate pipeline.
//!
//! Builds one validated [`RuntimeConfig`] from ordered sources:
//! 1. **Resolve** - config paths become text sources (`files`)
//! 2. **Decode** - each source becomes a fragment (`decode`)
//! 3. **Merge** - fragments merge field by field, later wins (`merge`)
//! 4. **Validate** - defaults, environment probes and checks (`validate`)
//!
//! Fatal problems are [`ConfigError`](crate::error::ConfigError)s. Advisory
//! ones are returned as ordered warning strings next to a successful result.

mod builder;
mod decode;
pub mod duration;
mod files;
mod merge;
mod probes;
mod source;
mod types;
mod validate;

pub use builder::{Builder, LoadOpts, LoadResult, load};
pub use decode::{decode_source, parse_value};
pub use files::{resolve_sources, should_parse_file};
pub use merge::{deep_merge, deep_merge_all};
pub use probes::{Probes, ResourceKind, is_private_ipv4, is_public_ipv6};
pub use source::{Format, Source, TextSource};
pub use types::*;
pub use validate::{FILE_DESCRIPTOR_MARGIN, MAX_NODE_NAME_LENGTH, default_config, validate};
