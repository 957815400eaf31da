//! Rule database: owner keys, rules, and constant resolution.
//!
//! Rules are consumed as already-parsed records; extracting them from
//! annotation metadata, fetching rule files and verifying their integrity
//! all happen offline, outside this crate. What lives here is the immutable
//! index the pass reads ([`RuleIndex`]) and the one-time resolution step
//! that turns raw name/value text into shared symbol maps
//! ([`ConstantResolver`]).

mod index;
mod resolver;
mod rule;

pub use index::{OwnerKey, RuleIndex};
pub use resolver::{ConstantResolver, ConstantTable};
pub use rule::{Rule, SymbolMap, ValueKind};
