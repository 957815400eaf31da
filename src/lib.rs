// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # symfold
//!
//! An SSA-based constant substitution pass for decompiled code: raw numeric
//! and string literals passed to known API calls are rewritten into reads
//! of the named symbolic constant they represent, so a bare `0` at a
//! `setVisibility` call site becomes `View.VISIBLE`.
//!
//! The rules driving the substitution are derived offline from enum-style
//! annotations (`IntDef`/`LongDef`/`StringDef`) on library APIs and
//! consumed here as an already-parsed database; `symfold` itself performs
//! no fetching, parsing of annotation metadata, or rule validation.
//!
//! ## Architecture
//!
//! - [`rules`] - The immutable rule database: [`rules::OwnerKey`] indexes
//!   [`rules::Rule`] records whose value-to-field maps are resolved once by
//!   [`rules::ConstantResolver`] and shared across rules.
//! - [`ir`] - The routine IR the pass consumes: an arena of instructions in
//!   SSA form with explicit def-use links and unlink-based removal.
//! - [`pass`] - [`pass::RewritePass`], the per-routine traversal that
//!   matches call sites, traces arguments to their defining literals and
//!   performs the substitution or bitmask annotation.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use symfold::ir::{ArgType, Insn, InvokeKind, MethodSig, Operand, Routine};
//! use symfold::pass::{EmptyHierarchy, RewritePass};
//! use symfold::rules::{ConstantResolver, ConstantTable, OwnerKey, Rule, RuleIndex, ValueKind};
//!
//! // One rule: argument 0 of View.setVisibility(int) is a visibility enum.
//! let key = OwnerKey::new("android.view.View", "void", "setVisibility", &["int".into()]);
//! let mut index = RuleIndex::new();
//! index.insert(Rule::new(
//!     key,
//!     0,
//!     false,
//!     "Android SDK",
//!     ValueKind::Int,
//!     Rule::parse_symbol_list("android.view.View.VISIBLE, android.view.View.GONE"),
//! ));
//!
//! // Resolve symbol values from the raw constant table.
//! let table = ConstantTable::parse("android.view.View.VISIBLE=0\nandroid.view.View.GONE=8\n");
//! ConstantResolver::new().attach_maps(&mut index, &table);
//!
//! // A routine calling setVisibility(0).
//! let mut routine = Routine::new("hide");
//! let block = routine.add_block();
//! let receiver = routine.new_var(ArgType::Object("android.view.View".into()), ArgType::Unknown);
//! let arg = routine.new_var(ArgType::Int, ArgType::Int);
//! routine.push(block, Insn::const_int(0, arg));
//! routine.push(block, Insn::invoke(
//!     InvokeKind::Virtual,
//!     MethodSig::new("android.view.View", "void", "setVisibility", ["int"]),
//!     vec![Operand::var(receiver), Operand::var(arg)],
//! ));
//!
//! let pass = RewritePass::new(Arc::new(index))?;
//! assert!(pass.run(&mut routine, &EmptyHierarchy));
//! assert!(format!("{routine}").contains("android.view.View.VISIBLE"));
//! # Ok::<(), symfold::Error>(())
//! ```
//!
//! ## Concurrency
//!
//! The rule index and resolved maps are built once, single-threaded, and
//! read-only afterwards. Each routine is processed independently;
//! [`pass::RewritePass::run_all`] fans out over routines with no shared
//! mutable state except the thread-safe [`pass::DependencySet`].

pub mod ir;
pub mod pass;
pub mod rules;

mod error;

pub use error::Error;

/// Convenience alias for operations that can fail with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Convenient re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::ir::{
        ArgType, FieldRef, Insn, InsnAttrs, InsnId, InsnKind, InvokeKind, MethodSig, Operand,
        OperandAttrs, Routine, SsaVar, UseSite, VarAttrs, VarId,
    };
    pub use crate::pass::{
        DependencySet, EmptyHierarchy, MapHierarchy, RewritePass, TypeHierarchy, PLATFORM_SOURCE,
    };
    pub use crate::rules::{
        ConstantResolver, ConstantTable, OwnerKey, Rule, RuleIndex, SymbolMap, ValueKind,
    };
    pub use crate::{Error, Result};
}
