//! Trellis hook protocol
//!
//! Turns declaratively marked program elements into compiled, graph-wired
//! operations:
//!
//! ```text
//! ClassDescriptor ──▶ structural analysis (cached per class)
//!        │
//!        ▼
//! markers ──▶ HookRegistry ──▶ handlers ──▶ AggregateBuilder (one per element)
//!                                                │
//!                                                ▼
//!                              CombinePolicy check ──▶ binding resolution
//!                                                │
//!                                                ▼
//!                              Operation + DependencyNode + Producer
//! ```
//!
//! Handlers register through the [`registry::HOOK_HANDLERS`] distributed
//! slice or at runtime; every handler matching one element contributes to a
//! single shared aggregate before any binding is resolved.

pub mod aggregate;
pub mod binding;
pub mod builtin;
pub mod cache;
pub mod compiler;
pub mod registry;

pub use aggregate::{AggregateBuilder, AggregateResult, Claim, CombinePolicy, InvokeMode,
    SingleOwnerPolicy};
pub use binding::{BindingResolver, ProducerIndex};
pub use cache::{class_analysis, ClassAnalysis, ElementAnalysis};
pub use compiler::HookCompiler;
pub use registry::{list_hook_handlers, HookHandler, HookHandlerEntry, HookRegistry, HOOK_HANDLERS};
