//! Template Registry
//!
//! Named, reusable subgraphs are expensive to assemble and are requested by
//! many independent generators. The registry builds each name at most once
//! and hands every caller the same shared artifact.
//!
//! # How It Works
//!
//! 1. A generator calls `get_or_build(name, builder)`.
//!
//! 2. If `name` is registered, the stored `Arc` is returned and the builder
//!    is dropped without running.
//!
//! 3. Otherwise the builder runs, the result is stored under `name` and
//!    returned. Builders may request other templates from the same registry;
//!    those nested requests follow the same rules.
//!
//! 4. A failed builder leaves `name` unregistered, so a retry starts clean.
//!
//! # Thread Safety
//!
//! The check-build-insert sequence runs under a single re-entrant lock. A
//! second thread asking for a name that is being built blocks until the
//! build finishes, then observes the cached result.

mod cache;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::graph::NodeGraph;

pub use cache::TemplateRegistry;

/// Content that can be cached by name.
pub trait Template {
    /// Structural hash of the content. Two values with different fingerprints
    /// must not share a name.
    fn fingerprint(&self) -> u64;
}

impl Template for NodeGraph {
    fn fingerprint(&self) -> u64 {
        NodeGraph::fingerprint(self)
    }
}

/// Result of a registry lookup.
pub struct Built<T> {
    /// The shared template.
    pub template: Arc<T>,
    /// `true` if this call constructed or inserted the template.
    pub built_now: bool,
}

impl<T> Built<T> {
    /// Drop the flag and keep the template.
    pub fn into_template(self) -> Arc<T> {
        self.template
    }
}

impl<T> Clone for Built<T> {
    fn clone(&self) -> Self {
        Self {
            template: Arc::clone(&self.template),
            built_now: self.built_now,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Built<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Built")
            .field("template", &self.template)
            .field("built_now", &self.built_now)
            .finish()
    }
}

/// Errors raised by the template registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("template name must not be empty")]
    EmptyName,

    /// The name is already taken by different content. This is a naming
    /// collision in client code.
    #[error(
        "template `{name}` is already registered with different content \
         (existing {existing:#018x}, incoming {incoming:#018x})"
    )]
    DuplicateNameConflict {
        name: String,
        existing: u64,
        incoming: u64,
    },

    /// The builder failed. The name stays unregistered.
    #[error("failed to build template `{name}`")]
    Builder {
        name: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A builder asked for its own name, directly or through other builders.
    #[error("template `{name}` was requested while it was being built ({})", .stack.join(" -> "))]
    RecursiveBuild { name: String, stack: Vec<String> },
}
