//! Registry Storage
//!
//! The registry keeps `name -> Arc<T>` in insertion order plus the stack of
//! names currently being built on the lock-holding thread.

use std::cell::RefCell;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::ReentrantMutex;
use tracing::{debug, info, warn};

use super::{Built, RegistryError, Template};

struct State<T> {
    entries: IndexMap<String, Arc<T>>,
    /// Names whose builders are running, outermost first.
    building: Vec<String>,
}

/// A build-once cache of named templates.
///
/// Construct one per session and pass it to generators. Cloning the
/// returned `Arc`s is cheap; the registry itself is not `Clone`.
pub struct TemplateRegistry<T> {
    state: ReentrantMutex<RefCell<State<T>>>,
}

/// Pops a name off the build stack when the builder returns or unwinds.
struct InProgress<'a, T> {
    state: &'a RefCell<State<T>>,
    name: &'a str,
}

impl<T> Drop for InProgress<'_, T> {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        if let Some(index) = state.building.iter().rposition(|n| n == self.name) {
            state.building.remove(index);
        }
    }
}

impl<T: Template> TemplateRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(State {
                entries: IndexMap::new(),
                building: Vec::new(),
            })),
        }
    }

    /// Return the template registered as `name`, building it first if needed.
    ///
    /// `builder` runs at most once per name for the lifetime of the entry.
    pub fn get_or_build<F, E>(&self, name: &str, builder: F) -> Result<Built<T>, RegistryError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.resolve(name, None, builder)
    }

    /// Like `get_or_build`, but also checks that the cached (or freshly
    /// built) template matches the fingerprint the caller expects.
    pub fn get_or_build_checked<F, E>(
        &self,
        name: &str,
        fingerprint: u64,
        builder: F,
    ) -> Result<Built<T>, RegistryError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.resolve(name, Some(fingerprint), builder)
    }

    /// Insert an already built template.
    ///
    /// Registering the same content twice returns the first `Arc`.
    pub fn register(&self, name: &str, template: T) -> Result<Built<T>, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        Self::insert(&mut state, name, template)
    }

    /// Remove `name` so the next request rebuilds it.
    ///
    /// Existing holders of the old `Arc` keep it.
    pub fn invalidate(&self, name: &str) -> Option<Arc<T>> {
        let guard = self.state.lock();
        let removed = guard.borrow_mut().entries.shift_remove(name);
        if removed.is_some() {
            debug!(template = name, "template invalidated");
        }
        removed
    }

    /// Drop any cached `name` and build it again.
    pub fn rebuild<F, E>(&self, name: &str, builder: F) -> Result<Built<T>, RegistryError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let _guard = self.state.lock();
        self.invalidate(name);
        self.get_or_build(name, builder)
    }

    /// Look up a template without building.
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().borrow().entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.state.lock().borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.state.lock().borrow().entries.keys().cloned().collect()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let guard = self.state.lock();
        guard.borrow_mut().entries.clear();
        debug!("template registry cleared");
    }

    fn resolve<F, E>(
        &self,
        name: &str,
        expected: Option<u64>,
        builder: F,
    ) -> Result<Built<T>, RegistryError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let guard = self.state.lock();

        {
            let mut state = guard.borrow_mut();
            if let Some(existing) = state.entries.get(name) {
                if let Some(expected) = expected {
                    Self::check(name, existing.fingerprint(), expected)?;
                }
                debug!(template = name, "template cache hit");
                return Ok(Built {
                    template: Arc::clone(existing),
                    built_now: false,
                });
            }
            if state.building.iter().any(|n| n == name) {
                let mut stack = state.building.clone();
                stack.push(name.to_owned());
                return Err(RegistryError::RecursiveBuild {
                    name: name.to_owned(),
                    stack,
                });
            }
            state.building.push(name.to_owned());
        }

        debug!(template = name, "template cache miss");
        let in_progress = InProgress {
            state: &*guard,
            name,
        };
        let result = builder();
        drop(in_progress);

        let template = match result {
            Ok(template) => template,
            Err(err) => {
                let source: Box<dyn StdError + Send + Sync> = err.into();
                warn!(template = name, error = %source, "template builder failed");
                return Err(RegistryError::Builder {
                    name: name.to_owned(),
                    source,
                });
            }
        };
        if let Some(expected) = expected {
            Self::check(name, expected, template.fingerprint())?;
        }

        let mut state = guard.borrow_mut();
        let built = Self::insert(&mut state, name, template)?;
        if built.built_now {
            info!(template = name, "template built");
        }
        Ok(built)
    }

    fn insert(state: &mut State<T>, name: &str, template: T) -> Result<Built<T>, RegistryError> {
        if let Some(existing) = state.entries.get(name) {
            Self::check(name, existing.fingerprint(), template.fingerprint())?;
            return Ok(Built {
                template: Arc::clone(existing),
                built_now: false,
            });
        }
        let template = Arc::new(template);
        state.entries.insert(name.to_owned(), Arc::clone(&template));
        Ok(Built {
            template,
            built_now: true,
        })
    }

    fn check(name: &str, existing: u64, incoming: u64) -> Result<(), RegistryError> {
        if existing == incoming {
            Ok(())
        } else {
            Err(RegistryError::DuplicateNameConflict {
                name: name.to_owned(),
                existing,
                incoming,
            })
        }
    }
}

impl<T: Template> Default for TemplateRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TemplateRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.state.lock();
        let state = guard.borrow();
        f.debug_struct("TemplateRegistry")
            .field("templates", &state.entries.keys().collect::<Vec<_>>())
            .field("building", &state.building)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Recipe(u64);

    impl Template for Recipe {
        fn fingerprint(&self) -> u64 {
            self.0
        }
    }

    fn ok(value: u64) -> Result<Recipe, std::io::Error> {
        Ok(Recipe(value))
    }

    #[test]
    fn builds_once_and_shares() {
        let registry = TemplateRegistry::new();
        let calls = AtomicI32::new(0);
        let builder = || {
            calls.fetch_add(1, Ordering::SeqCst);
            ok(1)
        };

        let first = registry.get_or_build("T", builder).unwrap();
        let second = registry.get_or_build("T", builder).unwrap();
        let third = registry.get_or_build("T", builder).unwrap();

        assert!(first.built_now);
        assert!(!second.built_now);
        assert!(!third.built_now);
        assert!(Arc::ptr_eq(&first.template, &second.template));
        assert!(Arc::ptr_eq(&first.template, &third.template));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_name_is_rejected() {
        let registry = TemplateRegistry::new();
        assert!(matches!(
            registry.get_or_build("", || ok(1)),
            Err(RegistryError::EmptyName)
        ));
        assert!(matches!(
            registry.register("", Recipe(1)),
            Err(RegistryError::EmptyName)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn failed_builder_leaves_name_free() {
        let registry: TemplateRegistry<Recipe> = TemplateRegistry::new();

        let err = registry
            .get_or_build("T", || Err::<Recipe, _>("socket missing"))
            .unwrap_err();
        match err {
            RegistryError::Builder { name, source } => {
                assert_eq!(name, "T");
                assert_eq!(source.to_string(), "socket missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!registry.contains("T"));

        let retry = registry.get_or_build("T", || ok(1)).unwrap();
        assert!(retry.built_now);
        assert!(registry.contains("T"));
    }

    #[test]
    fn nested_builders_share_the_lock() {
        let registry = TemplateRegistry::new();
        let inner_calls = AtomicI32::new(0);
        let build_inner = || {
            inner_calls.fetch_add(1, Ordering::SeqCst);
            ok(10)
        };

        let outer_a = registry
            .get_or_build("A", || {
                registry.get_or_build("Inner", build_inner)?;
                Ok::<_, RegistryError>(Recipe(1))
            })
            .unwrap();
        let outer_b = registry
            .get_or_build("B", || {
                registry.get_or_build("Inner", build_inner)?;
                Ok::<_, RegistryError>(Recipe(2))
            })
            .unwrap();

        assert!(outer_a.built_now && outer_b.built_now);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.names(), vec!["Inner", "A", "B"]);
    }

    #[test]
    fn self_request_is_reported() {
        let registry: TemplateRegistry<Recipe> = TemplateRegistry::new();

        let err = registry
            .get_or_build("Loop", || {
                registry.get_or_build("Loop", || ok(1))?;
                Ok::<_, RegistryError>(Recipe(1))
            })
            .unwrap_err();

        // The inner failure surfaces as the outer builder's error.
        let RegistryError::Builder { source, .. } = err else {
            panic!("expected builder error");
        };
        let inner = source.downcast_ref::<RegistryError>().unwrap();
        assert!(matches!(
            inner,
            RegistryError::RecursiveBuild { name, stack } if name == "Loop" && stack.len() == 2
        ));
        assert!(!registry.contains("Loop"));

        // The build stack was unwound, so the name is usable again.
        assert!(registry.get_or_build("Loop", || ok(1)).unwrap().built_now);
    }

    #[test]
    fn register_detects_conflicts() {
        let registry = TemplateRegistry::new();
        let first = registry.register("T", Recipe(1)).unwrap();
        assert!(first.built_now);

        let same = registry.register("T", Recipe(1)).unwrap();
        assert!(!same.built_now);
        assert!(Arc::ptr_eq(&first.template, &same.template));

        let err = registry.register("T", Recipe(2)).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateNameConflict {
                existing: 1,
                incoming: 2,
                ..
            }
        ));
    }

    #[test]
    fn checked_lookup_compares_fingerprints() {
        let registry = TemplateRegistry::new();
        registry.get_or_build_checked("T", 1, || ok(1)).unwrap();

        assert!(registry.get_or_build_checked("T", 1, || ok(1)).is_ok());
        assert!(matches!(
            registry.get_or_build_checked("T", 7, || ok(7)),
            Err(RegistryError::DuplicateNameConflict {
                existing: 1,
                incoming: 7,
                ..
            })
        ));

        // A builder that does not produce what was declared is rejected too.
        assert!(matches!(
            registry.get_or_build_checked("U", 3, || ok(4)),
            Err(RegistryError::DuplicateNameConflict { .. })
        ));
        assert!(!registry.contains("U"));
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let registry = TemplateRegistry::new();
        let calls = AtomicI32::new(0);
        let builder = || {
            calls.fetch_add(1, Ordering::SeqCst);
            ok(1)
        };

        let old = registry.get_or_build("T", builder).unwrap().template;
        assert!(registry.invalidate("T").is_some());
        assert!(registry.invalidate("T").is_none());

        let new = registry.get_or_build("T", builder).unwrap();
        assert!(new.built_now);
        assert!(!Arc::ptr_eq(&old, &new.template));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rebuild_replaces_entry() {
        let registry = TemplateRegistry::new();
        registry.get_or_build("T", || ok(1)).unwrap();

        let rebuilt = registry.rebuild("T", || ok(2)).unwrap();
        assert!(rebuilt.built_now);
        assert_eq!(registry.get("T").unwrap().fingerprint(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_empties_registry() {
        let registry = TemplateRegistry::new();
        registry.get_or_build("A", || ok(1)).unwrap();
        registry.get_or_build("B", || ok(2)).unwrap();
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get("A").is_none());
    }

    #[test]
    fn concurrent_requests_build_once() {
        let registry = TemplateRegistry::new();
        let calls = AtomicI32::new(0);

        let results: Vec<Arc<Recipe>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        registry
                            .get_or_build("Shared", || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                std::thread::sleep(Duration::from_millis(20));
                                ok(1)
                            })
                            .unwrap()
                            .template
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
