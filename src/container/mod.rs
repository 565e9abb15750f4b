//! Dependency resolution container
//!
//! A resolve request first consults the registry. On a miss the requested type goes
//! through constructor selection, breadth-first graph building and bottom-up execution.
//! The maximum instantiation depth bounds every graph and is the only guard against
//! circular constructor chains.

pub mod fallback;
pub mod graph;
mod members;
pub mod registry;
pub mod selector;

pub use registry::{Factory, Origin, Registration, Registry};

use crate::config::ContainerConfig;
use crate::errors::{ExceededMaxDepthError, RegistrationError, ResolutionError, ResolveFailure};
use crate::logging::OperationTimer;
use crate::reflect::{downcast, erase, BoxError, Object, Reflect, TypeRef};
use graph::{GraphBuilder, GraphCounters};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::cell::Cell;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

type DepthObserver = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Handle returned by [`Container::on_max_depth_changed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

thread_local! {
    static NESTING: Cell<u32> = const { Cell::new(0) };
}

/// Tracks resolves nested inside factories on the current thread
struct NestingGuard;

impl NestingGuard {
    fn enter(type_ref: TypeRef, limit: u32) -> Result<Self, ResolveFailure> {
        let depth = NESTING.with(|nesting| nesting.get());
        if depth > limit {
            return Err(ExceededMaxDepthError {
                type_name: type_ref.name(),
                depth,
                max_depth: limit,
            }
            .into());
        }
        NESTING.with(|nesting| nesting.set(depth + 1));
        Ok(Self)
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        NESTING.with(|nesting| nesting.set(nesting.get().saturating_sub(1)));
    }
}

/// Container statistics (atomic counters)
#[derive(Default)]
struct InnerStats {
    total_resolutions: AtomicUsize,
    failed_resolutions: AtomicUsize,
    factory_invocations: AtomicUsize,
    constructor_invocations: AtomicUsize,
}

/// Snapshot of container statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub failed_resolutions: usize,
    pub factory_invocations: usize,
    pub constructor_invocations: usize,
}

impl ContainerStats {
    pub fn succeeded(&self) -> usize {
        self.total_resolutions.saturating_sub(self.failed_resolutions)
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_resolutions == 0 {
            0.0
        } else {
            self.failed_resolutions as f64 / self.total_resolutions as f64
        }
    }
}

struct Inner {
    registry: Registry,
    /// Read once per resolve; concurrent changes race with in-flight resolves
    max_depth: AtomicU32,
    max_nested: u32,
    observers: RwLock<Vec<(ObserverId, DepthObserver)>>,
    next_observer: AtomicU64,
    stats: InnerStats,
}

/// Constructor-driven resolution container
///
/// Cloning is cheap and every clone shares the same registry.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

lazy_static! {
    static ref GLOBAL: Container = {
        let config = ContainerConfig::default().with_env().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "Ignoring invalid container environment");
            ContainerConfig::default()
        });
        Container::with_config(config)
    };
}

impl Container {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Registry::new(),
                max_depth: AtomicU32::new(config.max_instantiation_depth),
                max_nested: config.max_nested_resolutions,
                observers: RwLock::new(Vec::new()),
                next_observer: AtomicU64::new(0),
                stats: InnerStats::default(),
            }),
        }
    }

    /// Process-wide container, created on first use and never torn down
    pub fn global() -> &'static Container {
        &GLOBAL
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    // ---- registration -------------------------------------------------------

    /// Register a factory for `T`
    pub fn register<T, F>(&self, factory: F) -> Result<(), RegistrationError>
    where
        T: ?Sized + Reflect,
        F: Fn() -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || -> Result<Object, BoxError> { factory().map(erase) });
        self.register_type(TypeRef::of::<T>(), factory)
    }

    /// Register an infallible factory producing a fresh `T` per resolve
    pub fn register_fn<T, F>(&self, factory: F) -> Result<(), RegistrationError>
    where
        T: Reflect,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register::<T, _>(move || Ok(Arc::new(factory())))
    }

    /// Register a factory that receives the container, for factories that resolve
    /// their own dependencies
    pub fn register_with<T, F>(&self, factory: F) -> Result<(), RegistrationError>
    where
        T: ?Sized + Reflect,
        F: Fn(&Container) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        let key = TypeRef::of::<T>();
        let weak = self.downgrade();
        let factory: Factory = Arc::new(move || -> Result<Object, BoxError> {
            let inner = weak.upgrade().ok_or(ResolveFailure::ContainerDropped(key.name()))?;
            factory(&Container { inner }).map(erase)
        });
        self.register_type(key, factory)
    }

    /// Register an already erased factory
    pub fn register_type(&self, key: TypeRef, factory: Factory) -> Result<(), RegistrationError> {
        self.inner.registry.insert(Registration::from_factory(key, factory))?;
        tracing::debug!(type_name = key.name(), "Registered factory");
        Ok(())
    }

    /// Resolve `K` by building `C` on demand
    pub fn bind<K, C>(&self) -> Result<(), RegistrationError>
    where
        K: ?Sized + Reflect,
        C: ?Sized + Reflect,
    {
        self.bind_types(TypeRef::of::<K>(), TypeRef::of::<C>())
    }

    pub fn bind_types(&self, key: TypeRef, concrete: TypeRef) -> Result<(), RegistrationError> {
        if key == concrete {
            return Err(RegistrationError::SelfBinding(key.name()));
        }
        let descriptor = concrete.descriptor();
        if !descriptor.kind().is_constructible() {
            return Err(RegistrationError::NotConstructible {
                concrete: concrete.name(),
                kind: descriptor.kind(),
            });
        }
        let upcast = descriptor
            .upcast_to(key)
            .cloned()
            .ok_or(RegistrationError::NotAssignable {
                key: key.name(),
                concrete: concrete.name(),
            })?;

        let weak = self.downgrade();
        let factory: Factory = Arc::new(move || -> Result<Object, BoxError> {
            let inner = weak.upgrade().ok_or(ResolveFailure::ContainerDropped(key.name()))?;
            let object = Container { inner }.resolve_type(concrete)?;
            let cast = upcast
                .apply(&object)
                .ok_or(ResolveFailure::TypeMismatch { expected: key.name() })?;
            Ok(cast)
        });

        self.inner.registry.insert(Registration::binding(key, concrete, factory))?;
        tracing::debug!(key = key.name(), concrete = concrete.name(), "Registered binding");
        Ok(())
    }

    pub fn unregister<T: ?Sized + Reflect>(&self) -> bool {
        self.unregister_type(TypeRef::of::<T>())
    }

    /// Remove a registration; returns whether one existed
    pub fn unregister_type(&self, key: TypeRef) -> bool {
        let removed = self.inner.registry.remove(key);
        if removed {
            tracing::debug!(type_name = key.name(), "Unregistered type");
        }
        removed
    }

    pub fn is_registered<T: ?Sized + Reflect>(&self) -> bool {
        self.inner.registry.contains(TypeRef::of::<T>())
    }

    /// Snapshot of the registered keys
    pub fn registered_types(&self) -> Vec<TypeRef> {
        self.inner.registry.keys()
    }

    pub fn registration(&self, key: TypeRef) -> Option<Registration> {
        self.inner.registry.get(key)
    }

    // ---- resolution ---------------------------------------------------------

    pub fn can_resolve<T: ?Sized + Reflect>(&self) -> bool {
        self.can_resolve_type(TypeRef::of::<T>())
    }

    /// Shallow check: registered, or constructible and public
    ///
    /// Dependencies of the type are not inspected.
    pub fn can_resolve_type(&self, type_ref: TypeRef) -> bool {
        if self.inner.registry.contains(type_ref) {
            return true;
        }
        let descriptor = type_ref.descriptor();
        descriptor.kind().is_constructible() && descriptor.is_public()
    }

    /// Resolve a fresh `T`
    pub fn resolve<T: ?Sized + Reflect>(&self) -> Result<Arc<T>, ResolutionError> {
        let type_ref = TypeRef::of::<T>();
        let object = self.resolve_type(type_ref)?;
        downcast::<T>(&object).ok_or_else(|| {
            ResolutionError::new(
                type_ref.name(),
                ResolveFailure::TypeMismatch {
                    expected: type_ref.name(),
                },
            )
        })
    }

    /// Resolve an erased object for `type_ref`
    pub fn resolve_type(&self, type_ref: TypeRef) -> Result<Object, ResolutionError> {
        let stats = &self.inner.stats;
        stats.total_resolutions.fetch_add(1, Ordering::Relaxed);

        let span = tracing::debug_span!("resolve", type_name = type_ref.name());
        let _entered = span.enter();
        let timer = OperationTimer::new("resolve", type_ref.name());

        let mut counters = GraphCounters::default();
        let result = NestingGuard::enter(type_ref, self.inner.max_nested)
            .and_then(|_guard| self.resolve_inner(type_ref, &mut counters));

        stats
            .factory_invocations
            .fetch_add(counters.factory_invocations, Ordering::Relaxed);
        stats
            .constructor_invocations
            .fetch_add(counters.constructor_invocations, Ordering::Relaxed);
        timer.finish(result.is_ok());

        result.map_err(|cause| {
            stats.failed_resolutions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(type_name = type_ref.name(), error = %cause, "Resolution failed");
            ResolutionError::new(type_ref.name(), cause)
        })
    }

    fn resolve_inner(&self, type_ref: TypeRef, counters: &mut GraphCounters) -> Result<Object, ResolveFailure> {
        let registry = &self.inner.registry;

        if let Some(registration) = registry.get(type_ref) {
            counters.factory_invocations += 1;
            return registration.invoke().map_err(|source| ResolveFailure::Factory {
                type_name: type_ref.name(),
                source,
            });
        }

        let descriptor = type_ref.descriptor();
        if !descriptor.kind().is_constructible() {
            return Err(ResolveFailure::InvalidType {
                type_name: type_ref.name(),
                kind: descriptor.kind(),
            });
        }

        if let Some(result) = fallback::empty_instance(&descriptor) {
            counters.constructor_invocations += 1;
            return result;
        }

        let constructor = selector::select_constructor(&descriptor, registry)
            .ok_or(ResolveFailure::NoConstructor(type_ref.name()))?;

        let mut builder = GraphBuilder::new(registry, self.max_instantiation_depth());
        let built = builder.build(type_ref, constructor);
        counters.factory_invocations += builder.counters().factory_invocations;
        let nodes = built?;
        tracing::trace!(type_name = type_ref.name(), nodes = nodes.len(), "Built dependency graph");

        graph::execute(nodes, counters)
    }

    /// Fill unset injectable members of `target`
    ///
    /// Returns how many members were assigned. With `suppress_exceptions` per-member
    /// failures are logged and skipped.
    pub fn resolve_members<T: ?Sized + Reflect>(
        &self,
        target: &Arc<T>,
        suppress_exceptions: bool,
    ) -> Result<usize, ResolutionError> {
        let descriptor = TypeRef::of::<T>().descriptor();
        let object = erase(target.clone());
        members::inject(self, &descriptor, &object, suppress_exceptions)
    }

    // ---- configuration ------------------------------------------------------

    pub fn max_instantiation_depth(&self) -> u32 {
        self.inner.max_depth.load(Ordering::Relaxed)
    }

    /// Change the depth bound for subsequent resolutions and notify observers
    ///
    /// Resolutions already in flight may observe either value.
    pub fn set_max_instantiation_depth(&self, depth: u32) {
        let previous = self.inner.max_depth.swap(depth, Ordering::Relaxed);
        if previous == depth {
            return;
        }
        tracing::debug!(previous, depth, "Max instantiation depth changed");

        let observers: Vec<DepthObserver> = self
            .inner
            .observers
            .read()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(previous, depth);
        }
    }

    /// Observe changes of the max instantiation depth; the callback gets `(old, new)`
    pub fn on_max_depth_changed<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(u32, u32) + Send + Sync + 'static,
    {
        let id = ObserverId(self.inner.next_observer.fetch_add(1, Ordering::Relaxed));
        self.inner.observers.write().push((id, Arc::new(observer)));
        id
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn get_stats(&self) -> ContainerStats {
        let stats = &self.inner.stats;
        ContainerStats {
            total_resolutions: stats.total_resolutions.load(Ordering::Relaxed),
            failed_resolutions: stats.failed_resolutions.load(Ordering::Relaxed),
            factory_invocations: stats.factory_invocations.load(Ordering::Relaxed),
            constructor_invocations: stats.constructor_invocations.load(Ordering::Relaxed),
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// Register an infallible transient factory
#[macro_export]
macro_rules! register_transient {
    ($container:expr, $type:ty, $factory:expr) => {
        $container.register_fn::<$type, _>($factory)
    };
}

/// Resolve a type from a container
#[macro_export]
macro_rules! resolve {
    ($container:expr, $type:ty) => {
        $container.resolve::<$type>()
    };
}
