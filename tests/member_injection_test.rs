//! Member injection tests

use autowire::container::Factory;
use autowire::reflect::erase;
use autowire::{BoxError, Container, Object, Reflect, ResolveFailure, Slot, TypeDescriptor, TypeRef};
use std::sync::Arc;

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

impl Reflect for dyn Clock {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::interface::<Self>()
    }
}

struct FixedClock(u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
struct Metrics;

impl Reflect for Metrics {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>().constructor(Metrics::default).build()
    }
}

/// Concrete and public, but its only constructor needs a value parameter
struct Socket;

impl Reflect for Socket {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>().constructor(|_: Arc<u16>| Socket).build()
    }
}

#[derive(Default)]
struct Dashboard {
    metrics: Slot<Metrics>,
    clock: Slot<dyn Clock>,
    title: Slot<String>,
}

impl Reflect for Dashboard {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>()
            .constructor(Dashboard::default)
            .member::<Metrics>("metrics", |this| &this.metrics)
            .member::<dyn Clock>("clock", |this| &this.clock)
            .member::<String>("title", |this| &this.title)
            .build()
    }
}

#[derive(Default)]
struct Uplink {
    metrics: Slot<Metrics>,
    socket: Slot<Socket>,
}

impl Reflect for Uplink {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>()
            .constructor(Uplink::default)
            .member::<Socket>("socket", |this| &this.socket)
            .member::<Metrics>("metrics", |this| &this.metrics)
            .build()
    }
}

#[test]
fn test_fills_only_resolvable_members() {
    let container = Container::new();
    let dashboard = container.resolve::<Dashboard>().unwrap();

    let assigned = container.resolve_members(&dashboard, false).unwrap();
    assert_eq!(assigned, 1);
    assert!(dashboard.metrics.is_set());
    assert!(!dashboard.clock.is_set());
    assert!(!dashboard.title.is_set());
}

#[test]
fn test_registered_member_types_are_filled() {
    let container = Container::new();
    container
        .register::<dyn Clock, _>(|| Ok(Arc::new(FixedClock(42))))
        .unwrap();
    container.register_fn(|| "Ops".to_string()).unwrap();

    let dashboard = Arc::new(Dashboard::default());
    assert_eq!(container.resolve_members(&dashboard, false).unwrap(), 3);
    assert_eq!(dashboard.clock.get().unwrap().now(), 42);
    assert_eq!(dashboard.title.get().unwrap().as_str(), "Ops");
}

#[test]
fn test_set_members_are_left_alone() {
    let container = Container::new();
    container.register_fn(|| "Fresh".to_string()).unwrap();

    let dashboard = Arc::new(Dashboard {
        title: Slot::with(Arc::new("Preset".to_string())),
        ..Dashboard::default()
    });
    container.resolve_members(&dashboard, false).unwrap();
    assert_eq!(dashboard.title.get().unwrap().as_str(), "Preset");
}

#[test]
fn test_member_failure_propagates_or_is_suppressed() {
    let container = Container::new();

    let uplink = Arc::new(Uplink::default());
    let error = container.resolve_members(&uplink, false).unwrap_err();
    assert!(matches!(error.failure(), ResolveFailure::NoConstructor(_)));
    assert!(!uplink.metrics.is_set());

    let assigned = container.resolve_members(&uplink, true).unwrap();
    assert_eq!(assigned, 1);
    assert!(uplink.metrics.is_set());
    assert!(!uplink.socket.is_set());
}

#[test]
fn test_assignment_failure_keeps_its_reason() {
    let container = Container::new();
    // Erased factories are not type checked, so the slot rejects the value
    let factory: Factory = Arc::new(|| -> Result<Object, BoxError> { Ok(erase(Arc::new(7u8))) });
    container.register_type(TypeRef::of::<String>(), factory).unwrap();

    let dashboard = Arc::new(Dashboard::default());
    let error = container.resolve_members(&dashboard, false).unwrap_err();
    match error.failure() {
        ResolveFailure::MemberAssignment { member, source, .. } => {
            assert_eq!(*member, "title");
            assert!(source.to_string().contains("title"));
        }
        other => panic!("unexpected failure: {other}"),
    }
    assert!(error.root_cause().to_string().contains("is not a"));
    assert!(dashboard.metrics.is_set());
    assert!(!dashboard.title.is_set());
}
