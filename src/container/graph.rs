//! Breadth-first dependency graph building and bottom-up execution
//!
//! The graph is a flat arena of nodes walked by index, so deep graphs never recurse on
//! the host stack. Children are always appended after their parent, which lets the
//! executor build everything in one reverse pass.

use super::registry::Registry;
use super::selector::select_constructor;
use crate::errors::{ExceededMaxDepthError, ResolveFailure};
use crate::reflect::{Arguments, ConstructorDescriptor, Object, TypeRef};

/// One pending or completed construction step
#[derive(Debug)]
pub struct Node {
    type_ref: TypeRef,
    constructor: Option<ConstructorDescriptor>,
    object: Option<Object>,
    /// Arena indices of the parameter nodes; `None` for leaves
    children: Option<Vec<usize>>,
    depth: u32,
}

impl Node {
    fn pending(type_ref: TypeRef, constructor: ConstructorDescriptor, depth: u32) -> Self {
        Self {
            type_ref,
            constructor: Some(constructor),
            object: None,
            children: None,
            depth,
        }
    }

    fn resolved(type_ref: TypeRef, object: Object, depth: u32) -> Self {
        Self {
            type_ref,
            constructor: None,
            object: Some(object),
            children: None,
            depth,
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn children(&self) -> Option<&[usize]> {
        self.children.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.object.is_some()
    }
}

/// Counters gathered while building and executing one graph
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphCounters {
    pub factory_invocations: usize,
    pub constructor_invocations: usize,
}

/// Expands a root constructor into a flat, depth-tagged node list
pub struct GraphBuilder<'a> {
    registry: &'a Registry,
    max_depth: u32,
    counters: GraphCounters,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(registry: &'a Registry, max_depth: u32) -> Self {
        Self {
            registry,
            max_depth,
            counters: GraphCounters::default(),
        }
    }

    pub fn counters(&self) -> GraphCounters {
        self.counters
    }

    pub fn build(&mut self, root: TypeRef, constructor: ConstructorDescriptor) -> Result<Vec<Node>, ResolveFailure> {
        let mut nodes = vec![Node::pending(root, constructor, 0)];
        let mut index = 0;

        while index < nodes.len() {
            let depth = nodes[index].depth;
            if depth > self.max_depth {
                return Err(ExceededMaxDepthError {
                    type_name: nodes[index].type_ref.name(),
                    depth,
                    max_depth: self.max_depth,
                }
                .into());
            }

            let expandable = match &nodes[index].constructor {
                Some(constructor) if nodes[index].object.is_none() && !constructor.is_array() => {
                    Some(constructor.clone())
                }
                _ => None,
            };

            if let Some(constructor) = expandable {
                let owner = nodes[index].type_ref;
                let mut children = Vec::with_capacity(constructor.arity());
                for &parameter in constructor.parameters() {
                    let child = self.expand_parameter(owner, parameter, depth + 1)?;
                    tracing::trace!(
                        owner = owner.name(),
                        parameter = parameter.name(),
                        depth = depth + 1,
                        resolved = child.is_resolved(),
                        "Expanded constructor parameter"
                    );
                    children.push(nodes.len());
                    nodes.push(child);
                }
                nodes[index].children = Some(children);
            }

            index += 1;
        }

        Ok(nodes)
    }

    fn expand_parameter(&mut self, owner: TypeRef, parameter: TypeRef, depth: u32) -> Result<Node, ResolveFailure> {
        if let Some(registration) = self.registry.get(parameter) {
            self.counters.factory_invocations += 1;
            let object = registration.invoke().map_err(|source| ResolveFailure::Factory {
                type_name: parameter.name(),
                source,
            })?;
            return Ok(Node::resolved(parameter, object, depth));
        }

        match select_constructor(&parameter.descriptor(), self.registry) {
            Some(constructor) => Ok(Node::pending(parameter, constructor, depth)),
            None => Err(ResolveFailure::UnsatisfiableParameter {
                owner: owner.name(),
                parameter: parameter.name(),
            }),
        }
    }
}

/// Build every pending node from the tail back to the root and return the root object
pub fn execute(mut nodes: Vec<Node>, counters: &mut GraphCounters) -> Result<Object, ResolveFailure> {
    for index in (0..nodes.len()).rev() {
        if nodes[index].object.is_some() {
            continue;
        }
        let Some(constructor) = nodes[index].constructor.clone() else {
            continue;
        };
        let type_name = nodes[index].type_ref.name();

        let arguments = if constructor.is_array() {
            Arguments::empty()
        } else {
            let children = nodes[index].children.as_deref().unwrap_or_default();
            let mut values = Vec::with_capacity(children.len());
            for &child in children {
                let node = &nodes[child];
                let value = node
                    .object
                    .clone()
                    .ok_or(ResolveFailure::NoConstructor(node.type_ref.name()))?;
                values.push(value);
            }
            Arguments::new(values)
        };

        counters.constructor_invocations += 1;
        let object = constructor
            .invoke(arguments)
            .map_err(|source| ResolveFailure::Constructor { type_name, source })?;
        nodes[index].object = Some(object);
    }

    let root = nodes.into_iter().next().ok_or(ResolveFailure::NoConstructor("<empty graph>"))?;
    let name = root.type_ref.name();
    root.object.ok_or(ResolveFailure::NoConstructor(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::registry::Registration;
    use crate::reflect::{downcast, erase, BoxError, Reflect, TypeDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Leaf;

    impl Reflect for Leaf {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::concrete::<Self>().constructor(Leaf::default).build()
        }
    }

    struct Branch {
        left: Arc<Leaf>,
        right: Arc<Leaf>,
    }

    impl Reflect for Branch {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::concrete::<Self>()
                .constructor(|left: Arc<Leaf>, right: Arc<Leaf>| Branch { left, right })
                .build()
        }
    }

    struct Root {
        branch: Arc<Branch>,
        items: Arc<Vec<Leaf>>,
    }

    impl Reflect for Root {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::concrete::<Self>()
                .constructor(|branch: Arc<Branch>, items: Arc<Vec<Leaf>>| Root { branch, items })
                .build()
        }
    }

    struct Ouroboros;

    impl Reflect for Ouroboros {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::concrete::<Self>()
                .constructor(|_: Arc<Ouroboros>| Ouroboros)
                .build()
        }
    }

    fn build(registry: &Registry, max_depth: u32, root: TypeRef) -> Result<Vec<Node>, ResolveFailure> {
        let constructor = select_constructor(&root.descriptor(), registry).unwrap();
        GraphBuilder::new(registry, max_depth).build(root, constructor)
    }

    #[test]
    fn test_breadth_first_layout() {
        let registry = Registry::new();
        let nodes = build(&registry, 25, TypeRef::of::<Root>()).unwrap();

        // Root, Branch, Vec<Leaf>, Leaf, Leaf
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0].children(), Some(&[1, 2][..]));
        assert_eq!(nodes[1].children(), Some(&[3, 4][..]));
        let depths: Vec<u32> = nodes.iter().map(Node::depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 2, 2]);
        assert_eq!(nodes[2].type_ref(), TypeRef::of::<Vec<Leaf>>());
    }

    #[test]
    fn test_execute_builds_children_first() {
        let registry = Registry::new();
        let nodes = build(&registry, 25, TypeRef::of::<Root>()).unwrap();
        let mut counters = GraphCounters::default();
        let object = execute(nodes, &mut counters).unwrap();
        let root = downcast::<Root>(&object).unwrap();

        assert!(root.items.is_empty());
        assert!(!Arc::ptr_eq(&root.branch.left, &root.branch.right));
        assert_eq!(counters.constructor_invocations, 5);
    }

    #[test]
    fn test_registered_parameter_is_invoked_during_build() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        registry
            .insert(Registration::from_factory(
                TypeRef::of::<Leaf>(),
                Arc::new(move || -> Result<Object, BoxError> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(erase(Arc::new(Leaf)))
                }),
            ))
            .unwrap();

        let mut builder = GraphBuilder::new(&registry, 25);
        let root = TypeRef::of::<Branch>();
        let nodes = builder
            .build(root, select_constructor(&root.descriptor(), &registry).unwrap())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(builder.counters().factory_invocations, 2);
        assert!(nodes[1].is_resolved());
        assert!(nodes[2].is_resolved());
        assert_eq!(nodes[1].children(), None);
    }

    #[test]
    fn test_depth_bound() {
        let registry = Registry::new();
        assert!(build(&registry, 2, TypeRef::of::<Root>()).is_ok());

        let error = build(&registry, 1, TypeRef::of::<Root>()).unwrap_err();
        match error {
            ResolveFailure::ExceededMaxDepth(inner) => {
                assert_eq!(inner.depth, 2);
                assert_eq!(inner.max_depth, 1);
            }
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[test]
    fn test_self_reference_exceeds_depth() {
        let registry = Registry::new();
        let error = build(&registry, 25, TypeRef::of::<Ouroboros>()).unwrap_err();
        assert!(matches!(error, ResolveFailure::ExceededMaxDepth(_)));
    }

    #[test]
    fn test_factory_failure_is_wrapped() {
        let registry = Registry::new();
        registry
            .insert(Registration::from_factory(
                TypeRef::of::<Leaf>(),
                Arc::new(|| -> Result<Object, BoxError> { Err("disk on fire".into()) }),
            ))
            .unwrap();

        let error = build(&registry, 25, TypeRef::of::<Branch>()).unwrap_err();
        match error {
            ResolveFailure::Factory { type_name, source } => {
                assert_eq!(type_name, TypeRef::of::<Leaf>().name());
                assert_eq!(source.to_string(), "disk on fire");
            }
            other => panic!("unexpected failure: {other}"),
        }
    }
}
