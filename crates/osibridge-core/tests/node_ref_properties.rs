//! Property-based tests for node-reference encoding and registry resolution

use osibridge_core::{
    FunctionDesc, FunctionId, FunctionKind, HandlerRef, HookPhase, HookSignature, NodeId,
    NodeRef, SubscriberRegistry, SymbolTable,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Base {
    Node(u32),
    Function(u32),
}

fn encode(base: Base, phase: HookPhase) -> Option<NodeRef> {
    match base {
        Base::Node(id) => Some(NodeRef::for_node_phase(NodeId(id), phase)),
        Base::Function(id) => NodeRef::for_function_phase(FunctionId(id), phase),
    }
}

fn phase_strategy() -> impl Strategy<Value = HookPhase> {
    prop_oneof![
        Just(HookPhase::Before),
        Just(HookPhase::After),
        Just(HookPhase::BeforeDelete),
        Just(HookPhase::AfterDelete),
    ]
}

fn base_strategy() -> impl Strategy<Value = Base> {
    prop_oneof![
        any::<u32>().prop_map(Base::Node),
        any::<u32>().prop_map(Base::Function),
        (0u32..8).prop_map(Base::Node),
        (0u32..8).prop_map(Base::Function),
    ]
}

#[test]
fn representative_ids_never_collide() {
    let ids = [0u32, 1, 2, 0x7fff, 0x8000_0000, 0xdead_beef, u32::MAX];
    let mut seen = HashMap::new();

    for &id in &ids {
        for base in [Base::Node(id), Base::Function(id)] {
            for phase in HookPhase::ALL {
                let Some(node_ref) = encode(base, phase) else {
                    continue;
                };
                if let Some(previous) = seen.insert(node_ref, (base, phase)) {
                    panic!("{node_ref} produced by both {previous:?} and {:?}", (base, phase));
                }
            }
        }
    }

    // 7 ids x (4 node phases + 2 function phases)
    assert_eq!(seen.len(), ids.len() * 6);
}

proptest! {
    /// Property: distinct (base, phase) pairs never share a node ref
    #[test]
    fn encoding_is_injective(
        a in base_strategy(),
        pa in phase_strategy(),
        b in base_strategy(),
        pb in phase_strategy(),
    ) {
        if let (Some(ra), Some(rb)) = (encode(a, pa), encode(b, pb)) {
            if (a, pa) != (b, pb) {
                prop_assert_ne!(ra, rb);
            } else {
                prop_assert_eq!(ra, rb);
            }
        }
    }

    /// Property: the base id survives in the low 32 bits
    #[test]
    fn base_id_is_preserved(base in base_strategy(), phase in phase_strategy()) {
        if let Some(node_ref) = encode(base, phase) {
            let id = match base {
                Base::Node(id) | Base::Function(id) => id,
            };
            prop_assert_eq!(node_ref.raw() as u32, id);
        }
    }
}

/// Story where `Sym<i>` resolves when `i` is even
struct EvenStory;

impl SymbolTable for EvenStory {
    fn lookup(&self, name: &str, arity: u32) -> Option<FunctionDesc> {
        let index: u32 = name.strip_prefix("Sym")?.parse().ok()?;
        if index % 2 != 0 || arity != 1 {
            return None;
        }
        let desc = if index % 4 == 0 {
            FunctionDesc::new(FunctionKind::Event, FunctionId(0x1000 + index))
        } else {
            FunctionDesc::new(FunctionKind::Database, FunctionId(0x2000 + index))
                .with_node(NodeId(index))
        };
        Some(desc)
    }
}

proptest! {
    /// Property: after a story load every resolvable subscription is routed
    /// exactly once under its computed node ref
    #[test]
    fn resolvable_subscriptions_routed_exactly_once(
        subs in prop::collection::vec((0u32..16, phase_strategy()), 0..40),
        reloads in 1usize..3,
    ) {
        let mut registry = SubscriberRegistry::default();
        let story = EvenStory;

        let mut ids = Vec::new();
        for (n, (index, phase)) in subs.iter().enumerate() {
            let sig = HookSignature::new(format!("Sym{index}"), 1, *phase);
            ids.push(registry.add(sig, HandlerRef(n as u64)));
        }

        for _ in 0..reloads {
            registry.resolve_and_register_all(&story);
        }

        let mut expected_routes = 0;
        for (id, (index, phase)) in ids.iter().zip(&subs) {
            let sig = HookSignature::new(format!("Sym{index}"), 1, *phase);
            match registry.resolve(&sig, &story) {
                Ok(node_ref) => {
                    expected_routes += 1;
                    let hits = registry
                        .handlers_for(node_ref)
                        .iter()
                        .filter(|routed| *routed == id)
                        .count();
                    prop_assert_eq!(hits, 1);
                }
                Err(_) => {
                    prop_assert!(index % 2 != 0 || (index % 4 == 0 && phase.is_delete()));
                }
            }
        }
        prop_assert_eq!(registry.active_routes(), expected_routes);

        let distinct: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(distinct.len(), subs.len());
    }
}
