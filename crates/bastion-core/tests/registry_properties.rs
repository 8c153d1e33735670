//! Property tests for adapter resolution over the kind hierarchy.

use std::collections::BTreeSet;

use bastion_core::{kinds, ErrorAdapter, ErrorRegistry, FailureKind, UNKNOWN_ERROR_CODE};
use proptest::prelude::*;

static ALL: [&FailureKind; 14] = [
    &kinds::ERROR,
    &kinds::LOGIC,
    &kinds::SYSTEM,
    &kinds::INVALID_REQUEST,
    &kinds::NOT_FOUND,
    &kinds::AUTHENTICATION,
    &kinds::INVALID_CREDENTIAL,
    &kinds::AUTHENTICATION_REQUIRED,
    &kinds::AUTHORIZATION_DENIED,
    &kinds::INTERNAL,
    &kinds::INTERNAL_CONFIGURATION,
    &kinds::NO_PRINCIPAL,
    &kinds::EXTERNAL,
    &kinds::EXTERNAL_TIMEOUT,
];

fn code_for(index: usize) -> u32 {
    1_000 + u32::try_from(index).unwrap()
}

fn register(registry: &ErrorRegistry, registered: &BTreeSet<usize>) {
    for &index in registered {
        registry.register(
            ErrorAdapter::new(format!("adapter-{index}"), code_for(index), "custom"),
            &[ALL[index]],
        );
    }
}

fn expected(kind: &'static FailureKind, registered: &BTreeSet<usize>) -> u32 {
    std::iter::once(kind)
        .chain(kind.ancestors())
        .find_map(|ancestor| {
            registered
                .iter()
                .find(|&&index| ALL[index].name() == ancestor.name())
                .map(|&index| code_for(index))
        })
        .unwrap_or(UNKNOWN_ERROR_CODE)
}

fn subset() -> impl Strategy<Value = BTreeSet<usize>> {
    prop::collection::btree_set(0..ALL.len(), 0..ALL.len())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

    #[test]
    fn nearest_registered_ancestor_wins(registered in subset()) {
        let registry = ErrorRegistry::new();
        register(&registry, &registered);

        for kind in ALL {
            prop_assert_eq!(registry.classify(kind).code(), expected(kind, &registered));
        }
    }

    #[test]
    fn later_registration_invalidates_resolved_kinds(
        first in subset(),
        second in subset(),
    ) {
        let registry = ErrorRegistry::new();
        register(&registry, &first);
        for kind in ALL {
            let _ = registry.classify(kind);
        }

        register(&registry, &second);
        let both: BTreeSet<usize> = first.union(&second).copied().collect();
        for kind in ALL {
            prop_assert_eq!(registry.classify(kind).code(), expected(kind, &both));
        }
    }

    #[test]
    fn explicit_registration_beats_defaults(index in 0..ALL.len()) {
        let registry = ErrorRegistry::with_defaults();
        registry.register(ErrorAdapter::new("explicit", 4_242, "explicit"), &[ALL[index]]);

        prop_assert_eq!(registry.classify(ALL[index]).code(), 4_242);
    }
}

#[test]
fn defaults_do_not_replace_explicit_entries() {
    let registry = ErrorRegistry::new();
    registry.register(
        ErrorAdapter::new("explicit", 4_001, "explicit"),
        &[&kinds::NOT_FOUND],
    );
    registry.register_default(
        ErrorAdapter::new("default", 110, "default"),
        &[&kinds::NOT_FOUND],
    );

    assert_eq!(registry.classify(&kinds::NOT_FOUND).code(), 4_001);
}
