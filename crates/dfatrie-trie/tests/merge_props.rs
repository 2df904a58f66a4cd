use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;

use dfatrie_trie::{diff_tries, NodeCache, NodeId, UncompressedNode};
use dfatrie_types::{AcceptInfo, Gpr, InputRr};
use proptest::prelude::*;

type Language = BTreeMap<Vec<u8>, AcceptInfo>;

fn accept_info() -> impl Strategy<Value = AcceptInfo> {
    prop_oneof![
        Just(AcceptInfo::EMPTY),
        Just(AcceptInfo::new(InputRr::AnyNonSpecial, None)),
        Just(AcceptInfo::new(InputRr::Register(Gpr::R11), None)),
        Just(AcceptInfo::new(InputRr::Unrestricted, Some(Gpr::Rax))),
    ]
}

// A tiny alphabet keeps shared prefixes (and therefore sharing and merge recursion) common.
fn language() -> impl Strategy<Value = Language> {
    proptest::collection::btree_map(
        proptest::collection::vec(0u8..4, 0..5),
        accept_info(),
        0..16,
    )
}

/// One consistent language plus three (possibly overlapping) sublanguages of it.
fn three_sublanguages() -> impl Strategy<Value = (Language, Language, Language)> {
    language().prop_flat_map(|universe| {
        let n = universe.len();
        let masks = proptest::collection::vec(0u8..8, n);
        (Just(universe), masks).prop_map(|(universe, masks)| {
            let mut parts = (Language::new(), Language::new(), Language::new());
            for ((seq, info), mask) in universe.into_iter().zip(masks) {
                if mask & 1 != 0 {
                    parts.0.insert(seq.clone(), info);
                }
                if mask & 2 != 0 {
                    parts.1.insert(seq.clone(), info);
                }
                if mask & 4 != 0 {
                    parts.2.insert(seq, info);
                }
            }
            parts
        })
    })
}

fn build(cache: &mut NodeCache, language: &Language) -> NodeId {
    let mut root = UncompressedNode::new();
    for (seq, info) in language {
        root.insert(seq, *info).unwrap();
    }
    cache.canonicalize(&root)
}

fn as_language(cache: &NodeCache, root: NodeId) -> Language {
    cache.sequences(root).into_iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        .. ProptestConfig::default()
    })]

    #[test]
    fn canonical_trie_round_trips_every_sequence(lang in language()) {
        let mut cache = NodeCache::new();
        let root = build(&mut cache, &lang);
        for (seq, info) in &lang {
            prop_assert_eq!(cache.lookup(root, seq), Some(info));
        }
        prop_assert_eq!(as_language(&cache, root), lang.clone());
        prop_assert_eq!(cache.count_sequences(root), lang.len() as u64);
    }

    #[test]
    fn merge_is_commutative_associative_and_idempotent((a, b, c) in three_sublanguages()) {
        let mut cache = NodeCache::new();
        let (ta, tb, tc) = (build(&mut cache, &a), build(&mut cache, &b), build(&mut cache, &c));

        let ab = cache.merge(ta, tb).unwrap();
        let ba = cache.merge(tb, ta).unwrap();
        prop_assert_eq!(ab, ba);

        let ab_c = cache.merge(ab, tc).unwrap();
        let bc = cache.merge(tb, tc).unwrap();
        let a_bc = cache.merge(ta, bc).unwrap();
        let ac = cache.merge(ta, tc).unwrap();
        let b_ac = cache.merge(tb, ac).unwrap();
        prop_assert_eq!(ab_c, a_bc);
        prop_assert_eq!(ab_c, b_ac);

        prop_assert_eq!(cache.merge(ta, ta).unwrap(), ta);
        let empty = cache.empty();
        prop_assert_eq!(cache.merge(ta, empty).unwrap(), ta);

        let mut union = a.clone();
        union.extend(b.clone());
        prop_assert_eq!(as_language(&cache, ab), union);
    }

    #[test]
    fn independent_builds_canonicalize_identically(lang in language()) {
        // Insert in opposite orders into two separate caches.
        let mut first = UncompressedNode::new();
        for (seq, info) in &lang {
            first.insert(seq, *info).unwrap();
        }
        let mut second = UncompressedNode::new();
        for (seq, info) in lang.iter().rev() {
            second.insert(seq, *info).unwrap();
        }

        let mut c1 = NodeCache::new();
        let mut c2 = NodeCache::new();
        let r1 = c1.canonicalize(&first);
        let r2 = c2.canonicalize(&second);
        prop_assert_eq!(c1.export(r1), c2.export(r2));

        let mut shared = NodeCache::new();
        prop_assert_eq!(shared.canonicalize(&first), shared.canonicalize(&second));
    }

    #[test]
    fn diff_reports_exactly_the_disagreements(left in language(), right in language()) {
        let mut cache = NodeCache::new();
        let (t1, t2) = (build(&mut cache, &left), build(&mut cache, &right));

        let mut reported = BTreeSet::new();
        diff_tries(&cache, t1, t2, |seq, a, b| {
            assert_eq!(a, left.get(seq));
            assert_eq!(b, right.get(seq));
            assert!(reported.insert(seq.to_vec()), "sequence reported twice");
            Ok::<_, Infallible>(())
        })
        .unwrap();

        let expected: BTreeSet<Vec<u8>> = left
            .keys()
            .chain(right.keys())
            .filter(|seq| left.get(*seq) != right.get(*seq))
            .cloned()
            .collect();
        prop_assert_eq!(reported, expected);
    }
}
