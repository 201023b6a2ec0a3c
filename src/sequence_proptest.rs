#![cfg(test)]

// Property tests for MainSequence kept inside the crate so they do not
// require feature gates to access internal modules.

use crate::sequence::{MainSequence, Position};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Clone, Debug)]
enum Op {
    PushFront(u8, i32),
    PopFront,
    // Index into the live elements, reduced modulo their count.
    Remove(usize),
    Mutate(usize, i32),
    Iterate,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        3 => (any::<u8>(), any::<i32>()).prop_map(|(k, v)| Op::PushFront(k, v)),
        1 => Just(Op::PopFront),
        2 => any::<usize>().prop_map(Op::Remove),
        1 => (any::<usize>(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..80)
}

// Property: State-machine equivalence against a VecDeque (front = most recent).
// Invariants exercised across random operation sequences:
// - `push_front` makes the new element the front; positions stay stable.
// - `remove(pos)` returns the element the model holds at that position and
//   keeps the relative order of the others, front-to-back and back-to-front.
// - Removed positions never resolve again.
// - `len`/`is_empty` parity with the model after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_sequence_state_machine(ops in arb_ops()) {
        let mut sut: MainSequence<u8, i32> = MainSequence::new();
        let mut model: VecDeque<(Position, u8, i32)> = VecDeque::new();
        let mut stale: Vec<Position> = Vec::new();

        for op in ops {
            match op {
                Op::PushFront(k, v) => {
                    let pos = sut.push_front(Rc::new(k), v);
                    model.push_front((pos, k, v));
                    let front = sut.front().expect("just pushed");
                    prop_assert_eq!((*front.key, front.value), (k, v));
                }
                Op::PopFront => {
                    let got = sut.pop_front().map(|e| (*e.key, e.value));
                    let want = model.pop_front().map(|(p, k, v)| { stale.push(p); (k, v) });
                    prop_assert_eq!(got, want);
                }
                Op::Remove(i) => {
                    if !model.is_empty() {
                        let (pos, k, v) = model.remove(i % model.len()).expect("index in range");
                        let e = sut.remove(pos).expect("live position must resolve");
                        prop_assert_eq!((*e.key, e.value), (k, v));
                        stale.push(pos);
                    }
                }
                Op::Mutate(i, d) => {
                    if !model.is_empty() {
                        let n = model.len();
                        let entry = &mut model[i % n];
                        let e = sut.get_mut(entry.0).expect("live position must resolve");
                        e.value = e.value.wrapping_add(d);
                        entry.2 = entry.2.wrapping_add(d);
                    }
                }
                Op::Iterate => {
                    let fwd: Vec<(u8, i32)> = sut.iter().map(|e| (*e.key, e.value)).collect();
                    let want: Vec<(u8, i32)> = model.iter().map(|&(_, k, v)| (k, v)).collect();
                    prop_assert_eq!(&fwd, &want);
                    let mut back: Vec<(u8, i32)> =
                        sut.iter_oldest_first().map(|e| (*e.key, e.value)).collect();
                    back.reverse();
                    prop_assert_eq!(back, want);
                    let positions: Vec<Position> = model.iter().map(|&(p, _, _)| p).collect();
                    prop_assert_eq!(sut.positions().collect::<Vec<_>>(), positions);
                }
            }

            for &p in &stale {
                prop_assert!(sut.get(p).is_none());
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }
    }
}
