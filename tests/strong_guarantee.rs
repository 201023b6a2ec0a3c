// Rollback tests: user code that panics part-way through a mutation.
//
// Keys and values here carry "fuses": thread-local countdowns that make the
// N-th comparison or clone panic. Each test sweeps N over every point at
// which the operation calls user code and checks that, after the panic, the
// stack is observably identical to before the call (contents, order,
// counts, keys, and storage sharing), and that the panic payload is the
// fuse's own.
use keyed_stack::KeyedStack;
use std::cell::Cell;
use std::cmp::Ordering;
use std::panic::{catch_unwind, AssertUnwindSafe};

thread_local! {
    static CMP_FUSE: Cell<Option<usize>> = const { Cell::new(None) };
    static CLONE_FUSE: Cell<Option<usize>> = const { Cell::new(None) };
}

const CMP_BLOWN: &str = "comparison fuse blown";
const CLONE_BLOWN: &str = "clone fuse blown";

// Counts down; panics (once) when the countdown reaches zero.
fn burn(fuse: &'static std::thread::LocalKey<Cell<Option<usize>>>, msg: &'static str) {
    fuse.with(|f| match f.get() {
        Some(0) => {
            f.set(None);
            std::panic::panic_any(msg);
        }
        Some(n) => f.set(Some(n - 1)),
        None => {}
    })
}

fn arm(fuse: &'static std::thread::LocalKey<Cell<Option<usize>>>, after: usize) {
    fuse.with(|f| f.set(Some(after)));
}

fn disarm_all() {
    CMP_FUSE.with(|f| f.set(None));
    CLONE_FUSE.with(|f| f.set(None));
}

#[derive(Debug, Eq, PartialEq)]
struct Key(u32);

impl Clone for Key {
    fn clone(&self) -> Self {
        burn(&CLONE_FUSE, CLONE_BLOWN);
        Key(self.0)
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        burn(&CMP_FUSE, CMP_BLOWN);
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Eq, PartialEq)]
struct Val(String);

impl Clone for Val {
    fn clone(&self) -> Self {
        burn(&CLONE_FUSE, CLONE_BLOWN);
        Val(self.0.clone())
    }
}

type Stack = KeyedStack<Key, Val>;

// Everything observable about a stack, taken with all fuses disarmed.
#[derive(Debug, PartialEq)]
struct Observed {
    debug: String,
    len: usize,
    keys: Vec<u32>,
    counts: Vec<usize>,
}

fn observe(s: &Stack) -> Observed {
    disarm_all();
    let keys: Vec<u32> = s.keys().map(|k| k.0).collect();
    let counts = (0..8).map(|k| s.count(&Key(k))).collect();
    Observed {
        debug: format!("{:?}", s),
        len: s.len(),
        keys,
        counts,
    }
}

fn sample() -> Stack {
    disarm_all();
    let mut s = KeyedStack::new();
    for (k, v) in [(3, "a"), (1, "b"), (3, "c"), (5, "d"), (1, "e")] {
        s.push(Key(k), Val(v.to_string()));
    }
    s
}

// Run `op` with a fuse armed at every offset until it completes without
// blowing. Each blown attempt must leave `s` unchanged.
fn sweep<F>(fuse: &'static std::thread::LocalKey<Cell<Option<usize>>>, msg: &str, make: impl Fn() -> (Stack, Vec<Stack>), op: F) -> usize
where
    F: Fn(&mut Stack),
{
    for after in 0.. {
        let (mut s, holders) = make();
        let before = observe(&s);
        let shared_before: Vec<bool> = holders.iter().map(|h| KeyedStack::ptr_eq(&s, h)).collect();

        arm(fuse, after);
        let res = catch_unwind(AssertUnwindSafe(|| op(&mut s)));
        let blown = fuse.with(|f| f.get().is_none());
        disarm_all();

        match res {
            Err(payload) => {
                assert!(blown);
                assert_eq!(payload.downcast_ref::<&str>(), Some(&msg), "payload must pass through unchanged");
                assert_eq!(observe(&s), before, "state changed after panic at offset {}", after);
                let shared_after: Vec<bool> = holders.iter().map(|h| KeyedStack::ptr_eq(&s, h)).collect();
                assert_eq!(shared_after, shared_before, "sharing changed after panic at offset {}", after);
                for h in &holders {
                    assert_eq!(observe(h), before);
                }
            }
            Ok(()) => return after,
        }
    }
    unreachable!()
}

fn alone() -> (Stack, Vec<Stack>) {
    (sample(), Vec::new())
}

fn shared() -> (Stack, Vec<Stack>) {
    let s = sample();
    let other = s.clone();
    (s, vec![other])
}

// Test: push of a new key with a panicking comparison, private storage.
#[test]
fn push_new_key_rolls_back_on_cmp_panic() {
    let attempts = sweep(&CMP_FUSE, CMP_BLOWN, alone, |s| s.push(Key(4), Val("x".into())));
    assert!(attempts > 0, "push must compare keys");
}

// Test: push of an existing key with a panicking comparison.
#[test]
fn push_existing_key_rolls_back_on_cmp_panic() {
    let attempts = sweep(&CMP_FUSE, CMP_BLOWN, alone, |s| s.push(Key(3), Val("x".into())));
    assert!(attempts > 0);
}

// Test: push on shared storage: the copy-on-write copy (clones and
// comparisons) or the push itself panics; the stack keeps sharing.
#[test]
fn push_on_shared_storage_rolls_back() {
    sweep(&CMP_FUSE, CMP_BLOWN, shared, |s| s.push(Key(0), Val("x".into())));
    let attempts = sweep(&CLONE_FUSE, CLONE_BLOWN, shared, |s| s.push(Key(0), Val("x".into())));
    // Every stored key and value is cloned once by the copy.
    assert_eq!(attempts, 10);
}

// Test: pop and pop_key on shared storage with panicking clones/comparisons.
#[test]
fn pops_on_shared_storage_roll_back() {
    sweep(&CLONE_FUSE, CLONE_BLOWN, shared, |s| {
        s.pop().unwrap();
    });
    sweep(&CMP_FUSE, CMP_BLOWN, shared, |s| {
        s.pop().unwrap();
    });
    sweep(&CMP_FUSE, CMP_BLOWN, shared, |s| {
        s.pop_key(&Key(3)).unwrap();
    });
    sweep(&CMP_FUSE, CMP_BLOWN, alone, |s| {
        s.pop_key(&Key(1)).unwrap();
    });
}

// Test: mutable access copies shared storage first; a panicking copy leaves
// the stack shareable and sharing.
#[test]
fn front_mut_on_shared_storage_rolls_back() {
    sweep(&CLONE_FUSE, CLONE_BLOWN, shared, |s| {
        s.front_mut().unwrap().1 .0.push('!');
    });
    sweep(&CMP_FUSE, CMP_BLOWN, shared, |s| {
        s.front_key_mut(&Key(5)).unwrap().0.push('!');
    });
}

// Test: eager copy of an unshareable stack panics part-way; the source is
// untouched and no clone escapes.
#[test]
fn clone_of_unshareable_stack_propagates_panic() {
    let mut s = sample();
    s.front_mut().unwrap().1 .0.push('?');
    let before = observe(&s);

    arm(&CLONE_FUSE, 3);
    let res = catch_unwind(AssertUnwindSafe(|| s.clone()));
    disarm_all();
    let payload = res.expect_err("clone must panic");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&CLONE_BLOWN));
    assert_eq!(observe(&s), before);

    let copy = s.clone();
    assert!(!KeyedStack::ptr_eq(&s, &copy));
    assert_eq!(observe(&copy), before);
}

// Test: after a rolled-back attempt, the same operation succeeds normally.
#[test]
fn stack_is_usable_after_rollback() {
    let mut s = sample();
    let other = s.clone();
    arm(&CLONE_FUSE, 0);
    let res = catch_unwind(AssertUnwindSafe(|| s.push(Key(7), Val("z".into()))));
    disarm_all();
    assert!(res.is_err());
    assert!(KeyedStack::ptr_eq(&s, &other));

    s.push(Key(7), Val("z".into()));
    assert_eq!(s.count(&Key(7)), 1);
    assert_eq!(other.count(&Key(7)), 0);
    assert_eq!(s.len(), other.len() + 1);
}
