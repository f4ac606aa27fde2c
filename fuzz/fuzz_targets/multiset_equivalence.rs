#![no_main]

use avl_rank::model::{run_multiset_equivalence, Op};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|ops: Vec<Op>| { run_multiset_equivalence(ops) });
