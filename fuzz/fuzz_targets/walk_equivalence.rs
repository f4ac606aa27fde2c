#![no_main]

use avl_rank::model::WalkEquivalenceInput;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: WalkEquivalenceInput| {
    avl_rank::model::run_walk_equivalence(input.values, input.ops);
});
