//! Sample solver for exercising the harness end to end
//!
//! Each case is `<delay_ms> <n> <a_1> ... <a_n>`. The solver spins for
//! `delay_ms`, answers with the sum of the values and charts the prefix
//! sums.

use std::time::{Duration, Instant};

use caseharness::{Input, Output};

fn main() {
    caseharness::run(|input: &mut Input, output: &mut Output| {
        let delay = Duration::from_millis(input.uint());
        let n = input.usize();
        let values = input.ints(n);

        let deadline = Instant::now() + delay;
        let mut spins = 0u64;
        while Instant::now() < deadline {
            spins = std::hint::black_box(spins.wrapping_add(1));
            output.periodic(format_args!("still spinning after {} iterations", spins));
        }

        let mut sum = 0;
        for (i, value) in values.iter().enumerate() {
            sum += value;
            output.add_point(i as f64, sum as f64);
        }
        output.print(sum);
    });
}
