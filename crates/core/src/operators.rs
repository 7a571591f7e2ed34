//! Genetic operators: grouping crossover and adaptive mutation.

use crate::env::{binomial_one_in, bounded, unit_exclusive, Environment};
use crate::problem::{Problem, Workspace};
use crate::solution::{Block, Solution};

/// Copies one parent block into the child, appending its slots verbatim.
/// The caller has already consumed the block from the availability
/// ledger via [`Block::allowed`].
fn copy_block(
    child: &mut Solution,
    parent: &Solution,
    block: &Block,
    item_count: &mut u32,
    bin_budget: &mut u32,
) {
    let start = child.items().len();
    let slots = &parent.items()[block.range()];
    let placed = slots.iter().filter(|slot| slot.is_some()).count() as u32;
    child.items_mut().extend_from_slice(slots);
    child.blocks_mut().push(Block::new(
        start,
        start + slots.len(),
        block.bin_count(),
        block.size(),
    ));
    *item_count -= placed;
    *bin_budget -= block.bin_count();
}

/// Runs B3 on the remaining items, preferring the precomputed pool while
/// the solution is still nearly empty and a freshly restricted pool
/// otherwise. Returns the bins used.
fn b3_phase(
    problem: &Problem,
    env: &mut Environment,
    workspace: &mut Workspace,
    slack: &mut u32,
    item_count: &mut u32,
    solution: &mut Solution,
) -> u32 {
    let placed = problem.item_count() - *item_count;
    if placed < 7 {
        problem.find_packing(
            env,
            &mut workspace.counts,
            &mut workspace.initial_pool,
            slack,
            item_count,
            solution,
        )
    } else {
        problem.b3(
            env,
            &mut workspace.counts,
            &mut workspace.scratch,
            slack,
            item_count,
            solution,
        )
    }
}

/// Gene-level grouping crossover of two parents.
///
/// Blocks are inherited from both parents in ascending score order,
/// each copy guarded by [`Block::allowed`] against the availability
/// ledger. Items no parent block could contribute are repacked with B3
/// and G+. The ledger is restored before returning.
pub fn gene_level_crossover(
    problem: &Problem,
    env: &mut Environment,
    workspace: &mut Workspace,
    left: &Solution,
    right: &Solution,
) -> Solution {
    debug_assert!(workspace.is_pristine(problem));

    let capacity = problem.bin_capacity();
    let mut child = Solution::new();
    let mut item_count = problem.item_count();
    let mut slack = problem.slack();
    let mut bin_budget = problem.bin_count();

    child.items_mut().reserve(item_count as usize);
    child
        .blocks_mut()
        .reserve(((item_count + slack) / 3) as usize);

    let ll = left.blocks();
    let rr = right.blocks();
    let mut aa = 0;
    let mut bb = 0;

    // The longer parent donates its leading blocks outright; with the
    // full ledger available they are always feasible.
    if ll.len() > rr.len() {
        for block in &ll[..ll.len() - rr.len()] {
            let ok = block.allowed(left.items(), capacity, &mut workspace.counts, &mut slack);
            debug_assert!(ok);
            if ok {
                copy_block(&mut child, left, block, &mut item_count, &mut bin_budget);
            }
        }
        aa = ll.len() - rr.len();
    } else if rr.len() > ll.len() {
        for block in &rr[..rr.len() - ll.len()] {
            let ok = block.allowed(right.items(), capacity, &mut workspace.counts, &mut slack);
            debug_assert!(ok);
            if ok {
                copy_block(&mut child, right, block, &mut item_count, &mut bin_budget);
            }
        }
        bb = rr.len() - ll.len();
    }

    while aa < ll.len() {
        if ll[aa].score(capacity) <= rr[bb].score(capacity) {
            if ll[aa].allowed(left.items(), capacity, &mut workspace.counts, &mut slack) {
                copy_block(&mut child, left, &ll[aa], &mut item_count, &mut bin_budget);
            }
            aa += 1;
            if rr[bb].allowed(right.items(), capacity, &mut workspace.counts, &mut slack) {
                copy_block(&mut child, right, &rr[bb], &mut item_count, &mut bin_budget);
            }
            bb += 1;
        } else {
            if rr[bb].allowed(right.items(), capacity, &mut workspace.counts, &mut slack) {
                copy_block(&mut child, right, &rr[bb], &mut item_count, &mut bin_budget);
            }
            bb += 1;
            if ll[aa].allowed(left.items(), capacity, &mut workspace.counts, &mut slack) {
                copy_block(&mut child, left, &ll[aa], &mut item_count, &mut bin_budget);
            }
            aa += 1;
        }
    }

    if item_count > 0 {
        bin_budget -= b3_phase(
            problem,
            env,
            workspace,
            &mut slack,
            &mut item_count,
            &mut child,
        );
    }
    problem.flatten_remaining(
        env,
        &workspace.counts,
        &mut slack,
        item_count,
        bin_budget,
        &mut child,
    );

    child.blocks_mut().sort_by_key(|block| block.score(capacity));
    workspace.restore(problem);
    child
}

/// Mutates `mutant` in place with aggressiveness `k`.
///
/// Tears down an adaptively sized set of blocks, always including the
/// trailing empty run, and repacks the freed items with B3 and G+. The
/// availability ledger is rebuilt from the torn blocks only and
/// restored before returning.
pub fn adaptive_mutation(
    problem: &Problem,
    env: &mut Environment,
    workspace: &mut Workspace,
    mutant: &mut Solution,
    k: f64,
) {
    debug_assert!(workspace.is_pristine(problem));

    let capacity = problem.bin_capacity();
    let m = mutant.len();
    let max_blocks = (problem.bin_count() - problem.lower_bound()) as usize;
    if max_blocks == m {
        return;
    }
    debug_assert!(max_blocks > m);

    // The tail of the block list must always be rebuilt: trailing empty
    // blocks, plus the last loaded block when it occupies a single bin.
    let mut min_blocks = mutant
        .blocks()
        .iter()
        .rev()
        .take_while(|block| block.size() == 0 && block.bin_count() == 1)
        .count();
    if min_blocks < m && mutant.blocks()[m - min_blocks - 1].bin_count() == 1 {
        min_blocks += 1;
    }

    let f = 0.1;
    let p = (0.5 - m as f64 / (2.0 * max_blocks as f64)).powf(1.0 / k);
    let a = (1.0 - f) / f * p;
    let b = (1.0 - f) / f * (1.0 - p);
    let u = unit_exclusive(env.rng());
    let q = (1.0 - u).powf(1.0 / b);
    let p_e = (1.0 - q).powf(1.0 / a);
    let n_b = ((m as f64 * p_e).ceil() as usize).max(min_blocks).min(m);

    // Sample the extra victims from the prefix, swapping them toward the
    // tear-down suffix.
    {
        let blocks = mutant.blocks_mut();
        let prefix = m - min_blocks;
        for j in 0..n_b - min_blocks {
            let remaining = prefix - j;
            let chosen = bounded(env.rng(), remaining as u32) as usize;
            blocks.swap(chosen, remaining - 1);
        }
    }

    // Rebuild the ledger from the torn blocks alone.
    for count in workspace.counts.iter_mut() {
        *count = 0;
    }
    let torn_from = m - n_b;
    let mut slack = 0u32;
    let mut item_count = 0u32;
    let mut bin_budget = 0u32;
    for block in &mutant.blocks()[torn_from..] {
        for slot in &mutant.items()[block.range()] {
            if let Some(item) = *slot {
                workspace.counts[item as usize] += 1;
                item_count += 1;
            }
        }
        slack += block.slack(capacity);
        bin_budget += block.bin_count();
    }

    // Compact the surviving blocks over a fresh slot vector.
    let mut new_items = Vec::with_capacity(mutant.items().len());
    let mut new_blocks = Vec::with_capacity(mutant.blocks().len());
    for block in &mutant.blocks()[..torn_from] {
        let start = new_items.len();
        new_items.extend_from_slice(&mutant.items()[block.range()]);
        new_blocks.push(Block::new(
            start,
            new_items.len(),
            block.bin_count(),
            block.size(),
        ));
    }
    mutant.replace_parts(new_items, new_blocks);

    let before = mutant.len();
    bin_budget -= b3_phase(
        problem,
        env,
        workspace,
        &mut slack,
        &mut item_count,
        mutant,
    );

    // Demote a binomial share of the freshly packed blocks back into the
    // pool to keep the repack from being too greedy.
    let emitted = (mutant.len() - before) as u32;
    if emitted > 0 {
        let demoted = binomial_one_in(env.rng(), emitted, 8);
        for _ in 0..demoted {
            if let Some(block) = mutant.blocks_mut().pop() {
                for slot in &mutant.items()[block.range()] {
                    if let Some(item) = *slot {
                        workspace.counts[item as usize] += 1;
                        item_count += 1;
                    }
                }
                slack += block.slack(capacity);
                bin_budget += block.bin_count();
                mutant.items_mut().truncate(block.range().start);
            }
        }
    }

    problem.flatten_remaining(
        env,
        &workspace.counts,
        &mut slack,
        item_count,
        bin_budget,
        mutant,
    );

    mutant.blocks_mut().sort_by_key(|block| block.score(capacity));
    mutant.reset_age();
    workspace.restore(problem);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;

    fn setup() -> (Problem, Environment, Workspace) {
        let sizes = [7, 7, 6, 5, 5, 4, 4, 3, 3, 3, 2, 2, 2, 1, 1];
        let problem = Problem::new(&sizes, 9, None).unwrap();
        let env = Environment::with_seed(2024);
        let ws = Workspace::new(&problem);
        (problem, env, ws)
    }

    fn check(problem: &Problem, solution: &Solution) {
        let bins: u32 = solution.blocks().iter().map(|b| b.bin_count()).sum();
        assert_eq!(bins, problem.bin_count());
        let mut counts = vec![0u32; problem.items().len()];
        for slot in solution.items().iter().flatten() {
            counts[*slot as usize] += 1;
        }
        for (count, entry) in counts.iter().zip(problem.items()) {
            assert_eq!(*count, entry.count);
        }
        let capacity = problem.bin_capacity();
        for pair in solution.blocks().windows(2) {
            assert!(pair[0].score(capacity) <= pair[1].score(capacity));
        }
        for block in solution.blocks() {
            let size: u32 = solution.items()[block.range()]
                .iter()
                .filter_map(|slot| slot.map(|i| problem.items()[i as usize].size))
                .sum();
            assert_eq!(size, block.size());
            assert!(block.slack(capacity) <= block.bin_count() * capacity);
        }
    }

    #[test]
    fn crossover_produces_a_consistent_child() {
        let (problem, mut env, mut ws) = setup();
        let left = problem.generate_individual(&mut env, &mut ws, true);
        let right = problem.generate_individual(&mut env, &mut ws, true);
        let child = gene_level_crossover(&problem, &mut env, &mut ws, &left, &right);
        assert!(ws.is_pristine(&problem));
        check(&problem, &child);
    }

    #[test]
    fn crossover_handles_uneven_parents() {
        let (problem, mut env, mut ws) = setup();
        let mut left = problem.generate_individual(&mut env, &mut ws, true);
        let mut right = problem.generate_individual(&mut env, &mut ws, false);
        for _ in 0..20 {
            if left.len() != right.len() {
                break;
            }
            left = problem.generate_individual(&mut env, &mut ws, true);
            right = problem.generate_individual(&mut env, &mut ws, false);
        }
        let child = gene_level_crossover(&problem, &mut env, &mut ws, &left, &right);
        check(&problem, &child);
    }

    #[test]
    fn mutation_keeps_the_packing_consistent() {
        let (problem, mut env, mut ws) = setup();
        let mut mutant = problem.generate_individual(&mut env, &mut ws, true);
        mutant.increase_age(5);
        for _ in 0..10 {
            adaptive_mutation(&problem, &mut env, &mut ws, &mut mutant, 1.3);
            assert!(ws.is_pristine(&problem));
            check(&problem, &mutant);
        }
    }

    #[test]
    fn mutation_resets_age_when_it_fires() {
        let (problem, mut env, mut ws) = setup();
        let mut mutant = problem.generate_individual(&mut env, &mut ws, true);
        let max_blocks = (problem.bin_count() - problem.lower_bound()) as usize;
        mutant.increase_age(3);
        adaptive_mutation(&problem, &mut env, &mut ws, &mut mutant, 4.0);
        if mutant.len() != max_blocks {
            assert_eq!(mutant.age(), 0);
        }
    }
}
