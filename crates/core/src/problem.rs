//! Problem construction, reductions and the two packers.

use crate::bound::l3star;
use crate::env::{bounded, shuffle, Environment};
use crate::error::{Error, Result};
use crate::item::{frequency_count, ItemCount};
use crate::partition::{threesum, Partition};
use crate::solution::{Block, Solution};

/// A reduced bin-packing instance, immutable after construction.
///
/// Construction applies the E1 and E2 reductions, computes the L3*
/// lower bound and precomputes the 3-partition pool for one and two bin
/// capacities. Item availability during packing lives in a separate
/// [`Workspace`] so the problem itself is never mutated.
#[derive(Debug, PartialEq)]
pub struct Problem {
    bin_count: u32,
    bin_capacity: u32,
    item_count: u32,
    original_bin_count: u32,
    original_item_count: u32,
    original_slack: u32,
    unique_size_count: u32,
    slack: u32,
    lower_bound: u32,
    optimal1: u32,
    optimal21: u32,
    optimal22: Vec<(u32, u32, u32)>,
    items: Vec<ItemCount>,
    initial_partitions: Vec<Partition>,
    solved: bool,
}

/// Mutable scratch state loaned to the packers.
///
/// `counts` mirrors the problem's item counts and acts as the transient
/// availability ledger; every packer call restores it to the pristine
/// counts before returning. The partition pool is a reusable permutation
/// of the problem's initial pool, since the B3 packer tombstones
/// infeasible entries by swapping them to the tail.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(crate) counts: Vec<u32>,
    pub(crate) initial_pool: Vec<Partition>,
    pub(crate) scratch: Vec<Partition>,
}

impl Workspace {
    /// Creates scratch state for the given problem.
    pub fn new(problem: &Problem) -> Self {
        Self {
            counts: problem.items.iter().map(|e| e.count).collect(),
            initial_pool: problem.initial_partitions.clone(),
            scratch: Vec::new(),
        }
    }

    /// True when the availability ledger matches the problem's counts.
    pub fn is_pristine(&self, problem: &Problem) -> bool {
        self.counts
            .iter()
            .zip(problem.items.iter())
            .all(|(&count, entry)| count == entry.count)
    }

    pub(crate) fn restore(&mut self, problem: &Problem) {
        for (count, entry) in self.counts.iter_mut().zip(problem.items.iter()) {
            *count = entry.count;
        }
    }
}

impl Problem {
    /// Builds a problem from raw item sizes.
    ///
    /// The default bin count is `ceil(sum / capacity)`; a caller-supplied
    /// `bin_count` must not be below it. Fails with
    /// [`Error::InvalidCapacity`] when `bin_capacity` is zero and with
    /// [`Error::InvalidBinCount`] when the supplied count is too small.
    pub fn new(sizes: &[u32], bin_capacity: u32, bin_count: Option<u32>) -> Result<Self> {
        if bin_capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        debug_assert!(
            sizes.iter().all(|&s| s >= 1 && s <= bin_capacity),
            "item sizes must lie in [1, bin_capacity]"
        );

        let sum: u64 = sizes.iter().map(|&s| u64::from(s)).sum();
        let original_item_count = sizes.len() as u32;
        let required = if sum == 0 {
            0
        } else {
            (1 + (sum - 1) / u64::from(bin_capacity)) as u32
        };

        let mut m = required;
        if let Some(supplied) = bin_count {
            if supplied < required {
                return Err(Error::InvalidBinCount { supplied, required });
            }
            m = supplied;
        }

        let mut solved = m >= original_item_count || m < 2;
        let original_bin_count = m;
        let mut slack =
            (u64::from(m) * u64::from(bin_capacity) - sum) as u32;
        let original_slack = slack;

        // E1: items filling a bin exactly. E2 first phase: items one
        // short of a bin, each absorbing one slack unit.
        let mut optimal1 = 0u32;
        let mut optimal21 = 0u32;
        let mut remaining: Vec<u32> = Vec::with_capacity(sizes.len());
        for &size in sizes {
            if size == bin_capacity {
                optimal1 += 1;
            } else if size + 1 == bin_capacity && slack > 0 {
                optimal21 += 1;
                slack -= 1;
            } else {
                remaining.push(size);
            }
        }
        m -= optimal1 + optimal21;
        let mut item_count = original_item_count - optimal1 - optimal21;

        remaining.sort_unstable_by(|l, r| r.cmp(l));
        let mut items = frequency_count(&remaining);

        // E2 second phase: complementary pairs summing to the capacity.
        let mut optimal22: Vec<(u32, u32, u32)> = Vec::new();
        if !items.is_empty() {
            let mut l = 0;
            let mut r = items.len() - 1;
            while l < r {
                let together = items[l].size + items[r].size;
                if together == bin_capacity {
                    let pairs = items[l].count.min(items[r].count);
                    items[l].count -= pairs;
                    items[r].count -= pairs;
                    optimal22.push((pairs, items[l].size, items[r].size));
                    m -= pairs;
                    item_count -= 2 * pairs;
                    l += 1;
                    r -= 1;
                } else if together < bin_capacity {
                    r -= 1;
                } else {
                    l += 1;
                }
            }
            if l == r && 2 * items[l].size == bin_capacity {
                let pairs = items[l].count / 2;
                optimal22.push((pairs, items[l].size, items[l].size));
                m -= pairs;
                item_count -= items[l].count - items[l].count % 2;
                items[l].count %= 2;
            }
        }

        if m >= item_count || m < 2 {
            solved = true;
        }

        items.retain(|entry| entry.count > 0);

        let lower_bound = l3star(&items, slack, m, bin_capacity);
        let unique_size_count = items.len() as u32;

        // Synthetic 1-entry so partitions can spend slack units.
        if slack > 0 && items.last().is_some_and(|entry| entry.size != 1) {
            items.push(ItemCount::new(1, 0));
        }

        let subset: Vec<u32> = (0..items.len() as u32).collect();
        let mut initial_partitions = Vec::new();
        threesum(&items, &subset, 1, bin_capacity, &mut initial_partitions);
        threesum(&items, &subset, 2, bin_capacity, &mut initial_partitions);

        tracing::debug!(
            "reduced {} items to {} ({} sizes), bins {} -> {}, slack {}, lower bound {}",
            original_item_count,
            item_count,
            unique_size_count,
            original_bin_count,
            m,
            slack,
            lower_bound
        );

        Ok(Self {
            bin_count: m,
            bin_capacity,
            item_count,
            original_bin_count,
            original_item_count,
            original_slack,
            unique_size_count,
            slack,
            lower_bound,
            optimal1,
            optimal21,
            optimal22,
            items,
            initial_partitions,
            solved,
        })
    }

    /// Bin count after reductions.
    pub fn bin_count(&self) -> u32 {
        self.bin_count
    }

    /// Capacity of every bin.
    pub fn bin_capacity(&self) -> u32 {
        self.bin_capacity
    }

    /// Item count after reductions.
    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    /// Distinct sizes after reductions, the synthetic 1-entry excluded.
    pub fn unique_size_count(&self) -> u32 {
        self.unique_size_count
    }

    /// Bin count before reductions.
    pub fn original_bin_count(&self) -> u32 {
        self.original_bin_count
    }

    /// Item count before reductions.
    pub fn original_item_count(&self) -> u32 {
        self.original_item_count
    }

    /// Slack before reductions.
    pub fn original_slack(&self) -> u32 {
        self.original_slack
    }

    /// Residual capacity over all remaining bins.
    pub fn slack(&self) -> u32 {
        self.slack
    }

    /// Minimum number of unavoidable cuts.
    pub fn lower_bound(&self) -> u32 {
        self.lower_bound
    }

    /// Items removed by E1 (size equal to the capacity).
    pub fn optimal1(&self) -> u32 {
        self.optimal1
    }

    /// Items removed by E2 using one slack unit each.
    pub fn optimal21(&self) -> u32 {
        self.optimal21
    }

    /// Complementary pairs removed by E2 as `(pairs, size1, size2)`.
    pub fn optimal22(&self) -> &[(u32, u32, u32)] {
        &self.optimal22
    }

    /// Reduced items, descending by size, plus the synthetic 1-entry.
    pub fn items(&self) -> &[ItemCount] {
        &self.items
    }

    /// Precomputed partitions for one and two bin capacities.
    pub fn initial_partitions(&self) -> &[Partition] {
        &self.initial_partitions
    }

    /// True when the reductions alone settle the instance.
    pub fn solved(&self) -> bool {
        self.solved
    }

    /// Blocks of a solution plus the bins peeled off by the reductions,
    /// each of which forms one optimal block.
    pub fn full_block_count(&self, solution: &Solution) -> u32 {
        solution.len() as u32
            + self.optimal1
            + self.optimal21
            + self.optimal22.iter().map(|&(pairs, _, _)| pairs).sum::<u32>()
    }

    /// Index of the synthetic 1-entry, or a sentinel no partition member
    /// can match when the item list does not end in a 1.
    fn one_index(&self) -> usize {
        match self.items.last() {
            Some(entry) if entry.size == 1 => self.items.len() - 1,
            _ => usize::MAX,
        }
    }

    /// Tries to consume one partition from the availability ledger,
    /// spending slack units for missing synthetic 1-items. On success the
    /// consumed slots are appended to the solution and their number is
    /// returned; on failure every partial decrement is rolled back and 0
    /// is returned.
    fn consume_partition(
        &self,
        partition: &Partition,
        counts: &mut [u32],
        slack: &mut u32,
        one: usize,
        solution: &mut Solution,
    ) -> u32 {
        let [a, b, c] = partition.items.map(|i| i as usize);

        if counts[a] == 0 {
            return 0;
        }
        counts[a] -= 1;
        let mut taken = 1u32;
        let mut used_slack = false;

        if counts[b] > 0 {
            counts[b] -= 1;
            taken += 1;
        } else if b == one && *slack > 0 {
            *slack -= 1;
            used_slack = true;
        } else {
            counts[a] += 1;
            return 0;
        }

        if counts[c] > 0 {
            counts[c] -= 1;
            taken += 1;
        } else if c == one && *slack > 0 {
            *slack -= 1;
        } else {
            if used_slack {
                *slack += 1;
            } else {
                counts[b] += 1;
            }
            counts[a] += 1;
            return 0;
        }

        for &index in &partition.items[..taken as usize] {
            solution.items_mut().push(Some(index));
        }
        taken
    }

    /// The core of algorithm B3. Draws partitions uniformly from the
    /// pool, emitting a block per feasible draw and tombstoning
    /// infeasible entries by swapping them behind a shrinking logical
    /// end. `slack` and `item_count` are adjusted in place. Returns the
    /// number of bins used by the emitted blocks.
    pub(crate) fn find_packing(
        &self,
        env: &mut Environment,
        counts: &mut [u32],
        pool: &mut [Partition],
        slack: &mut u32,
        item_count: &mut u32,
        solution: &mut Solution,
    ) -> u32 {
        let one = self.one_index();
        let mut live = pool.len();
        let mut bins_used = 0;

        while live > 0 {
            let chosen = bounded(env.rng(), live as u32) as usize;
            let taken = self.consume_partition(&pool[chosen], counts, slack, one, solution);
            if taken > 0 {
                *item_count -= taken;
                let size: u32 = pool[chosen].items[..taken as usize]
                    .iter()
                    .map(|&i| self.items[i as usize].size)
                    .sum();
                let bin_count = if size > self.bin_capacity { 2 } else { 1 };
                bins_used += bin_count;
                let end = solution.items().len();
                solution
                    .blocks_mut()
                    .push(Block::new(end - taken as usize, end, bin_count, size));
            } else {
                pool.swap(chosen, live - 1);
                live -= 1;
            }
        }

        bins_used
    }

    /// B3 over a freshly enumerated pool restricted to sizes that are
    /// still available (the synthetic 1-entry is kept while slack
    /// remains). Returns the number of bins used.
    pub(crate) fn b3(
        &self,
        env: &mut Environment,
        counts: &mut [u32],
        scratch: &mut Vec<Partition>,
        slack: &mut u32,
        item_count: &mut u32,
        solution: &mut Solution,
    ) -> u32 {
        if self.items.is_empty() {
            return 0;
        }

        let one = self.one_index();
        let subset: Vec<u32> = (0..self.items.len())
            .filter(|&i| counts[i] > 0 || (i == one && *slack > 0))
            .map(|i| i as u32)
            .collect();

        scratch.clear();
        threesum(&self.items, &subset, 1, self.bin_capacity, scratch);
        threesum(&self.items, &subset, 2, self.bin_capacity, scratch);

        self.find_packing(env, counts, scratch, slack, item_count, solution)
    }

    /// The core of algorithm G+. Walks the shuffled slot range starting
    /// at `start`, closing the running block whenever the next item
    /// overflows it and the spent slack can be afforded. Residual slack
    /// is emitted as trailing empty blocks.
    fn next_fit_fragmentation(&self, solution: &mut Solution, start: usize, mut slack: u32) {
        let capacity = self.bin_capacity;
        if start == solution.items().len() {
            return;
        }

        let mut current = Block::new(start, start, 1, 0);
        let mut has_slack = false;

        for position in start..solution.items().len() {
            let slot = solution.items()[position];
            match slot {
                Some(item) => {
                    let size = self.items[item as usize].size;
                    let block_slack = current.slack(capacity);
                    let budget = if has_slack { slack } else { 0 };
                    if size > block_slack && budget >= block_slack {
                        has_slack = false;
                        slack -= block_slack;
                        solution.blocks_mut().push(current);
                        current = Block::new(position, position, 1, 0);
                    }
                    current.put(size, capacity);
                }
                None => {
                    has_slack = true;
                    current.put(0, capacity);
                }
            }
        }

        slack -= current.slack(capacity);
        solution.blocks_mut().push(current);

        if slack > 0 {
            debug_assert_eq!(slack % capacity, 0);
            let end = solution.items().len();
            for _ in 0..slack / capacity {
                solution.blocks_mut().push(Block::new(end, end, 1, 0));
            }
        }
    }

    /// Shuffles the slot range starting at `start` and packs it with G+.
    /// All slack is spent: it ends up inside the emitted blocks.
    pub(crate) fn g(
        &self,
        env: &mut Environment,
        solution: &mut Solution,
        start: usize,
        slack: &mut u32,
    ) {
        if start == solution.items().len() {
            return;
        }
        shuffle(env.rng(), &mut solution.items_mut()[start..]);
        let budget = *slack;
        *slack = 0;
        self.next_fit_fragmentation(solution, start, budget);
    }

    /// Appends the still-available items (read from `counts`) and
    /// `bin_budget - 1` slack placeholders, then packs them with G+.
    /// When nothing is left to place, the remaining budget is emitted as
    /// empty blocks so every bin stays accounted for.
    pub(crate) fn flatten_remaining(
        &self,
        env: &mut Environment,
        counts: &[u32],
        slack: &mut u32,
        item_count: u32,
        bin_budget: u32,
        solution: &mut Solution,
    ) {
        if item_count > 0 {
            debug_assert!(bin_budget >= 1);
            let start = solution.items().len();
            for (index, &count) in counts.iter().enumerate() {
                for _ in 0..count {
                    solution.items_mut().push(Some(index as u32));
                }
            }
            for _ in 0..bin_budget - 1 {
                solution.items_mut().push(None);
            }
            self.g(env, solution, start, slack);
        } else if bin_budget > 0 {
            debug_assert_eq!(*slack, bin_budget * self.bin_capacity);
            let end = solution.items().len();
            for _ in 0..bin_budget {
                solution.blocks_mut().push(Block::new(end, end, 1, 0));
            }
            *slack = 0;
        }
    }

    /// Produces an initial solution, with B3 G+ when `use_b3` is set and
    /// plain G+ otherwise.
    pub fn generate_individual(
        &self,
        env: &mut Environment,
        workspace: &mut Workspace,
        use_b3: bool,
    ) -> Solution {
        debug_assert!(workspace.is_pristine(self));

        let mut solution = Solution::new();
        let mut item_count = self.item_count;
        let mut bin_budget = self.bin_count;
        let mut slack = self.slack;

        solution
            .items_mut()
            .reserve((item_count + bin_budget).saturating_sub(1) as usize);
        solution
            .blocks_mut()
            .reserve((self.bin_count - self.lower_bound) as usize);

        if use_b3 {
            let used = self.find_packing(
                env,
                &mut workspace.counts,
                &mut workspace.initial_pool,
                &mut slack,
                &mut item_count,
                &mut solution,
            );
            bin_budget -= used;
        }

        self.flatten_remaining(
            env,
            &workspace.counts,
            &mut slack,
            item_count,
            bin_budget,
            &mut solution,
        );

        let capacity = self.bin_capacity;
        solution.blocks_mut().sort_by_key(|block| block.score(capacity));

        workspace.restore(self);
        solution
    }

    /// Packing for instances the reductions already settled: one block
    /// per item plus empty blocks for the leftover bins, or a plain G+
    /// run when there are fewer bins than items.
    pub fn trivial_solution(&self, env: &mut Environment, workspace: &mut Workspace) -> Solution {
        if self.bin_count >= self.item_count {
            let mut solution = Solution::new();
            solution.items_mut().reserve(self.item_count as usize);
            solution.blocks_mut().reserve(self.bin_count as usize);
            for (index, entry) in self.items.iter().enumerate() {
                for _ in 0..entry.count {
                    let at = solution.items().len();
                    solution.items_mut().push(Some(index as u32));
                    let mut block = Block::new(at, at, 1, 0);
                    block.put(entry.size, self.bin_capacity);
                    solution.blocks_mut().push(block);
                }
            }
            let end = solution.items().len();
            for _ in 0..self.bin_count - self.item_count {
                solution.blocks_mut().push(Block::new(end, end, 1, 0));
            }
            solution
        } else {
            self.generate_individual(env, workspace, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(Problem::new(&[], 0, None), Err(Error::InvalidCapacity));
    }

    #[test]
    fn undersized_bin_count_is_rejected() {
        let err = Problem::new(&[5, 5, 5], 8, Some(1)).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidBinCount {
                supplied: 1,
                required: 2
            }
        );
    }

    #[test]
    fn e1_removes_full_bins() {
        let problem = Problem::new(&[8, 8, 3, 3, 2], 8, None).unwrap();
        assert_eq!(problem.optimal1(), 2);
        assert_eq!(problem.original_bin_count(), 3);
        assert_eq!(problem.bin_count(), 1);
        assert_eq!(problem.item_count(), 3);
        assert!(problem.solved());
    }

    #[test]
    fn e21_spends_slack_on_near_full_items() {
        // Sum 25 over capacity 9 gives two slack units for the two 8s.
        let problem = Problem::new(&[8, 8, 5, 4], 9, None).unwrap();
        assert_eq!(problem.optimal21(), 2);
        assert_eq!(problem.slack(), 0);
        // The remaining (5, 4) pair is complementary, so everything
        // reduces away.
        assert_eq!(problem.bin_count(), 0);
        assert!(problem.solved());
    }

    #[test]
    fn e22_removes_complementary_pairs() {
        let problem = Problem::new(&[6, 6, 2, 2, 5, 3], 8, None).unwrap();
        // (6,2) twice and (5,3) once; everything reduces away.
        let pairs: u32 = problem.optimal22().iter().map(|&(n, _, _)| n).sum();
        assert_eq!(pairs, 3);
        assert_eq!(problem.item_count(), 0);
        assert_eq!(problem.bin_count(), 0);
        assert!(problem.solved());
    }

    #[test]
    fn e22_halves_a_middle_run() {
        let problem = Problem::new(&[4, 4, 4], 8, None).unwrap();
        assert_eq!(problem.optimal22(), &[(1, 4, 4)]);
        assert_eq!(problem.item_count(), 1);
        assert_eq!(problem.bin_count(), 1);
    }

    #[test]
    fn sentinel_one_entry_appears_with_slack() {
        let problem = Problem::new(&[5, 4, 3], 8, Some(3)).unwrap();
        assert!(problem.slack() > 0);
        let last = problem.items().last().unwrap();
        assert_eq!((last.size, last.count), (1, 0));
        // Only the lone 4 survives the reductions; the sentinel is not
        // counted as a unique size.
        assert_eq!(problem.unique_size_count(), 1);
    }

    #[test]
    fn no_sentinel_without_slack() {
        let problem = Problem::new(&[3, 3, 2], 8, None).unwrap();
        assert_eq!(problem.slack(), 0);
        assert_ne!(problem.items().last().unwrap().size, 1);
    }

    #[test]
    fn partitions_cover_both_targets() {
        let problem = Problem::new(&[5, 4, 3, 3, 2, 2, 1], 8, Some(4)).unwrap();
        let capacity = problem.bin_capacity();
        for partition in problem.initial_partitions() {
            let total: u32 = partition
                .items
                .iter()
                .map(|&i| problem.items()[i as usize].size)
                .sum();
            assert!(total == capacity || total == 2 * capacity);
        }
    }

    #[test]
    fn generate_individual_accounts_for_every_bin() {
        let mut env = Environment::with_seed(42);
        let problem = Problem::new(&[7, 6, 5, 5, 4, 3, 3, 2, 2, 1], 9, None).unwrap();
        let mut ws = Workspace::new(&problem);
        for use_b3 in [false, true] {
            let solution = problem.generate_individual(&mut env, &mut ws, use_b3);
            assert!(ws.is_pristine(&problem));
            let bins: u32 = solution.blocks().iter().map(|b| b.bin_count()).sum();
            assert_eq!(bins, problem.bin_count());
            let placed: u32 = solution
                .items()
                .iter()
                .filter(|slot| slot.is_some())
                .count() as u32;
            assert_eq!(placed, problem.item_count());
        }
    }

    #[test]
    fn trivial_solution_gives_every_item_a_bin() {
        let mut env = Environment::with_seed(1);
        let problem = Problem::new(&[3, 2], 8, Some(3)).unwrap();
        assert!(problem.solved());
        let mut ws = Workspace::new(&problem);
        let solution = problem.trivial_solution(&mut env, &mut ws);
        assert_eq!(solution.len(), 3);
        assert!(solution.blocks().iter().all(|b| b.bin_count() == 1));
    }
}
