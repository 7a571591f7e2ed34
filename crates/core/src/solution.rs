//! Solutions as contiguous item slots grouped into blocks.

use std::fmt::Write as _;
use std::ops::Range;

use crate::item::ItemCount;

/// A slot in a solution's item vector. `None` marks a slack placeholder
/// produced by the next-fit packer; `Some(i)` references entry `i` of
/// the problem's item list.
pub type Slot = Option<u32>;

/// A contiguous group of one or two bins.
///
/// A block slices the owning solution's item vector by index, so a deep
/// copy of the solution keeps every block valid without relocation. A
/// two-bin block represents two bins fused by a single cut through a
/// straddling item; it still counts once toward the block metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    begin: u32,
    end: u32,
    bin_count: u32,
    size: u32,
}

impl Block {
    /// Creates a block over `[begin, end)` of a solution's item vector.
    pub fn new(begin: usize, end: usize, bin_count: u32, size: u32) -> Self {
        Self {
            begin: begin as u32,
            end: end as u32,
            bin_count,
            size,
        }
    }

    /// Slot range inside the owning solution.
    pub fn range(&self) -> Range<usize> {
        self.begin as usize..self.end as usize
    }

    /// Number of slots covered, slack placeholders included.
    pub fn len(&self) -> u32 {
        self.end - self.begin
    }

    /// True when the block covers no slots.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Bins occupied by this block, 1 or 2.
    pub fn bin_count(&self) -> u32 {
        self.bin_count
    }

    /// Sum of the referenced item sizes.
    pub fn size(&self) -> u32 {
        self.size
    }

    fn capacity(&self, bin_capacity: u32) -> u32 {
        self.bin_count * bin_capacity
    }

    /// Unused capacity of the block.
    pub fn slack(&self, bin_capacity: u32) -> u32 {
        self.capacity(bin_capacity) - self.size
    }

    /// Ordering key: slot count plus slack plus extra bins.
    pub fn score(&self, bin_capacity: u32) -> u32 {
        self.len() + self.slack(bin_capacity) + self.bin_count - 1
    }

    /// Appends one slot of the given size (0 for a slack placeholder),
    /// promoting the block to two bins on overflow.
    pub fn put(&mut self, size: u32, bin_capacity: u32) {
        self.size += size;
        if self.size > self.capacity(bin_capacity) {
            self.bin_count += 1;
        }
        self.end += 1;
    }

    /// Checks whether this block can be copied into a child given the
    /// remaining `counts` and `slack` budget, consuming from both on
    /// success. On failure any partial decrements are rolled back and
    /// nothing is consumed. `slots` is the item vector of the solution
    /// owning this block.
    pub fn allowed(
        &self,
        slots: &[Slot],
        bin_capacity: u32,
        counts: &mut [u32],
        slack: &mut u32,
    ) -> bool {
        let block_slack = self.slack(bin_capacity);
        if block_slack > *slack {
            return false;
        }

        let range = self.range();
        for (offset, slot) in slots[range.clone()].iter().enumerate() {
            if let Some(item) = *slot {
                if counts[item as usize] > 0 {
                    counts[item as usize] -= 1;
                } else {
                    for taken in &slots[range.start..range.start + offset] {
                        if let Some(prev) = *taken {
                            counts[prev as usize] += 1;
                        }
                    }
                    return false;
                }
            }
        }

        *slack -= block_slack;
        true
    }
}

/// A packing of all items into blocks.
///
/// Holds the flat slot vector in placement order, the blocks slicing it
/// (kept sorted by ascending score), and an age counter for elite
/// turnover. The slot vector is owned exclusively; cloning a solution
/// clones it together with the blocks.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    items: Vec<Slot>,
    blocks: Vec<Block>,
    age: u32,
}

impl Solution {
    /// Creates an empty solution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when no block has been formed yet.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The slot vector.
    pub fn items(&self) -> &[Slot] {
        &self.items
    }

    /// The blocks, sorted by ascending score.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Generations since this solution was created or last mutated.
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Ages the solution by `increment` generations.
    pub fn increase_age(&mut self, increment: u32) {
        self.age += increment;
    }

    pub(crate) fn reset_age(&mut self) {
        self.age = 0;
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<Slot> {
        &mut self.items
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub(crate) fn replace_parts(&mut self, items: Vec<Slot>, blocks: Vec<Block>) {
        self.items = items;
        self.blocks = blocks;
    }

    /// Renders the solution as a list of blocks with item sizes in
    /// descending order, e.g. `(7, 3), (4, 2, 2)`.
    pub fn render(&self, items: &[ItemCount]) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let mut sizes: Vec<u32> = self.items[block.range()]
                .iter()
                .filter_map(|slot| slot.map(|item| items[item as usize].size))
                .collect();
            sizes.sort_unstable_by(|l, r| r.cmp(l));
            out.push('(');
            for (j, size) in sizes.iter().enumerate() {
                if j > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{size}");
            }
            out.push(')');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_promotes_to_two_bins() {
        let mut block = Block::new(0, 0, 1, 0);
        block.put(6, 8);
        assert_eq!(block.bin_count(), 1);
        assert_eq!(block.slack(8), 2);
        block.put(5, 8);
        assert_eq!(block.bin_count(), 2);
        assert_eq!(block.size(), 11);
        assert_eq!(block.slack(8), 5);
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn placeholder_slots_only_extend_the_range() {
        let mut block = Block::new(0, 0, 1, 0);
        block.put(0, 8);
        assert_eq!(block.len(), 1);
        assert_eq!(block.size(), 0);
        assert_eq!(block.slack(8), 8);
    }

    #[test]
    fn score_counts_slots_slack_and_extra_bins() {
        let mut block = Block::new(0, 0, 1, 0);
        block.put(6, 8);
        block.put(5, 8);
        // 2 slots + 5 slack + 1 extra bin.
        assert_eq!(block.score(8), 8);
    }

    #[test]
    fn allowed_consumes_counts_and_slack() {
        let slots = vec![Some(0), Some(0), Some(1)];
        let block = Block::new(0, 3, 1, 8);
        let mut counts = vec![2, 1];
        let mut slack = 3;
        assert!(block.allowed(&slots, 8, &mut counts, &mut slack));
        assert_eq!(counts, vec![0, 0]);
        assert_eq!(slack, 3);
    }

    #[test]
    fn allowed_rolls_back_on_missing_items() {
        let slots = vec![Some(0), Some(1)];
        let block = Block::new(0, 2, 1, 6);
        let mut counts = vec![1, 0];
        let mut slack = 10;
        assert!(!block.allowed(&slots, 8, &mut counts, &mut slack));
        assert_eq!(counts, vec![1, 0]);
        assert_eq!(slack, 10);
    }

    #[test]
    fn allowed_rejects_excess_slack() {
        let slots = vec![Some(0)];
        let block = Block::new(0, 1, 1, 3);
        let mut counts = vec![1];
        let mut slack = 4;
        assert!(!block.allowed(&slots, 8, &mut counts, &mut slack));
        assert_eq!(counts, vec![1]);
    }

    #[test]
    fn allowed_skips_placeholders() {
        let slots = vec![Some(0), None, Some(0)];
        let block = Block::new(0, 3, 1, 6);
        let mut counts = vec![2];
        let mut slack = 2;
        assert!(block.allowed(&slots, 8, &mut counts, &mut slack));
        assert_eq!(counts, vec![0]);
        assert_eq!(slack, 0);
    }

    #[test]
    fn clone_is_deep() {
        let mut solution = Solution::new();
        solution.items_mut().extend([Some(0), Some(1)]);
        solution.blocks_mut().push(Block::new(0, 2, 1, 7));
        let copy = solution.clone();
        solution.items_mut()[0] = Some(1);
        assert_eq!(copy.items()[0], Some(0));
        assert_eq!(copy.blocks(), solution.blocks());
    }
}
