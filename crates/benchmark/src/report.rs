//! Result dump formats for benchmark runs.

use std::io::{self, Write};

/// One line of the `.dat` result body.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageLine {
    /// Blocks attained by the stage.
    pub blocks: u32,
    /// Splits, i.e. bins minus blocks.
    pub splits: u32,
    /// Wall-clock seconds spent.
    pub duration: f64,
}

/// The `.dat` result dump for one run: a commented header followed by
/// one `blocks splits duration` line per stage in G, B3G, Stage 1,
/// Stage 2 order.
#[derive(Debug, Clone)]
pub struct DatReport {
    /// Seed of the run.
    pub seed: u32,
    /// Item count before reduction.
    pub items_before: u32,
    /// Item count after reduction.
    pub items_after: u32,
    /// Seconds spent in the reductions.
    pub reduction_seconds: f64,
    /// Bin count after reduction.
    pub bin_count: u32,
    /// Lower bound on the splits.
    pub lower_bound: u32,
    /// G+ alone.
    pub g: StageLine,
    /// B3 followed by G+.
    pub b3g: StageLine,
    /// Best initial individual.
    pub stage1: StageLine,
    /// Best individual after the generational loop.
    pub stage2: StageLine,
}

impl DatReport {
    /// Writes the report in its on-disk format.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "# Seed: {}", self.seed)?;
        writeln!(out, "# Item count before reduction: {}", self.items_before)?;
        writeln!(out, "# Item count after reduction: {}", self.items_after)?;
        writeln!(out, "# Time spent in reduction: {}", self.reduction_seconds)?;
        writeln!(out, "# Bin count: {}", self.bin_count)?;
        writeln!(out, "# Lower bound: {}", self.lower_bound)?;
        writeln!(out, "# Upper bound: {}", self.bin_count.saturating_sub(1))?;
        writeln!(out, "# ")?;
        writeln!(out, "# Format:")?;
        writeln!(out, "# blocks splits duration")?;
        writeln!(out, "# ")?;
        writeln!(out, "# Order:")?;
        writeln!(out, "# G")?;
        writeln!(out, "# B3G")?;
        writeln!(out, "# FFF Stage 1")?;
        writeln!(out, "# FFF Stage 2")?;
        for stage in [&self.g, &self.b3g, &self.stage1, &self.stage2] {
            writeln!(out, "{} {} {}", stage.blocks, stage.splits, stage.duration)?;
        }
        Ok(())
    }
}

/// Writes the `.gen` dump: the best block count per generation,
/// including generation zero.
pub fn write_gen(out: &mut impl Write, history: &[u32]) -> io::Result<()> {
    writeln!(
        out,
        "# Blocks for generations of FFF, including generation 0"
    )?;
    for count in history {
        writeln!(out, "{count}")?;
    }
    Ok(())
}
