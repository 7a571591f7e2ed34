//! Parsers for the benchmark problem file formats.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// A BPP-lib instance: bin count, capacity and item sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BppInstance {
    /// Number of bins stated by the instance.
    pub bin_count: u32,
    /// Capacity of each bin.
    pub bin_capacity: u32,
    /// Item sizes in file order.
    pub sizes: Vec<u32>,
}

/// Parses a uniform problem file: `#`-prefixed lines are comments and
/// every other non-empty line is one instance given as whitespace
/// separated item sizes.
pub fn parse_uniform(input: &str) -> Result<Vec<Vec<u32>>> {
    let mut instances = Vec::new();
    for (number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sizes: Vec<u32> = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse()
                    .with_context(|| format!("bad item size {token:?} on line {}", number + 1))
            })
            .collect::<Result<_>>()?;
        instances.push(sizes);
    }
    Ok(instances)
}

/// Loads a uniform problem file from disk.
pub fn load_uniform(path: &Path) -> Result<Vec<Vec<u32>>> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_uniform(&input)
}

fn header_value(line: Option<&str>, what: &str) -> Result<u32> {
    let line = line.with_context(|| format!("missing {what} header"))?;
    let token = line
        .split_whitespace()
        .nth(3)
        .with_context(|| format!("malformed {what} header {line:?}"))?;
    token
        .parse()
        .with_context(|| format!("bad {what} value {token:?}"))
}

/// Parses a BPP-lib instance: three ignored header lines, two header
/// lines ending in the bin count and the bin capacity, then lines of
/// index/size pairs of which only the sizes matter.
pub fn parse_bpplib(input: &str) -> Result<BppInstance> {
    let mut lines = input.lines().map(str::trim).filter(|line| !line.is_empty());
    for _ in 0..3 {
        if lines.next().is_none() {
            bail!("missing file header");
        }
    }
    let bin_count = header_value(lines.next(), "bin count")?;
    let bin_capacity = header_value(lines.next(), "bin capacity")?;

    let mut sizes = Vec::new();
    for line in lines {
        if !line.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        for (position, token) in line.split_whitespace().enumerate() {
            // Pairs of index and size; only every second value is a size.
            if position % 2 == 1 {
                let size: u32 = token
                    .parse()
                    .with_context(|| format!("bad item size {token:?}"))?;
                sizes.push(size);
            }
        }
    }

    Ok(BppInstance {
        bin_count,
        bin_capacity,
        sizes,
    })
}

/// Loads a BPP-lib instance file from disk.
pub fn load_bpplib(path: &Path) -> Result<BppInstance> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_bpplib(&input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_skips_comments_and_blank_lines() {
        let input = "# generated\n3 5 7 2\n\n# another comment\n8 8 1\n";
        let instances = parse_uniform(input).unwrap();
        assert_eq!(instances, vec![vec![3, 5, 7, 2], vec![8, 8, 1]]);
    }

    #[test]
    fn uniform_rejects_garbage() {
        assert!(parse_uniform("3 x 7").is_err());
    }

    #[test]
    fn bpplib_reads_headers_and_pairs() {
        let input = "\
BPP instance
class 1
some remark
number of bins 42
capacity of bins 100
1 30 2 70
3 55
4 45
";
        let instance = parse_bpplib(input).unwrap();
        assert_eq!(instance.bin_count, 42);
        assert_eq!(instance.bin_capacity, 100);
        assert_eq!(instance.sizes, vec![30, 70, 55, 45]);
    }

    #[test]
    fn bpplib_rejects_truncated_headers() {
        assert!(parse_bpplib("only\ntwo\n").is_err());
        assert!(parse_bpplib("a\nb\nc\nno numbers here\n").is_err());
    }
}
