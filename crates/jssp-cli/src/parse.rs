//! Plain-text job-shop instance format.
//!
//! First line: `n_jobs n_machines`. Each following non-empty line describes
//! one job as alternating `machine duration` pairs:
//!
//! ```text
//! 3 3
//! 0 2  1 1  0 1
//! 1 1  0 1  2 2
//! 2 1  2 1  1 1
//! ```

use anyhow::{bail, Context, Result};
use jssp_core::{Instance, MachineId, Time};

pub fn parse_instance(input: &str) -> Result<Instance> {
    let mut lines = input.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next().context("missing header line")?;
    let header: Vec<usize> = header
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .context("header must be `n_jobs n_machines`")?;
    let [n_jobs, n_machines] = header[..] else {
        bail!("header must be `n_jobs n_machines`, got {header:?}");
    };

    let mut jobs: Vec<Vec<(MachineId, Time)>> = Vec::with_capacity(n_jobs);
    for (row, line) in lines.enumerate() {
        let fields: Vec<i64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .with_context(|| format!("job line {} is not a list of integers", row + 1))?;
        if fields.len() % 2 != 0 {
            bail!(
                "job line {} has {} fields, expected machine/duration pairs",
                row + 1,
                fields.len()
            );
        }

        let mut ops = Vec::with_capacity(fields.len() / 2);
        for pair in fields.chunks_exact(2) {
            let (machine, duration) = (pair[0], pair[1]);
            if machine < 0 || machine as usize >= n_machines {
                bail!(
                    "job line {} references machine {machine}, instance has {n_machines}",
                    row + 1
                );
            }
            ops.push((machine as MachineId, duration));
        }
        jobs.push(ops);
    }

    if jobs.len() != n_jobs {
        bail!("header promises {n_jobs} jobs, file has {}", jobs.len());
    }

    Instance::build(jobs).context("invalid instance")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SMALL: &str = "3 3\n0 2 1 1 0 1\n1 1 0 1 2 2\n2 1 2 1 1 1\n";

    #[test]
    fn parses_the_reference_instance() {
        let instance = parse_instance(SMALL).unwrap();
        assert_eq!(instance.num_jobs(), 3);
        assert_eq!(instance.num_machines(), 3);
        assert_eq!(instance.operation(0, 0).duration, 2);
        assert_eq!(instance.operation(2, 1).machine, 2);
    }

    #[test]
    fn skips_blank_lines() {
        let input = "2 1\n\n0 1\n\n0 2\n";
        let instance = parse_instance(input).unwrap();
        assert_eq!(instance.num_jobs(), 2);
    }

    #[test]
    fn rejects_odd_field_count() {
        let err = parse_instance("1 1\n0 1 0\n").unwrap_err();
        assert!(err.to_string().contains("machine/duration pairs"));
    }

    #[test]
    fn rejects_out_of_range_machine() {
        let err = parse_instance("1 2\n5 1\n").unwrap_err();
        assert!(err.to_string().contains("references machine 5"));
    }

    #[test]
    fn rejects_job_count_mismatch() {
        let err = parse_instance("3 1\n0 1\n").unwrap_err();
        assert!(err.to_string().contains("promises 3 jobs"));
    }

    #[test]
    fn rejects_zero_duration_via_core() {
        let err = parse_instance("1 1\n0 0\n").unwrap_err();
        assert!(err.to_string().contains("invalid instance"));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(parse_instance("").is_err());
    }
}
