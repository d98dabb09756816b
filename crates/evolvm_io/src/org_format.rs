//! The `.org` genome listing: one instruction name per line.
//!
//! `#` starts a comment that runs to the end of the line. Blank lines are
//! ignored. Names are resolved against an instruction set, so the same file
//! encodes to different bytes under differently ordered sets.

use crate::error::{IoError, Result};
use evolvm_core::registry::InstSet;
use evolvm_data::Genome;
use std::fmt::Write as _;
use std::path::Path;

pub fn parse_org(text: &str, inst_set: &InstSet) -> Result<Genome> {
    let mut instructions = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let name = line.split('#').next().unwrap_or_default().trim();
        if name.is_empty() {
            continue;
        }
        let inst = inst_set
            .instruction(name)
            .ok_or_else(|| IoError::UnknownInstruction {
                line: line_no + 1,
                name: name.to_string(),
            })?;
        instructions.push(inst);
    }
    if instructions.is_empty() {
        return Err(IoError::Empty("genome listing"));
    }
    Ok(Genome::new(instructions))
}

/// Renders `genome` with an optional header comment.
pub fn format_org(genome: &Genome, inst_set: &InstSet, header: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(header) = header {
        for line in header.lines() {
            let _ = writeln!(out, "# {line}");
        }
    }
    for inst in genome.iter() {
        out.push_str(inst_set.name(inst));
        out.push('\n');
    }
    out
}

pub fn read_org_file<P: AsRef<Path>>(path: P, inst_set: &InstSet) -> Result<Genome> {
    let path = path.as_ref();
    let text =
        std::fs::read_to_string(path).map_err(|e| IoError::reading(e, "genome", path))?;
    parse_org(&text, inst_set).map_err(|e| e.with_context(path.display().to_string()))
}

pub fn write_org_file<P: AsRef<Path>>(
    genome: &Genome,
    inst_set: &InstSet,
    header: Option<&str>,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, format_org(genome, inst_set, header)).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing genome {}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), len = genome.len(), "Wrote genome listing");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolvm_core::ancestor::{ancestor_genome, ANCESTOR};

    #[test]
    fn test_comments_and_blank_lines() {
        let set = InstSet::standard();
        let text = "# header\n\nnop-A   # trailing\n  inc\n\n";
        let genome = parse_org(text, &set).expect("parse");
        assert_eq!(genome.len(), 2);
        assert_eq!(set.name(genome.instructions[1]), "inc");
    }

    #[test]
    fn test_unknown_name_reports_line() {
        let set = InstSet::standard();
        let err = parse_org("inc\nfrobnicate\n", &set).expect_err("unknown name");
        assert!(matches!(err, IoError::UnknownInstruction { line: 2, .. }));
    }

    #[test]
    fn test_empty_listing_is_rejected() {
        let set = InstSet::standard();
        assert!(matches!(
            parse_org("# nothing\n", &set),
            Err(IoError::Empty(_))
        ));
    }

    #[test]
    fn test_ancestor_listing() {
        let set = InstSet::standard();
        let genome = ancestor_genome(&set).expect("ancestor");
        let text = format_org(&genome, &set, Some("ancestor\n12 loci"));
        assert!(text.starts_with("# ancestor\n# 12 loci\nmov-head\n"));
        assert_eq!(text.lines().count(), ANCESTOR.len() + 2);
        assert_eq!(parse_org(&text, &set).expect("parse"), genome);
    }

    #[test]
    fn test_missing_file() {
        let set = InstSet::standard();
        let err = read_org_file("/nonexistent/evolvm.org", &set).expect_err("missing");
        assert!(matches!(err, IoError::Context { .. }));
        assert!(matches!(err.root(), IoError::NotFound(_)));
    }
}
