//! Penalty model for aligned rows.
//!
//! Lower is better. An identical function costs nothing; the score shown to
//! users is `max_score - penalty` where `max_score` charges every target
//! instruction as a deletion.

use std::collections::HashMap;

use crate::arch::Arch;
use crate::diff::{DiffRow, MismatchReason, RowKind};
use crate::preprocess::Line;

pub const PENALTY_STACKDIFF: u64 = 1;
pub const PENALTY_REGALLOC: u64 = 5;
pub const PENALTY_ARGDIFF: u64 = 5;
pub const PENALTY_REORDERING: u64 = 60;
pub const PENALTY_INSERTION: u64 = 100;
pub const PENALTY_DELETION: u64 = 100;

pub fn max_score(base_rows: usize) -> u64 {
    base_rows as u64 * PENALTY_DELETION
}

/// Compare two lines with the same mnemonic operand by operand.
///
/// Returns `None` when the comparison keys are identical.
pub fn compare_operands(arch: &Arch, base: &Line, candidate: &Line) -> Option<(MismatchReason, u64)> {
    if base.key() == candidate.key() {
        return None;
    }
    let a = base.key_fields();
    let b = candidate.key_fields();
    let mut penalty = 0;
    let mut reason: Option<MismatchReason> = None;
    let mut note = |r: MismatchReason, cost: u64| {
        penalty += cost;
        reason = Some(match reason {
            Some(prev) if prev.rank() >= r.rank() => prev,
            _ => r,
        });
    };

    for i in 0..a.len().max(b.len()) {
        match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) if x == y => {}
            (Some(x), Some(y)) if arch.is_stack_ref(x) && arch.is_stack_ref(y) => {
                note(MismatchReason::Stack, PENALTY_STACKDIFF)
            }
            (Some(x), Some(y)) if arch.is_register(x) && arch.is_register(y) => {
                note(MismatchReason::Register, PENALTY_REGALLOC)
            }
            _ => note(MismatchReason::Argument, PENALTY_ARGDIFF),
        }
    }
    // Keys differ only in spacing
    Some((reason.unwrap_or(MismatchReason::Argument), penalty.max(PENALTY_STACKDIFF)))
}

/// Fill in each row's running penalty; returns the total.
///
/// `own` holds each row's operand-mismatch cost. Unmatched instructions are charged as insertions and deletions, except
/// that a deleted mnemonic also inserted elsewhere counts once as a
/// reordering.
pub fn apply_penalties(rows: &mut [DiffRow], own: &[u64]) -> u64 {
    let mut deleted: HashMap<&str, u64> = HashMap::new();
    let mut inserted: HashMap<&str, u64> = HashMap::new();
    for row in rows.iter() {
        if let Some(m) = deletion_mnemonic(row) {
            *deleted.entry(m).or_default() += 1;
        }
        if let Some(m) = insertion_mnemonic(row) {
            *inserted.entry(m).or_default() += 1;
        }
    }
    let mut del_credit: HashMap<String, u64> = HashMap::new();
    let mut ins_credit: HashMap<String, u64> = HashMap::new();
    for (m, &d) in &deleted {
        let shared = d.min(inserted.get(m).copied().unwrap_or(0));
        if shared > 0 {
            del_credit.insert(m.to_string(), shared);
            ins_credit.insert(m.to_string(), shared);
        }
    }

    let mut running = 0;
    for (row, &own) in rows.iter_mut().zip(own) {
        let del = spend(&mut del_credit, deletion_mnemonic(row), PENALTY_REORDERING, PENALTY_DELETION);
        let ins = spend(&mut ins_credit, insertion_mnemonic(row), 0, PENALTY_INSERTION);
        running += own + del + ins;
        row.penalty = running;
    }
    running
}

/// Charge `with` if a reorder credit for `m` remains, else `without`.
fn spend(credit: &mut HashMap<String, u64>, m: Option<&str>, with: u64, without: u64) -> u64 {
    let Some(m) = m else {
        return 0;
    };
    match credit.get_mut(m) {
        Some(n) if *n > 0 => {
            *n -= 1;
            with
        }
        _ => without,
    }
}

fn deletion_mnemonic(row: &DiffRow) -> Option<&str> {
    match row.kind {
        RowKind::BaseOnly
        | RowKind::Mismatch {
            reason: MismatchReason::Opcode,
        } => row.base.as_ref().map(|l| l.mnemonic.as_str()),
        _ => None,
    }
}

fn insertion_mnemonic(row: &DiffRow) -> Option<&str> {
    match row.kind {
        RowKind::CandidateOnly
        | RowKind::Mismatch {
            reason: MismatchReason::Opcode,
        } => row.candidate.as_ref().map(|l| l.mnemonic.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffLine;

    fn line(mnemonic: &str, key_args: &str) -> Line {
        Line {
            offset: 0,
            mnemonic: mnemonic.to_string(),
            args: key_args.to_string(),
            key_args: key_args.to_string(),
            source_line: None,
            branch_target: None,
        }
    }

    fn side(mnemonic: &str) -> Option<DiffLine> {
        Some(DiffLine {
            offset: 0,
            mnemonic: mnemonic.to_string(),
            text: mnemonic.to_string(),
            source_line: None,
            branch_target: None,
        })
    }

    fn row(base: Option<&str>, candidate: Option<&str>, kind: RowKind) -> DiffRow {
        DiffRow {
            base: base.and_then(side),
            candidate: candidate.and_then(side),
            kind,
            penalty: 0,
        }
    }

    #[test]
    fn test_operand_classification() {
        let mips = Arch::for_name("mips");
        let same = line("addiu", "sp,sp,-24");
        assert_eq!(compare_operands(&mips, &same, &same.clone()), None);

        let stack = compare_operands(&mips, &line("sw", "ra,20(sp)"), &line("sw", "ra,28(sp)"));
        assert_eq!(stack, Some((MismatchReason::Stack, PENALTY_STACKDIFF)));

        let regs = compare_operands(&mips, &line("addu", "v0,a0,a1"), &line("addu", "v1,a0,a2"));
        assert_eq!(regs, Some((MismatchReason::Register, 2 * PENALTY_REGALLOC)));

        let mixed = compare_operands(&mips, &line("sw", "v0,20(sp)"), &line("sw", "v1,0x10"));
        assert_eq!(mixed, Some((MismatchReason::Argument, PENALTY_REGALLOC + PENALTY_ARGDIFF)));
    }

    #[test]
    fn test_insertions_and_deletions() {
        let mut rows = vec![
            row(Some("lw"), Some("lw"), RowKind::Match),
            row(Some("addu"), None, RowKind::BaseOnly),
            row(None, Some("subu"), RowKind::CandidateOnly),
        ];
        let total = apply_penalties(&mut rows, &[0, 0, 0]);
        assert_eq!(total, PENALTY_DELETION + PENALTY_INSERTION);
        let running: Vec<u64> = rows.iter().map(|r| r.penalty).collect();
        assert_eq!(running, vec![0, 100, 200]);
    }

    #[test]
    fn test_reordering_is_cheaper() {
        let mut rows = vec![
            row(Some("lw"), None, RowKind::BaseOnly),
            row(Some("jr"), Some("jr"), RowKind::Match),
            row(None, Some("lw"), RowKind::CandidateOnly),
        ];
        assert_eq!(apply_penalties(&mut rows, &[0, 0, 0]), PENALTY_REORDERING);
        assert_eq!(rows[0].penalty, PENALTY_REORDERING);
        assert_eq!(rows[2].penalty, PENALTY_REORDERING);
    }

    #[test]
    fn test_opcode_mismatch_counts_both_sides() {
        let opcode = RowKind::Mismatch {
            reason: MismatchReason::Opcode,
        };
        let mut rows = vec![
            row(Some("addiu"), Some("ori"), opcode),
            row(Some("ori"), Some("addiu"), opcode),
        ];
        assert_eq!(apply_penalties(&mut rows, &[0, 0]), 2 * PENALTY_REORDERING);

        let mut rows = vec![row(Some("sll"), Some("mult"), opcode)];
        assert_eq!(apply_penalties(&mut rows, &[0]), PENALTY_DELETION + PENALTY_INSERTION);
    }

    #[test]
    fn test_own_penalties_accumulate() {
        let stack = RowKind::Mismatch {
            reason: MismatchReason::Stack,
        };
        let mut rows = vec![
            row(Some("sw"), Some("sw"), stack),
            row(Some("lw"), Some("lw"), stack),
        ];
        assert_eq!(apply_penalties(&mut rows, &[1, 1]), 2);
        assert_eq!(rows[1].penalty, 2);
        assert_eq!(max_score(2), 200);
    }
}
