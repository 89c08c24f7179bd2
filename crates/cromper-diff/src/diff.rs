use std::sync::Arc;

use cromper_core::catalog::Platform;
use serde::Serialize;

use crate::align::{self, EditOp};
use crate::arch::Arch;
use crate::config::{Algorithm, DiffConfig};
use crate::error::DiffError;
use crate::objdump::{Disassembler, DisassemblyCache, ObjdumpRequest, ObjdumpRunner};
use crate::preprocess::{self, Line};
use crate::score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    Opcode,
    Argument,
    Register,
    Stack,
}

impl MismatchReason {
    /// Which reason wins when several operands differ.
    pub(crate) fn rank(self) -> u8 {
        match self {
            MismatchReason::Opcode => 3,
            MismatchReason::Argument => 2,
            MismatchReason::Register => 1,
            MismatchReason::Stack => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowKind {
    Match,
    Mismatch { reason: MismatchReason },
    BaseOnly,
    CandidateOnly,
}

/// One side of a diff row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub offset: u64,
    pub mnemonic: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_target: Option<u64>,
}

impl From<&Line> for DiffLine {
    fn from(line: &Line) -> Self {
        Self {
            offset: line.offset,
            mnemonic: line.mnemonic.clone(),
            text: line.text(),
            source_line: line.source_line,
            branch_target: line.branch_target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRow {
    pub base: Option<DiffLine>,
    pub candidate: Option<DiffLine>,
    #[serde(flatten)]
    pub kind: RowKind,
    /// Penalty accumulated up to and including this row
    pub penalty: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub arch: String,
    pub rows: Vec<DiffRow>,
    pub current_score: u64,
    pub max_score: u64,
    pub penalty: u64,
    /// Why the candidate side is empty, if it is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_error: Option<String>,
}

impl DiffResult {
    pub fn mismatches(&self) -> usize {
        self.rows.iter().filter(|r| r.kind != RowKind::Match).count()
    }
}

/// Instructions per side. Alignment holds a `(base + 1) * (candidate + 1)`
/// table, so this bounds a single diff to about 64 MiB.
pub const MAX_ROWS: usize = 4096;

/// Disassembles two objects and scores how far the candidate is from the
/// target.
pub struct DiffWrapper {
    disassembler: Disassembler,
}

impl DiffWrapper {
    pub fn new(runner: Arc<dyn ObjdumpRunner>) -> Self {
        Self::with_cache(runner, DisassemblyCache::default())
    }

    pub fn with_cache(runner: Arc<dyn ObjdumpRunner>, cache: DisassemblyCache) -> Self {
        Self {
            disassembler: Disassembler::new(runner, cache),
        }
    }

    pub fn cache(&self) -> &DisassemblyCache {
        self.disassembler.cache()
    }

    /// Diff `compiled` against `target`.
    ///
    /// The target must disassemble; a candidate that is empty or fails to
    /// disassemble yields an all-deletion diff with `candidate_error` set.
    pub fn diff(
        &self,
        target: &[u8],
        compiled: &[u8],
        platform: &Platform,
        label: Option<&str>,
        flags: &[String],
    ) -> Result<DiffResult, DiffError> {
        if target.is_empty() {
            return Err(DiffError::EmptyTarget);
        }
        let arch = Arch::for_name(platform.arch);
        let config = DiffConfig::from_flags(flags);
        let label = label.filter(|l| !l.is_empty());
        let arch_flags = arch.arch_flags();

        let base_text = self
            .disassembler
            .run_objdump(&ObjdumpRequest {
                data: target,
                platform,
                arch_flags: &arch_flags,
                label,
                flags: &config.objdump_flags,
            })
            .map_err(DiffError::Target)?;

        let (candidate_text, candidate_error) = if compiled.is_empty() {
            (None, Some("No compiled object".to_string()))
        } else {
            let req = ObjdumpRequest {
                data: compiled,
                platform,
                arch_flags: &arch_flags,
                label,
                flags: &config.objdump_flags,
            };
            match self.disassembler.run_objdump(&req) {
                Ok(text) => (Some(text), None),
                Err(e) => {
                    tracing::warn!("Error dumping compiled object for {}: {}", platform.id, e);
                    (None, Some(e.to_string()))
                }
            }
        };

        let base = preprocess::parse(&base_text, arch, &config, label);
        let candidate = candidate_text
            .map(|text| preprocess::parse(&text, arch, &config, label))
            .unwrap_or_default();
        check_rows("target", base.len())?;
        check_rows("candidate", candidate.len())?;

        let mut result = build_result(arch, &config, &base, &candidate);
        result.candidate_error = candidate_error;
        Ok(result)
    }
}

fn check_rows(side: &'static str, rows: usize) -> Result<(), DiffError> {
    if rows > MAX_ROWS {
        return Err(DiffError::TooLarge {
            side,
            rows,
            limit: MAX_ROWS,
        });
    }
    Ok(())
}

fn build_result(arch: &Arch, config: &DiffConfig, base: &[Line], candidate: &[Line]) -> DiffResult {
    let a: Vec<&str> = base.iter().map(|l| l.mnemonic.as_str()).collect();
    let b: Vec<&str> = candidate.iter().map(|l| l.mnemonic.as_str()).collect();
    let ops = match config.algorithm {
        Algorithm::Levenshtein => align::levenshtein(&a, &b),
        Algorithm::Difflib => align::lcs_diff(&a, &b),
    };

    let mut rows = Vec::with_capacity(ops.len());
    let mut own = Vec::with_capacity(ops.len());
    for op in ops {
        let (x, y) = match op {
            EditOp::Equal(i, j) | EditOp::Replace(i, j) => (Some(&base[i]), Some(&candidate[j])),
            EditOp::Delete(i) => (Some(&base[i]), None),
            EditOp::Insert(j) => (None, Some(&candidate[j])),
        };
        let (kind, cost) = match (x, y) {
            (Some(x), Some(y)) if x.mnemonic == y.mnemonic => match score::compare_operands(arch, x, y) {
                None => (RowKind::Match, 0),
                Some((reason, cost)) => (RowKind::Mismatch { reason }, cost),
            },
            (Some(_), Some(_)) => (
                RowKind::Mismatch {
                    reason: MismatchReason::Opcode,
                },
                0,
            ),
            (Some(_), None) => (RowKind::BaseOnly, 0),
            (None, _) => (RowKind::CandidateOnly, 0),
        };
        rows.push(DiffRow {
            base: x.map(DiffLine::from),
            candidate: y.map(DiffLine::from),
            kind,
            penalty: 0,
        });
        own.push(cost);
    }

    let penalty = score::apply_penalties(&mut rows, &own);
    let max_score = score::max_score(base.len());
    DiffResult {
        arch: arch.name().to_string(),
        rows,
        current_score: max_score.saturating_sub(penalty),
        max_score,
        penalty,
        candidate_error: None,
    }
}
