//! Edit Scripts
//!
//! Programs that emit an edit script write one operation per line:
//! `<index> -` deletes the element at one-based `index` of the first
//! sequence, `<index> + <value>` inserts `value` after that position.
//! Operations are ordered by index. Applying a script to sequence A must
//! reproduce sequence B.

use crate::error::GenError;
use crate::Sequence;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One line of an edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Delete element `index` (one-based) of the first sequence
    Delete { index: usize },
    /// Insert `value` after element `index` of the first sequence
    Insert { index: usize, value: u32 },
}

impl EditOp {
    /// Position in the first sequence the operation refers to
    pub fn index(&self) -> usize {
        match *self {
            EditOp::Delete { index } | EditOp::Insert { index, .. } => index,
        }
    }
}

fn parse_line(line: &str) -> Result<EditOp, String> {
    let mut parts = line.split_whitespace();
    let index = parts
        .next()
        .ok_or("empty operation")?
        .parse::<usize>()
        .map_err(|e| format!("bad index: {}", e))?;
    let op = match parts.next() {
        Some("-") => EditOp::Delete { index },
        Some("+") => {
            let value = parts
                .next()
                .ok_or("insert without value")?
                .parse::<u32>()
                .map_err(|e| format!("bad value: {}", e))?;
            EditOp::Insert { index, value }
        }
        Some(other) => return Err(format!("unknown operation {:?}", other)),
        None => return Err("missing operation".to_string()),
    };
    if parts.next().is_some() {
        return Err("trailing tokens".to_string());
    }
    Ok(op)
}

/// Read an edit script file. Blank lines are skipped.
pub fn read_edit_script(path: impl AsRef<Path>) -> Result<Vec<EditOp>, GenError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut ops = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let op = parse_line(&line).map_err(|message| GenError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            message,
        })?;
        ops.push(op);
    }
    Ok(ops)
}

/// Apply `ops` to `first`.
pub fn apply_edit_script(first: &[u32], ops: &[EditOp]) -> Result<Sequence, GenError> {
    let mut output = Vec::with_capacity(first.len() + ops.len());
    let mut copied = 0;

    for op in ops {
        let index = op.index();
        if index > first.len() {
            return Err(GenError::invalid(format!(
                "edit index {} beyond sequence of length {}",
                index,
                first.len()
            )));
        }
        if index < copied {
            return Err(GenError::invalid(format!(
                "edit index {} out of order after {}",
                index, copied
            )));
        }
        output.extend_from_slice(&first[copied..index]);
        copied = index;

        match *op {
            EditOp::Delete { index } => {
                if output.pop().is_none() {
                    return Err(GenError::invalid(format!(
                        "delete at {} with nothing to delete",
                        index
                    )));
                }
            }
            EditOp::Insert { value, .. } => output.push(value),
        }
    }

    output.extend_from_slice(&first[copied..]);
    Ok(output)
}
