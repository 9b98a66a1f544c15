use crate::instr::{parse_line, Instruction};
use crate::Result;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Ordered, 0-indexed instruction store. Append-only while loading, immutable
/// once handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    slots: Vec<Instruction>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn fetch(&self, index: usize) -> Option<&Instruction> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[Instruction] {
        &self.slots
    }

    fn push(&mut self, instr: Instruction) {
        self.slots.push(instr);
    }
}

/// Label name to slot index of the declaring `Label` instruction.
/// Case-sensitive; at most one entry per name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First occurrence wins; on redeclaration the existing index is returned.
    fn insert_first(&mut self, name: &str, index: usize) -> std::result::Result<(), usize> {
        match self.entries.entry(name.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(index);
                Ok(())
            }
            Entry::Occupied(slot) => Err(*slot.get()),
        }
    }
}

/// Non-fatal load findings. Loading is best-effort: an unparseable line
/// becomes an `Invalid` slot and the load continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadDiagnostic {
    #[error("line {line_no}: unparseable `{raw}`")]
    Unparseable { line_no: usize, raw: String },
    #[error("label `{name}` redeclared at slot {duplicate}; keeping slot {first}")]
    DuplicateLabel {
        name: String,
        first: usize,
        duplicate: usize,
    },
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub program: Program,
    pub symbols: SymbolTable,
    pub diagnostics: Vec<LoadDiagnostic>,
}

/// Assembles logical source lines into a program and its symbol table.
///
/// Two passes: tokenize every retained line into slots, then walk the slots
/// recording each `Label`. Label references stay unresolved until execution,
/// so forward jumps need no extra pass.
pub fn load_lines<I, S>(lines: I) -> LoadReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = LoadReport::default();

    for (offset, line) in lines.into_iter().enumerate() {
        let Some(parsed) = parse_line(line.as_ref()) else {
            continue;
        };
        if parsed.malformed {
            report.diagnostics.push(LoadDiagnostic::Unparseable {
                line_no: offset + 1,
                raw: line.as_ref().trim().to_string(),
            });
        }
        for slot in parsed.slots {
            report.program.push(slot);
        }
    }

    for (index, instr) in report.program.slots().iter().enumerate() {
        if let Instruction::Label { name } = instr {
            if let Err(first) = report.symbols.insert_first(name, index) {
                report.diagnostics.push(LoadDiagnostic::DuplicateLabel {
                    name: name.clone(),
                    first,
                    duplicate: index,
                });
            }
        }
    }

    report
}

/// Reads a script file and assembles it.
pub fn load_script(path: &Path) -> Result<LoadReport> {
    let text = std::fs::read_to_string(path)?;
    Ok(load_lines(text.lines()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_table_keeps_first_occurrence() {
        let mut table = SymbolTable::default();
        assert_eq!(table.insert_first("loop", 0), Ok(()));
        assert_eq!(table.insert_first("loop", 3), Err(0));
        assert_eq!(table.resolve("loop"), Some(0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut table = SymbolTable::default();
        table.insert_first("Loop", 2).unwrap();
        assert_eq!(table.resolve("Loop"), Some(2));
        assert_eq!(table.resolve("loop"), None);
    }
}
