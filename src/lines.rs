//! Executable lines of a parsed chunk
//!
//! A line tracer needs to know which source lines can stop execution: the
//! first line of every statement, and the lines holding `if`/`elseif` and
//! `until` conditions, which are evaluated on their own.

use rustc_hash::FxHashSet;

use crate::parser::ast::AstNode;

/// Maps 1-based byte positions to 1-based line numbers
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// 0-based offset of the first byte of each line
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, byte)| byte == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self { starts }
    }

    /// Line containing the 1-based position `pos`.
    pub fn line(&self, pos: usize) -> usize {
        let offset = pos.saturating_sub(1);
        self.starts.partition_point(|&start| start <= offset)
    }
}

/// Set of executable line numbers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutableLines {
    lines: FxHashSet<usize>,
}

impl ExecutableLines {
    pub fn contains(&self, line: usize) -> bool {
        self.lines.contains(&line)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line numbers in ascending order.
    pub fn sorted(&self) -> Vec<usize> {
        let mut lines: Vec<usize> = self.lines.iter().copied().collect();
        lines.sort_unstable();
        lines
    }
}

/// Collect the executable lines of `chunk`, which was parsed from `source`.
///
/// Labels are not executable.
pub fn executable_lines(chunk: &AstNode, source: &str) -> ExecutableLines {
    let index = LineIndex::new(source);
    let mut lines = FxHashSet::default();

    chunk.walk(&mut |node| match node {
        AstNode::Block { stats, .. } => {
            let statements = stats
                .iter()
                .filter(|stat| !matches!(stat, AstNode::Label { .. }));
            lines.extend(statements.map(|stat| index.line(stat.span().pos)));
        }
        AstNode::If { branches, .. } => {
            lines.extend(
                branches
                    .iter()
                    .map(|(condition, _)| index.line(condition.span().pos)),
            );
        }
        AstNode::Repeat { condition, .. } => {
            lines.insert(index.line(condition.span().pos));
        }
        _ => {}
    });

    ExecutableLines { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lines_of(source: &str) -> Vec<usize> {
        let chunk = parse(source, None).unwrap();
        executable_lines(&chunk, source).sorted()
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line(1), 1);
        assert_eq!(index.line(2), 1);
        assert_eq!(index.line(3), 2);
        assert_eq!(index.line(5), 2);
        assert_eq!(index.line(6), 3);
        assert_eq!(index.line(7), 4);
    }

    #[test]
    fn test_statement_lines() {
        let source = "\
local x = 1

if x then
  print(x)
elseif
  x > 2
then
  x = 3
end";
        assert_eq!(lines_of(source), vec![1, 3, 4, 6, 8]);
    }

    #[test]
    fn test_repeat_condition_and_labels() {
        let source = "\
::top::
repeat
  x = x + 1
until
  x > 10
return x";
        assert_eq!(lines_of(source), vec![2, 3, 5, 6]);
    }

    #[test]
    fn test_nested_function_bodies() {
        let source = "local t = {\n  f = function()\n    return 1\n  end,\n}\n";
        let chunk = parse(source, None).unwrap();
        let lines = executable_lines(&chunk, source);

        assert_eq!(lines.len(), 2);
        assert!(lines.contains(1));
        assert!(lines.contains(3));
        assert!(!lines.contains(2));
    }
}
