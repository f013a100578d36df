//! Line-oriented writer for generated code.
//!
//! Handlers build their output with a [`CodeEmitter`]. Indentation is scoped: the guard
//! returned by [`CodeEmitter::indent`] writes one level deeper until it is dropped.
//!
//! ```
//! use macten::emit::CodeEmitter;
//!
//! let mut out = CodeEmitter::new();
//! out.writeln("if name == \"tree\":");
//! {
//!     let mut body = out.indent();
//!     body.writeln("TREE()");
//! }
//! out.writeln("done()");
//! assert_eq!(out.as_str(), "if name == \"tree\":\n    TREE()\ndone()\n");
//! ```

use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone)]
pub struct CodeEmitter {
    code: String,
    level: usize,
    unit: String,
    comment_prefix: String,
}

impl Default for CodeEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeEmitter {
    /// Four-space indentation and `# ` comments.
    pub fn new() -> Self {
        Self::with_style("    ", "# ")
    }

    pub fn with_style(unit: &str, comment_prefix: &str) -> Self {
        Self {
            code: String::new(),
            level: 0,
            unit: unit.to_string(),
            comment_prefix: comment_prefix.to_string(),
        }
    }

    pub fn writeln(&mut self, line: &str) {
        self.pad();
        self.code.push_str(line);
        self.code.push('\n');
    }

    pub fn comment(&mut self, message: &str) {
        self.pad();
        self.code.push_str(&self.comment_prefix);
        self.code.push_str(message);
        self.code.push('\n');
    }

    /// A boxed banner naming a part of the output, with a blank line on each side.
    pub fn section(&mut self, name: &str) {
        let marker = self.comment_prefix.trim_end().to_string();
        let rule = format!("{marker}{}{marker}", "=".repeat(name.chars().count() + 2));
        self.newline(1);
        self.writeln(&rule);
        self.comment(&format!("{name} {marker}"));
        self.writeln(&rule);
        self.newline(1);
    }

    pub fn newline(&mut self, count: usize) {
        for _ in 0..count {
            self.code.push('\n');
        }
    }

    /// Indents everything written through the guard by one more level.
    pub fn indent(&mut self) -> Indent<'_> {
        self.level += 1;
        Indent { emitter: self }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn finish(self) -> String {
        self.code
    }

    fn pad(&mut self) {
        for _ in 0..self.level {
            self.code.push_str(&self.unit);
        }
    }
}

/// Scope guard from [`CodeEmitter::indent`]; restores the level on drop.
pub struct Indent<'a> {
    emitter: &'a mut CodeEmitter,
}

impl Deref for Indent<'_> {
    type Target = CodeEmitter;

    fn deref(&self) -> &CodeEmitter {
        self.emitter
    }
}

impl DerefMut for Indent<'_> {
    fn deref_mut(&mut self) -> &mut CodeEmitter {
        self.emitter
    }
}

impl Drop for Indent<'_> {
    fn drop(&mut self) {
        self.emitter.level -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_guards_unwind_in_order() {
        let mut out = CodeEmitter::new();
        out.writeln("a");
        {
            let mut one = out.indent();
            one.writeln("b");
            {
                let mut two = one.indent();
                two.writeln("c");
                assert_eq!(two.level(), 2);
            }
            one.writeln("d");
        }
        out.writeln("e");
        assert_eq!(out.level(), 0);
        assert_eq!(out.finish(), "a\n    b\n        c\n    d\ne\n");
    }

    #[test]
    fn section_draws_a_banner() {
        let mut out = CodeEmitter::new();
        out.section("Driver");
        assert_eq!(out.as_str(), "\n#========#\n# Driver #\n#========#\n\n");
    }

    #[test]
    fn custom_style() {
        let mut out = CodeEmitter::with_style("\t", "// ");
        {
            let mut block = out.indent();
            block.comment("generated");
        }
        out.newline(2);
        assert_eq!(out.as_str(), "\t// generated\n\n\n");
    }
}
