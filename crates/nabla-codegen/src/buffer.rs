//! Indentation-aware source accumulation.
//!
//! The buffer tracks a running nesting depth driven by braces in the emitted
//! text: a line whose pending content starts with `}` is indented one level
//! less, so closing braces align with their opening construct. Braces are
//! recognized naively, without parsing string or comment literals, so
//! emitted code must keep literal braces out of the text it routes through
//! the buffer.

use crate::error::{CodegenError, Result};

/// An append-only text buffer with brace-driven indentation.
#[derive(Debug)]
pub struct SourceBuffer {
    text: String,
    depth: usize,
    newline: bool,
    indent: usize,
}

impl SourceBuffer {
    /// Create an empty buffer with `indent` spaces per nesting level.
    pub fn new(indent: usize) -> Self {
        Self {
            text: String::new(),
            depth: 0,
            newline: true,
            indent,
        }
    }

    /// Append text, splitting on line breaks and indenting each new line.
    pub fn emit(&mut self, s: &str) -> Result<()> {
        let mut rest = s;
        while let Some(pos) = rest.find('\n') {
            self.fragment(&rest[..pos])?;
            self.text.push('\n');
            self.newline = true;
            rest = &rest[pos + 1..];
        }
        self.fragment(rest)
    }

    fn fragment(&mut self, s: &str) -> Result<()> {
        if s.is_empty() {
            return Ok(());
        }
        if self.newline {
            let shift = usize::from(s.starts_with('}'));
            let level =
                self.depth
                    .checked_sub(shift)
                    .ok_or_else(|| CodegenError::UnbalancedIndentation {
                        context: "closing brace below depth zero".to_string(),
                    })?;
            self.text.push_str(&" ".repeat(self.indent * level));
            self.newline = false;
        }
        self.text.push_str(s);
        for c in s.chars() {
            match c {
                '{' => self.depth += 1,
                '}' => {
                    self.depth = self.depth.checked_sub(1).ok_or_else(|| {
                        CodegenError::UnbalancedIndentation {
                            context: "closing brace below depth zero".to_string(),
                        }
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Move all buffered text into `section`, leaving the buffer empty.
    pub fn flush_into(&mut self, section: &mut String) {
        section.push_str(&self.text);
        self.text.clear();
    }

    /// Check that all emitted braces are balanced.
    pub fn finalize(&self) -> Result<()> {
        if self.depth != 0 {
            return Err(CodegenError::UnbalancedIndentation {
                context: format!("depth {} at finalization", self.depth),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(buf: &mut SourceBuffer) -> String {
        let mut out = String::new();
        buf.flush_into(&mut out);
        out
    }

    #[test]
    fn indents_nested_blocks() {
        let mut buf = SourceBuffer::new(2);
        buf.emit("int f(void) {\nint i;\nif (i) {\nreturn 1;\n}\nreturn 0;\n}\n")
            .unwrap();
        buf.finalize().unwrap();
        assert_eq!(
            collect(&mut buf),
            "int f(void) {\n  int i;\n  if (i) {\n    return 1;\n  }\n  return 0;\n}\n"
        );
    }

    #[test]
    fn closing_brace_aligns_with_opening() {
        let mut buf = SourceBuffer::new(4);
        buf.emit("while (1) {\nbreak;\n}\n").unwrap();
        assert_eq!(collect(&mut buf), "while (1) {\n    break;\n}\n");
    }

    #[test]
    fn fragments_accumulate_on_one_line() {
        let mut buf = SourceBuffer::new(2);
        buf.emit("a = ").unwrap();
        buf.emit("b + c;").unwrap();
        buf.emit("\n").unwrap();
        assert_eq!(collect(&mut buf), "a = b + c;\n");
    }

    #[test]
    fn unbalanced_close_is_fatal() {
        let mut buf = SourceBuffer::new(2);
        let err = buf.emit("}\n").unwrap_err();
        assert!(matches!(err, CodegenError::UnbalancedIndentation { .. }));
    }

    #[test]
    fn finalize_requires_depth_zero() {
        let mut buf = SourceBuffer::new(2);
        buf.emit("f() {\n").unwrap();
        assert!(buf.finalize().is_err());
        buf.emit("}\n").unwrap();
        assert!(buf.finalize().is_ok());
    }

    #[test]
    fn flush_clears_buffer() {
        let mut buf = SourceBuffer::new(2);
        buf.emit("x;\n").unwrap();
        let mut out = String::new();
        buf.flush_into(&mut out);
        assert_eq!(out, "x;\n");
        assert!(buf.is_empty());
    }

    #[test]
    fn zero_indent_width() {
        let mut buf = SourceBuffer::new(0);
        buf.emit("f() {\nx;\n}\n").unwrap();
        assert_eq!(collect(&mut buf), "f() {\nx;\n}\n");
    }
}
