//! Output fragments and their rendering.
//!
//! Synthesizers never build indented text themselves. They append lines to a
//! `FragmentBuffer`, which tracks nesting depth; the `Emitter` turns the final
//! fragment list into text. Rendering is pure, so emitting the same fragments
//! twice yields identical output.

/// One output line at a nesting depth. Empty text is a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub depth: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentBuffer {
    fragments: Vec<Fragment>,
    depth: usize,
}

impl FragmentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl Into<String>) {
        self.fragments.push(Fragment {
            depth: self.depth,
            text: text.into(),
        });
    }

    /// Append text written elsewhere (a template pattern) line by line,
    /// keeping its own relative indentation.
    pub fn verbatim(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line.trim_end());
        }
    }

    pub fn blank(&mut self) {
        if self.fragments.last().map_or(false, |f| f.text.is_empty()) {
            return;
        }
        self.fragments.push(Fragment {
            depth: 0,
            text: String::new(),
        });
    }

    pub fn open_brace(&mut self) {
        self.line("{");
        self.depth += 1;
    }

    pub fn close_brace(&mut self, suffix: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(format!("}}{}", suffix));
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Append another buffer, nested at this buffer's current depth.
    pub fn append(&mut self, other: FragmentBuffer) {
        let base = self.depth;
        for fragment in other.fragments {
            if fragment.text.is_empty() {
                self.blank();
            } else {
                self.fragments.push(Fragment {
                    depth: fragment.depth + base,
                    text: fragment.text,
                });
            }
        }
    }

    /// Append text to the last line, e.g. a trailing comment.
    pub fn extend_last(&mut self, text: &str) {
        match self.fragments.last_mut() {
            Some(last) => last.text.push_str(text),
            None => self.line(text.trim_start()),
        }
    }

    /// The same lines turned into `//` comments.
    pub fn into_comment(self) -> FragmentBuffer {
        let fragments = self
            .fragments
            .into_iter()
            .map(|f| Fragment {
                depth: f.depth,
                text: if f.text.is_empty() {
                    "//".to_string()
                } else {
                    format!("// {}", f.text)
                },
            })
            .collect();
        FragmentBuffer {
            fragments,
            depth: self.depth,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }
}

/// Renders fragments with a fixed indent width.
#[derive(Debug, Clone, Copy)]
pub struct Emitter {
    indent_width: usize,
}

impl Emitter {
    pub fn new(indent_width: usize) -> Self {
        Self { indent_width }
    }

    pub fn emit(&self, fragments: &[Fragment]) -> String {
        let mut output = String::new();
        for fragment in fragments {
            if !fragment.text.is_empty() {
                output.push_str(&" ".repeat(fragment.depth * self.indent_width));
                output.push_str(&fragment.text);
            }
            output.push('\n');
        }
        output
    }

    pub fn render(&self, buffer: &FragmentBuffer) -> String {
        self.emit(buffer.fragments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braces_track_depth() {
        let mut buf = FragmentBuffer::new();
        buf.line("int main()");
        buf.open_brace();
        buf.line("return 0;");
        buf.close_brace("");
        assert_eq!(buf.depth(), 0);

        let text = Emitter::new(2).render(&buf);
        assert_eq!(text, "int main()\n{\n  return 0;\n}\n");
    }

    #[test]
    fn test_append_nests_at_current_depth() {
        let mut inner = FragmentBuffer::new();
        inner.line("struct A");
        inner.open_brace();
        inner.line("int x;");
        inner.close_brace(";");

        let mut outer = FragmentBuffer::new();
        outer.line("namespace n");
        outer.open_brace();
        outer.append(inner);
        outer.close_brace("");

        let text = Emitter::new(4).render(&outer);
        assert_eq!(
            text,
            "namespace n\n{\n    struct A\n    {\n        int x;\n    };\n}\n"
        );
    }

    #[test]
    fn test_emit_is_idempotent() {
        let mut buf = FragmentBuffer::new();
        buf.verbatim("template<typename T>\nT id(T v) { return v; }\n");
        buf.blank();
        buf.blank();
        let emitter = Emitter::new(2);
        assert_eq!(emitter.render(&buf), emitter.render(&buf));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_into_comment() {
        let mut buf = FragmentBuffer::new();
        buf.line("Point() = default;");
        let text = Emitter::new(2).render(&buf.into_comment());
        assert_eq!(text, "// Point() = default;\n");
    }
}
