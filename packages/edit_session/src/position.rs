/// Zero-based line and column of a caret inside some text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaretPosition {
    pub line: usize,
    pub column: usize,
}

impl CaretPosition {
    /// Locate a character offset in `text`, clamping it into `0..=len`.
    ///
    /// The line is the number of `\n` before the caret; the column counts
    /// characters since the last of them.
    pub fn locate(text: &str, caret: i64) -> Self {
        let len = text.chars().count();
        let offset = usize::try_from(caret).unwrap_or(0).min(len);

        let mut line = 0;
        let mut column = 0;
        for c in text.chars().take(offset) {
            if c == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        Self { line, column }
    }
}
