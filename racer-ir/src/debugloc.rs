//! Source debug locations.
//!
//! A location is a `file:line:col` triple with an optional inlined-at
//! chain. The textual form joins chain entries with `" @ "`, innermost
//! first, which is also how locations render into the sidecar report.

/// A debug location, possibly inlined from another site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugLoc {
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub inlined_at: Option<Box<DebugLoc>>,
}

impl DebugLoc {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> DebugLoc {
        DebugLoc {
            file: file.into(),
            line,
            col,
            inlined_at: None,
        }
    }

    /// File name with any leading `./` stripped, the normalized form used
    /// for location matching.
    pub fn normalized_file(&self) -> &str {
        self.file.strip_prefix("./").unwrap_or(&self.file)
    }

    /// Parse a chain such as `"a.c:3:9 @ b.c:40:1"`. Returns `None` when
    /// any entry is malformed.
    pub fn parse_chain(text: &str) -> Option<DebugLoc> {
        let mut out: Option<DebugLoc> = None;
        for part in text.rsplit(" @ ") {
            let mut it = part.rsplitn(3, ':');
            let col = it.next()?.parse().ok()?;
            let line = it.next()?.parse().ok()?;
            let file = it.next()?;
            let mut loc = DebugLoc::new(file, line, col);
            loc.inlined_at = out.take().map(Box::new);
            out = Some(loc);
        }
        out
    }

    /// Walk this location and its inlined-at ancestors, innermost first.
    pub fn chain(&self) -> impl Iterator<Item = &DebugLoc> {
        let mut cur = Some(self);
        std::iter::from_fn(move || {
            let here = cur?;
            cur = here.inlined_at.as_deref();
            Some(here)
        })
    }
}

impl std::fmt::Display for DebugLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)?;
        if let Some(inlined) = &self.inlined_at {
            write!(f, " @ {}", inlined)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_roundtrip() {
        let loc = DebugLoc::parse_chain("a.c:3:9 @ b.c:40:1").unwrap();
        assert_eq!(loc.file, "a.c");
        assert_eq!(loc.line, 3);
        let parent = loc.inlined_at.as_deref().unwrap();
        assert_eq!(parent.file, "b.c");
        assert_eq!(loc.to_string(), "a.c:3:9 @ b.c:40:1");
    }

    #[test]
    fn dot_slash_is_stripped_for_matching() {
        let loc = DebugLoc::new("./fs/inode.c", 7, 2);
        assert_eq!(loc.normalized_file(), "fs/inode.c");
    }
}
