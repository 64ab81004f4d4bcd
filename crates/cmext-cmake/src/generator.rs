use std::fmt;

/// A CMake build-file generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Generator {
    Ninja,
    #[default]
    UnixMakefiles,
}

impl Generator {
    /// The name CMake expects after `-G`.
    pub fn as_str(self) -> &'static str {
        match self {
            Generator::Ninja => "Ninja",
            Generator::UnixMakefiles => "Unix Makefiles",
        }
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
