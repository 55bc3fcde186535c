//! Core type definitions.

/// Supported decompression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Brotli (RFC 7932).
    Brotli,
    /// Zstandard (RFC 8878).
    Zstd,
}

impl Algorithm {
    /// Get algorithm name as string.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Brotli => "brotli",
            Algorithm::Zstd => "zstd",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Algorithm::Brotli => "br",
            Algorithm::Zstd => "zst",
        }
    }

    /// Pick an algorithm from a file name's extension.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1;
        match ext.to_ascii_lowercase().as_str() {
            "br" => Some(Algorithm::Brotli),
            "zst" | "zstd" => Some(Algorithm::Zstd),
            _ => None,
        }
    }

    /// Pick an algorithm from an HTTP `Content-Encoding` value.
    pub fn from_content_encoding(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "br" => Some(Algorithm::Brotli),
            "zstd" => Some(Algorithm::Zstd),
            _ => None,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(Algorithm::from_path("game.pck.br"), Some(Algorithm::Brotli));
        assert_eq!(Algorithm::from_path("engine.wasm.zst"), Some(Algorithm::Zstd));
        assert_eq!(Algorithm::from_path("engine.wasm.ZSTD"), Some(Algorithm::Zstd));
        assert_eq!(Algorithm::from_path("index.html"), None);
        assert_eq!(Algorithm::from_path("noext"), None);
    }

    #[test]
    fn test_from_content_encoding() {
        assert_eq!(Algorithm::from_content_encoding(" br "), Some(Algorithm::Brotli));
        assert_eq!(Algorithm::from_content_encoding("zstd"), Some(Algorithm::Zstd));
        assert_eq!(Algorithm::from_content_encoding("gzip"), None);
    }
}
