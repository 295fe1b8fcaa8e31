#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    TarGz,
    TarZst,
    TarXz,
    Zip,
}

impl ArchiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
        }
    }

    pub fn is_tar(self) -> bool {
        !matches!(self, Self::Zip)
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "tar.gz" | "tgz" => Some(Self::TarGz),
            "tar.zst" | "tzst" => Some(Self::TarZst),
            "tar.xz" | "txz" => Some(Self::TarXz),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    pub fn infer_from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            return Some(Self::TarGz);
        }
        if lower.ends_with(".tar.zst") || lower.ends_with(".tzst") {
            return Some(Self::TarZst);
        }
        if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
            return Some(Self::TarXz);
        }
        if lower.ends_with(".zip") {
            return Some(Self::Zip);
        }
        None
    }
}
