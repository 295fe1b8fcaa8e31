use pakt_core::PackageEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// One requested package plus whatever it pulls in.
    SingleOrigin,
    /// Every installed package with a newer version available.
    Bulk,
}

/// Per-invocation state shared by every phase. Entries keep the order the
/// resolver gave them.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub(crate) mode: TransactionMode,
    pub(crate) entries: Vec<PackageEntry>,
    pub(crate) origin_name: Option<String>,
    pub(crate) update_target: Option<String>,
    pub(crate) force: bool,
    pub(crate) allow_update: bool,
}

impl Transaction {
    pub fn single_origin(
        origin: impl Into<String>,
        entries: Vec<PackageEntry>,
        force: bool,
        update: bool,
    ) -> Self {
        let origin = origin.into();
        Self {
            mode: TransactionMode::SingleOrigin,
            entries,
            update_target: update.then(|| origin.clone()),
            origin_name: Some(origin),
            force,
            allow_update: update,
        }
    }

    pub fn bulk(entries: Vec<PackageEntry>, force: bool) -> Self {
        Self {
            mode: TransactionMode::Bulk,
            entries,
            origin_name: None,
            update_target: None,
            force,
            allow_update: true,
        }
    }

    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn origin_name(&self) -> Option<&str> {
        self.origin_name.as_deref()
    }

    pub fn update_target(&self) -> Option<&str> {
        self.update_target.as_deref()
    }

    pub fn force(&self) -> bool {
        self.force
    }

    /// Whether `name` replaces an installed version in this transaction.
    pub(crate) fn updates(&self, name: &str) -> bool {
        match self.mode {
            TransactionMode::Bulk => true,
            TransactionMode::SingleOrigin => {
                self.allow_update && self.update_target.as_deref() == Some(name)
            }
        }
    }
}
