mod configure;
mod fs_utils;
mod layout;
mod lock;
mod receipts;
mod remove;
mod types;
mod unpack;

pub use configure::{configure_package, ConfigureStatus};
pub use layout::{default_user_prefix, PrefixLayout};
pub use lock::{read_active_transaction, ActiveTransaction};
pub use receipts::{
    find_installed_receipt, read_install_receipts, read_recorded_files, register_package,
    update_install_status, write_install_receipt, RegisterRequest,
};
pub use remove::remove_package;
pub use types::{InstallReason, InstallReceipt, InstallStatus};
pub use unpack::{unpack_package, UnpackRequest};
