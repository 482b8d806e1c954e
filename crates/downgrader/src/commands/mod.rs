pub mod calculate;
pub mod check;
pub mod downgrade;
pub mod manifest_info;
pub mod patch_file;
