pub mod account_sync;
pub mod attendance_summary;
pub mod fee_rules;
pub mod provisioning;
pub mod roster;
pub mod user_rules;
pub mod xlsx_import;
