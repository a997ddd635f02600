pub mod backfill;
pub mod cache;
pub mod dedup;
pub mod import;
pub mod observe;
pub mod record;
pub mod service;
pub mod status;
pub mod units;
