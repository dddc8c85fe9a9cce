pub mod clone;
pub mod crawl;
pub mod dispatch;
pub mod rollback;
pub mod run_all;
pub mod show;
pub mod stage;
