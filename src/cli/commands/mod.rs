mod init;
mod purge_logs;

pub use init::cmd_init;
pub use purge_logs::cmd_purge_logs;
