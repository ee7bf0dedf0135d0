pub mod compose;
pub mod extract;
pub mod init;
