pub mod board;
pub mod notification;
pub mod timer;
