pub mod retry;
pub mod text;
pub mod time;
pub mod vector;
