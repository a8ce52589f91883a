pub mod chatdb;
pub mod db;
#[cfg(test)]
pub mod memory;
pub mod requestdb;
pub mod userdb;
