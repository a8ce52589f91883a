pub mod chatdtos;
pub mod requestdtos;
