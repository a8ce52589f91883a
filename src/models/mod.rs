pub mod chatmodels;
pub mod requestmodel;
pub mod usermodel;
