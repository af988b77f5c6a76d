pub mod migrate;
pub mod publish;
pub mod run;
pub mod show;
pub mod template;
pub mod validate;
