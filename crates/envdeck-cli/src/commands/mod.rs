pub mod check;
pub mod envs;
pub mod serve;
