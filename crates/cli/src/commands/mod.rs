pub(crate) mod repair;
pub(crate) mod repl;
pub(crate) mod serve;
pub(crate) mod view;
