pub(crate) mod bootstrap;
pub(crate) mod courier;
pub(crate) mod loop_runner;
