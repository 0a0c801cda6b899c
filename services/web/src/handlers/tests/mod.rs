pub(crate) mod common;

mod refer;
