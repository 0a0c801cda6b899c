pub(super) mod common;

mod lifecycle;
