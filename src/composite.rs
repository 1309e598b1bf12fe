pub(crate) mod flatten;
